//! Job posting records harvested from career sites.

use serde::{Deserialize, Serialize};

/// Sentinel substituted for any field that could not be resolved.
///
/// Downstream consumers always see every field populated; absence is
/// expressed by this value, never by a missing key.
pub const UNKNOWN_FIELD: &str = "unknown";

/// A single job posting captured from one career site.
///
/// `id` and `url` are guaranteed present: an element that yields neither a
/// title nor a link is never turned into a record. Every other field falls
/// back to [`UNKNOWN_FIELD`]. The `posted` date is kept exactly as the site
/// renders it, with no normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Short company identifier (e.g. "apple"), matches the site config.
    pub company: String,
    /// Job title as shown on the listing card.
    pub title: String,
    /// Team or organization the posting belongs to.
    pub team: String,
    /// Location string as rendered by the site.
    pub location: String,
    /// Posting date, site-formatted.
    pub posted: String,
    /// Stable job identifier, derived from the listing URL.
    pub id: String,
    /// Absolute URL of the posting's detail page.
    pub url: String,
    /// Detail-page description markup; overwritten by the enrichment pass.
    #[serde(default = "default_unknown")]
    pub description: String,
    /// True when team/location/posted came from the positional text-block
    /// heuristic instead of a selector chain. Lets downstream consumers
    /// filter records extracted in degraded mode.
    #[serde(default)]
    pub via_heuristic: bool,
}

fn default_unknown() -> String {
    UNKNOWN_FIELD.to_string()
}

impl JobRecord {
    /// Create a record with every optional field at the sentinel.
    pub fn new(company: impl Into<String>, id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            company: company.into(),
            title: UNKNOWN_FIELD.to_string(),
            team: UNKNOWN_FIELD.to_string(),
            location: UNKNOWN_FIELD.to_string(),
            posted: UNKNOWN_FIELD.to_string(),
            id: id.into(),
            url: url.into(),
            description: UNKNOWN_FIELD.to_string(),
            via_heuristic: false,
        }
    }

    /// True when the mandatory identity fields are populated.
    pub fn is_valid(&self) -> bool {
        !self.id.is_empty() && !self.url.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_defaults_to_sentinel() {
        let record = JobRecord::new("apple", "200554", "https://jobs.apple.com/details/200554");
        assert_eq!(record.title, UNKNOWN_FIELD);
        assert_eq!(record.team, UNKNOWN_FIELD);
        assert_eq!(record.location, UNKNOWN_FIELD);
        assert_eq!(record.posted, UNKNOWN_FIELD);
        assert!(!record.via_heuristic);
        assert!(record.is_valid());
    }

    #[test]
    fn record_without_id_is_invalid() {
        let record = JobRecord::new("apple", "", "https://jobs.apple.com/details/200554");
        assert!(!record.is_valid());
    }

    #[test]
    fn serde_round_trip_keeps_heuristic_flag() {
        let mut record = JobRecord::new("meta", "1234", "https://www.metacareers.com/jobs/1234/");
        record.via_heuristic = true;
        let json = serde_json::to_string(&record).unwrap();
        let back: JobRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
