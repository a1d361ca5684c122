//! Per-site crawl configuration.
//!
//! Every selector the crawl engine uses comes from these structs; the
//! orchestration logic itself contains no selector literals. Sites are
//! defined in JSON files (one per site) or by the built-in definitions,
//! and deserialized with per-field defaults so configs stay short.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Ordered list of selector expressions for one semantic lookup.
///
/// Chains are tried top to bottom; the first selector producing a usable
/// value wins and the rest are never evaluated. Order encodes decreasing
/// specificity: site-specific selectors first, generic fallbacks last.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectorChain(pub Vec<String>);

impl SelectorChain {
    pub fn new<I, S>(selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(selectors.into_iter().map(Into::into).collect())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Selector chains for the card-local fields of a listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldSelectors {
    #[serde(default)]
    pub title: SelectorChain,
    #[serde(default)]
    pub location: SelectorChain,
    #[serde(default)]
    pub team: SelectorChain,
    #[serde(default)]
    pub date: SelectorChain,
}

/// Detail-page enrichment configuration.
///
/// When present, the orchestrator visits each record's URL after pagination
/// ends and overwrites `description` with the first chain match's markup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetailConfig {
    #[serde(default)]
    pub description_selectors: SelectorChain,
}

/// Hard bounds on a site crawl.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlLimits {
    /// Maximum number of result pages to visit.
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    /// Cap on scroll-stabilization rounds; exceeding it is a soft failure.
    #[serde(default = "default_max_scroll_rounds")]
    pub max_scroll_rounds: u32,
    /// Navigation retries after a timeout, with exponential backoff.
    #[serde(default = "default_nav_retries")]
    pub nav_retries: u32,
}

impl Default for CrawlLimits {
    fn default() -> Self {
        Self {
            max_pages: default_max_pages(),
            max_scroll_rounds: default_max_scroll_rounds(),
            nav_retries: default_nav_retries(),
        }
    }
}

fn default_max_pages() -> u32 {
    10
}
fn default_max_scroll_rounds() -> u32 {
    20
}
fn default_nav_retries() -> u32 {
    2
}

/// Wait and pacing durations, all in the units their names state.
///
/// The page delay band emulates human browsing cadence between result
/// pages; a uniform random pause inside the band is used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelayConfig {
    /// Page-load timeout per navigation attempt.
    #[serde(default = "default_nav_timeout_secs")]
    pub nav_timeout_secs: u64,
    /// Fixed settle delay after navigation, before probing.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    /// Per readiness probe timeout.
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
    /// Pause between scroll rounds while stabilizing lazy content.
    #[serde(default = "default_scroll_settle_ms")]
    pub scroll_settle_ms: u64,
    /// Bounded time for a single field selector query.
    #[serde(default = "default_field_timeout_ms")]
    pub field_timeout_ms: u64,
    /// Lower bound of the inter-page pacing band.
    #[serde(default = "default_page_delay_min_ms")]
    pub page_delay_min_ms: u64,
    /// Upper bound of the inter-page pacing band.
    #[serde(default = "default_page_delay_max_ms")]
    pub page_delay_max_ms: u64,
    /// Pacing band between detail-page visits during enrichment.
    #[serde(default = "default_detail_delay_min_ms")]
    pub detail_delay_min_ms: u64,
    #[serde(default = "default_detail_delay_max_ms")]
    pub detail_delay_max_ms: u64,
}

impl Default for DelayConfig {
    fn default() -> Self {
        Self {
            nav_timeout_secs: default_nav_timeout_secs(),
            settle_ms: default_settle_ms(),
            probe_timeout_secs: default_probe_timeout_secs(),
            scroll_settle_ms: default_scroll_settle_ms(),
            field_timeout_ms: default_field_timeout_ms(),
            page_delay_min_ms: default_page_delay_min_ms(),
            page_delay_max_ms: default_page_delay_max_ms(),
            detail_delay_min_ms: default_detail_delay_min_ms(),
            detail_delay_max_ms: default_detail_delay_max_ms(),
        }
    }
}

fn default_nav_timeout_secs() -> u64 {
    30
}
fn default_settle_ms() -> u64 {
    3000
}
fn default_probe_timeout_secs() -> u64 {
    10
}
fn default_scroll_settle_ms() -> u64 {
    2000
}
fn default_field_timeout_ms() -> u64 {
    1500
}
fn default_page_delay_min_ms() -> u64 {
    3000
}
fn default_page_delay_max_ms() -> u64 {
    7000
}
fn default_detail_delay_min_ms() -> u64 {
    2000
}
fn default_detail_delay_max_ms() -> u64 {
    4000
}

/// Complete crawl parameterization for one career site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Short company identifier stamped on every record.
    pub company: String,
    /// First results page.
    pub base_url: String,
    /// URL template with a `{page}` placeholder for pages past the first.
    /// When absent, a `page` query parameter is appended instead.
    #[serde(default)]
    pub page_url_template: Option<String>,
    /// Selectors probed to detect that the page rendered enough to query.
    #[serde(default)]
    pub ready_probes: SelectorChain,
    /// Cookie/consent dismissal buttons, clicked best-effort on page one.
    #[serde(default)]
    pub consent_selectors: SelectorChain,
    /// Container-level chain locating the listing elements themselves.
    #[serde(default)]
    pub listing_selectors: SelectorChain,
    /// Card-local field chains.
    #[serde(default)]
    pub fields: FieldSelectors,
    /// Anchors searched inside a card when the card itself has no href.
    #[serde(default = "default_link_selectors")]
    pub link_selectors: SelectorChain,
    /// Regex whose first capture group extracts the job id from the URL.
    /// Falls back to the trailing path segment when absent or non-matching.
    #[serde(default)]
    pub id_pattern: Option<String>,
    /// Next-page control chain.
    #[serde(default)]
    pub next_selectors: SelectorChain,
    /// Class tokens that mark a next control as disabled.
    #[serde(default = "default_disabled_markers")]
    pub disabled_markers: Vec<String>,
    /// Enable the positional text-block fallback for team/location/date.
    #[serde(default)]
    pub positional_fallback: bool,
    /// Detail-page description enrichment, when configured.
    #[serde(default)]
    pub detail: Option<DetailConfig>,
    #[serde(default)]
    pub limits: CrawlLimits,
    #[serde(default)]
    pub delays: DelayConfig,
    /// Whether this site needs a scripted browser; sites that render
    /// server-side can be fetched with the static driver instead.
    #[serde(default = "default_use_browser")]
    pub use_browser: bool,
}

fn default_link_selectors() -> SelectorChain {
    SelectorChain::new(["a"])
}

fn default_disabled_markers() -> Vec<String> {
    vec!["disabled".to_string()]
}

fn default_use_browser() -> bool {
    true
}

impl SiteConfig {
    /// URL of the given 1-based results page.
    pub fn page_url(&self, page: u32) -> String {
        if let Some(ref template) = self.page_url_template {
            return template.replace("{page}", &page.to_string());
        }
        if page <= 1 {
            return self.base_url.clone();
        }
        match url::Url::parse(&self.base_url) {
            Ok(mut url) => {
                url.query_pairs_mut().append_pair("page", &page.to_string());
                url.to_string()
            }
            Err(_) => format!("{}?page={}", self.base_url, page),
        }
    }

    /// Load all `*.json` site definitions from a directory.
    ///
    /// Unreadable or malformed files are skipped with a warning so one bad
    /// definition does not take the rest of the batch down.
    pub fn load_dir(dir: &Path) -> Vec<SiteConfig> {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Cannot read sites directory {}: {}", dir.display(), e);
                return Vec::new();
            }
        };

        let mut sites = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match std::fs::read_to_string(&path)
                .map_err(anyhow::Error::from)
                .and_then(|text| serde_json::from_str::<SiteConfig>(&text).map_err(Into::into))
            {
                Ok(site) => sites.push(site),
                Err(e) => warn!("Skipping site config {}: {}", path.display(), e),
            }
        }
        sites.sort_by(|a, b| a.company.cmp(&b.company));
        sites
    }
}

/// Site definitions that ship with the tool.
pub fn builtin_sites() -> Vec<SiteConfig> {
    vec![apple(), meta()]
}

fn apple() -> SiteConfig {
    SiteConfig {
        company: "apple".to_string(),
        base_url: "https://jobs.apple.com/en-us/search".to_string(),
        page_url_template: Some("https://jobs.apple.com/en-us/search?page={page}".to_string()),
        ready_probes: SelectorChain::new([
            "div[role='main']",
            "section[role='region']",
            "a[href*='/search/']",
            "h3",
        ]),
        consent_selectors: SelectorChain::default(),
        listing_selectors: SelectorChain::new(["a[href*='/search/']", "div[role='listitem']"]),
        fields: FieldSelectors {
            title: SelectorChain::new(["h3", "h2", ".job-title", "[data-test='job-title']"]),
            location: SelectorChain::default(),
            team: SelectorChain::default(),
            date: SelectorChain::default(),
        },
        link_selectors: default_link_selectors(),
        id_pattern: None,
        next_selectors: SelectorChain::new([
            "[aria-label='Next page']",
            ".pagination-next",
            "[data-test='pagination-next']",
        ]),
        disabled_markers: default_disabled_markers(),
        // Apple's cards carry no per-field markup; team/location/date are
        // loose text blocks in card order.
        positional_fallback: true,
        detail: None,
        limits: CrawlLimits::default(),
        delays: DelayConfig::default(),
        use_browser: true,
    }
}

fn meta() -> SiteConfig {
    SiteConfig {
        company: "meta".to_string(),
        base_url: "https://www.metacareers.com/jobs".to_string(),
        page_url_template: None,
        ready_probes: SelectorChain::new([
            "a[data-testid='job-card']",
            "div[role='article']",
            "a[href*='/jobs/']",
        ]),
        consent_selectors: SelectorChain::new([
            "button[data-cookiebanner='accept_button']",
            "button[data-testid='cookie-policy-manage-dialog-accept-button']",
        ]),
        listing_selectors: SelectorChain::new([
            "a[data-testid='job-card']",
            "div[data-testid='job-listing']",
            "div[role='article']",
            "a[href*='/jobs/']",
        ]),
        fields: FieldSelectors {
            title: SelectorChain::new([
                "div[data-testid='job-title']",
                "h3",
                "h2",
                "h4",
                ".job-title",
                "div[class*='title']",
            ]),
            location: SelectorChain::new([
                "div[data-testid='job-location']",
                ".job-location",
                "div[class*='location']",
            ]),
            team: SelectorChain::new([
                "div[data-testid='job-team']",
                ".job-team",
                "div[class*='team']",
            ]),
            date: SelectorChain::default(),
        },
        link_selectors: default_link_selectors(),
        id_pattern: Some(r"/jobs/(\d+)".to_string()),
        next_selectors: SelectorChain::new([
            "[aria-label='Next page']",
            "a[data-testid='pagination-next']",
        ]),
        disabled_markers: default_disabled_markers(),
        positional_fallback: false,
        detail: Some(DetailConfig {
            description_selectors: SelectorChain::new([
                "div[data-testid='job-description']",
                ".job-description",
                "div[role='main']",
                "div[class*='description']",
            ]),
        }),
        limits: CrawlLimits::default(),
        delays: DelayConfig::default(),
        use_browser: true,
    }
}
