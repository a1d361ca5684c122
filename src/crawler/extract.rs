//! Field extraction: one listing element in, one job record (or a skip) out.

use std::time::Duration;

use regex::Regex;
use tracing::{debug, warn};
use url::Url;

use crate::models::{JobRecord, SiteConfig, UNKNOWN_FIELD};

use super::chain::{resolve, Extract};
use super::page::{ElementHandle, PageDriver, PageError};
use super::CrawlError;

/// Selector used by the positional text-block fallback.
const TEXT_BLOCK_SELECTOR: &str = "p, span, div";

/// Per-site field extractor. Compiles the id pattern and base URL once and
/// is then applied to each listing element of every page.
pub struct FieldExtractor<'a> {
    site: &'a SiteConfig,
    id_regex: Option<Regex>,
    base: Option<Url>,
    field_timeout: Duration,
}

impl<'a> FieldExtractor<'a> {
    pub fn new(site: &'a SiteConfig) -> Result<Self, CrawlError> {
        let id_regex = match site.id_pattern.as_deref() {
            Some(pattern) => Some(
                Regex::new(pattern)
                    .map_err(|e| CrawlError::Config(format!("bad id_pattern {pattern:?}: {e}")))?,
            ),
            None => None,
        };

        Ok(Self {
            site,
            id_regex,
            base: Url::parse(&site.base_url).ok(),
            field_timeout: Duration::from_millis(site.delays.field_timeout_ms),
        })
    }

    /// Extract a record from one listing element.
    ///
    /// `Ok(None)` means the element is not a real job card (no resolvable
    /// title, or no link to derive identity from) and is silently excluded.
    /// Any other missing field is replaced by the sentinel; partial records
    /// are acceptable, missing titles are not.
    pub async fn extract(
        &self,
        driver: &mut dyn PageDriver,
        element: ElementHandle,
    ) -> Result<Option<JobRecord>, PageError> {
        // Some rendering engines only populate lazily-mounted fields once
        // visible. Purely an optimization; failure must not abort the card.
        if let Err(e) = driver.scroll_into_view(element).await {
            debug!("scroll_into_view failed, extracting anyway: {}", e);
        }

        let title = self
            .field(driver, element, &self.site.fields.title)
            .await;
        let Some(title) = title else {
            debug!("Element has no resolvable title, not a job card");
            return Ok(None);
        };

        let Some(url) = self.listing_url(driver, element).await else {
            debug!("Card {:?} has no link, skipping", title);
            return Ok(None);
        };
        let id = self.job_id(&url);

        let mut record = JobRecord::new(&self.site.company, id, url);
        record.title = title;

        let mut resolved = 0usize;
        if let Some(location) = self.field(driver, element, &self.site.fields.location).await {
            record.location = location;
            resolved += 1;
        }
        if let Some(team) = self.field(driver, element, &self.site.fields.team).await {
            record.team = team;
            resolved += 1;
        }
        if let Some(date) = self.field(driver, element, &self.site.fields.date).await {
            record.posted = date;
            resolved += 1;
        }

        if resolved == 0 && self.site.positional_fallback {
            self.apply_positional_heuristic(driver, element, &mut record)
                .await;
        }

        Ok(Some(record))
    }

    async fn field(
        &self,
        driver: &mut dyn PageDriver,
        element: ElementHandle,
        chain: &crate::models::SelectorChain,
    ) -> Option<String> {
        if chain.is_empty() {
            return None;
        }
        resolve(driver, Some(element), chain, &Extract::Text, self.field_timeout).await
    }

    /// The card's detail-page URL: the element's own `href` when the card
    /// is an anchor, otherwise the first anchor found by the link chain.
    async fn listing_url(
        &self,
        driver: &mut dyn PageDriver,
        element: ElementHandle,
    ) -> Option<String> {
        let href = match driver.attribute(element, "href").await {
            Ok(Some(href)) if !href.trim().is_empty() => Some(href),
            _ => {
                resolve(
                    driver,
                    Some(element),
                    &self.site.link_selectors,
                    &Extract::Attribute("href".to_string()),
                    self.field_timeout,
                )
                .await
            }
        };

        href.map(|href| self.absolutize(href.trim()))
    }

    fn absolutize(&self, href: &str) -> String {
        if Url::parse(href).is_ok() {
            return href.to_string();
        }
        match &self.base {
            Some(base) => base
                .join(href)
                .map(|u| u.to_string())
                .unwrap_or_else(|_| href.to_string()),
            None => href.to_string(),
        }
    }

    /// Derive the job id from the URL: configured regex capture first,
    /// trailing path segment otherwise, the full URL as a last resort.
    fn job_id(&self, url: &str) -> String {
        if let Some(regex) = &self.id_regex {
            if let Some(captures) = regex.captures(url) {
                if let Some(id) = captures.get(1) {
                    return id.as_str().to_string();
                }
            }
        }

        let trimmed = url.trim_end_matches('/');
        let segment = match Url::parse(trimmed) {
            Ok(parsed) => parsed
                .path_segments()
                .and_then(|segments| segments.filter(|s| !s.is_empty()).next_back())
                .map(str::to_string),
            Err(_) => trimmed.rsplit('/').next().map(str::to_string),
        };

        match segment {
            Some(segment) if !segment.is_empty() => segment,
            _ => url.to_string(),
        }
    }

    /// Degraded fallback: categorize the card's loose text blocks by
    /// position (team, location, date in card order). Inherently brittle,
    /// so records produced this way are flagged for downstream filtering.
    async fn apply_positional_heuristic(
        &self,
        driver: &mut dyn PageDriver,
        element: ElementHandle,
        record: &mut JobRecord,
    ) {
        let blocks = match driver.query_all(Some(element), TEXT_BLOCK_SELECTOR).await {
            Ok(blocks) => blocks,
            Err(e) => {
                warn!("Positional fallback query failed: {}", e);
                return;
            }
        };

        let mut texts = Vec::new();
        for block in blocks {
            if let Ok(text) = driver.text(block).await {
                let text = text.trim().to_string();
                if !text.is_empty() && text != record.title {
                    texts.push(text);
                }
            }
            if texts.len() >= 3 {
                break;
            }
        }

        if texts.is_empty() {
            return;
        }

        let mut texts = texts.into_iter();
        record.team = texts.next().unwrap_or_else(|| UNKNOWN_FIELD.to_string());
        record.location = texts.next().unwrap_or_else(|| UNKNOWN_FIELD.to_string());
        record.posted = texts.next().unwrap_or_else(|| UNKNOWN_FIELD.to_string());
        record.via_heuristic = true;
    }
}
