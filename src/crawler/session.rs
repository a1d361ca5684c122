//! Per-site crawl orchestration.
//!
//! One session walks a site's result pages sequentially: load, collect,
//! extract, check pagination, repeat. Element-level failures are recovered
//! in place; page-level failures end the session but keep what earlier
//! pages produced.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::models::{DetailConfig, JobRecord, SiteConfig};

use super::chain::{resolve, Extract};
use super::collect::collect_listings;
use super::extract::FieldExtractor;
use super::page::{PageDriver, PageError};
use super::pagination::has_next_page;
use super::CrawlError;

/// First backoff after a navigation timeout; doubles per retry.
const NAV_BACKOFF: Duration = Duration::from_millis(500);

/// Outcome of one site session.
///
/// Records accumulated before a failure are preserved: a session that dies
/// on page three still reports pages one and two.
#[derive(Debug)]
pub struct CrawlReport {
    pub company: String,
    pub records: Vec<JobRecord>,
    pub pages_visited: u32,
    pub failure: Option<CrawlError>,
}

impl CrawlReport {
    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }
}

/// Transient per-site crawl state, advanced once per page iteration.
struct CrawlSession {
    page: u32,
    records: Vec<JobRecord>,
}

/// Crawl every results page of one site.
///
/// The caller owns the driver and must release it afterwards regardless of
/// the outcome; this function never closes it.
pub async fn crawl_site(driver: &mut dyn PageDriver, site: &SiteConfig) -> CrawlReport {
    let mut session = CrawlSession {
        page: 1,
        records: Vec::new(),
    };

    let failure = run_pages(driver, site, &mut session).await.err();

    if failure.is_none() {
        if let Some(detail) = &site.detail {
            enrich_descriptions(driver, site, detail, &mut session.records).await;
        }
    }

    if let Some(ref failure) = failure {
        warn!("Crawl of {} failed on page {}: {}", site.company, session.page, failure);
    }

    CrawlReport {
        company: site.company.clone(),
        records: session.records,
        pages_visited: session.page,
        failure,
    }
}

async fn run_pages(
    driver: &mut dyn PageDriver,
    site: &SiteConfig,
    session: &mut CrawlSession,
) -> Result<(), CrawlError> {
    let extractor = FieldExtractor::new(site)?;

    loop {
        let url = site.page_url(session.page);
        info!("Scraping {} page {} ({})", site.company, session.page, url);

        navigate_with_retry(driver, site, &url).await?;
        tokio::time::sleep(Duration::from_millis(site.delays.settle_ms)).await;

        if session.page == 1 {
            dismiss_consent(driver, site).await;
        }

        let listings = collect_listings(driver, site).await?;
        debug!("Page {} has {} listing elements", session.page, listings.len());

        let mut page_records = 0usize;
        for element in listings {
            match extractor.extract(driver, element).await {
                Ok(Some(record)) => {
                    debug!("Found job: {}", record.title);
                    session.records.push(record);
                    page_records += 1;
                }
                Ok(None) => {}
                // A single unparseable element never takes the page down.
                Err(e) => warn!("Error parsing listing element: {}", e),
            }
        }

        // Zero records is an implicit end-of-results signal: stop before
        // even consulting the next control, which some sites keep mounted
        // past the last page.
        if page_records == 0 {
            info!("No jobs found on page {}, ending crawl", session.page);
            break;
        }
        if session.page >= site.limits.max_pages {
            info!(
                "Reached the {}-page limit for {}",
                site.limits.max_pages, site.company
            );
            break;
        }
        if !has_next_page(driver, site).await {
            debug!("No further pages for {}", site.company);
            break;
        }

        session.page += 1;
        let pause = page_pause(site);
        debug!("Pacing {:?} before page {}", pause, session.page);
        tokio::time::sleep(pause).await;
    }

    Ok(())
}

async fn navigate_with_retry(
    driver: &mut dyn PageDriver,
    site: &SiteConfig,
    url: &str,
) -> Result<(), CrawlError> {
    let timeout = Duration::from_secs(site.delays.nav_timeout_secs);
    let mut backoff = NAV_BACKOFF;

    for attempt in 0..=site.limits.nav_retries {
        match driver.navigate(url, timeout).await {
            Ok(()) => return Ok(()),
            Err(PageError::NavigationTimeout { .. }) if attempt < site.limits.nav_retries => {
                warn!(
                    "Timeout loading {} (attempt {}/{}), retrying in {:?}",
                    url,
                    attempt + 1,
                    site.limits.nav_retries + 1,
                    backoff
                );
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }
            Err(PageError::NavigationTimeout { .. }) => {
                return Err(CrawlError::NavigationTimeout {
                    url: url.to_string(),
                    timeout,
                });
            }
            Err(e) => return Err(e.into()),
        }
    }

    unreachable!("navigation loop always returns");
}

/// Click through a cookie/consent dialog when one is configured. Entirely
/// best-effort: failures are logged and the crawl proceeds.
async fn dismiss_consent(driver: &mut dyn PageDriver, site: &SiteConfig) {
    for selector in site.consent_selectors.iter() {
        match driver.query_one(None, selector).await {
            Ok(Some(button)) => {
                match driver.click(button).await {
                    Ok(()) => debug!("Dismissed consent dialog via {:?}", selector),
                    Err(e) => debug!("Consent click failed: {}", e),
                }
                return;
            }
            Ok(None) => continue,
            Err(e) => {
                debug!("Consent selector {:?} failed: {}", selector, e);
                continue;
            }
        }
    }
}

/// Visit each record's detail page and overwrite its description with the
/// first chain match's markup. Per-record failures keep the prior value.
async fn enrich_descriptions(
    driver: &mut dyn PageDriver,
    site: &SiteConfig,
    detail: &DetailConfig,
    records: &mut [JobRecord],
) {
    if detail.description_selectors.is_empty() || records.is_empty() {
        return;
    }

    info!(
        "Fetching descriptions for {} {} jobs",
        records.len(),
        site.company
    );
    let timeout = Duration::from_secs(site.delays.nav_timeout_secs);
    let field_timeout = Duration::from_millis(site.delays.field_timeout_ms);

    for record in records.iter_mut() {
        if let Err(e) = driver.navigate(&record.url, timeout).await {
            warn!("Could not load detail page {}: {}", record.url, e);
            continue;
        }
        tokio::time::sleep(detail_pause(site)).await;

        if let Some(description) = resolve(
            driver,
            None,
            &detail.description_selectors,
            &Extract::InnerHtml,
            field_timeout,
        )
        .await
        {
            record.description = description;
        } else {
            debug!("No description found for {}", record.url);
        }
    }
}

fn page_pause(site: &SiteConfig) -> Duration {
    band(site.delays.page_delay_min_ms, site.delays.page_delay_max_ms)
}

fn detail_pause(site: &SiteConfig) -> Duration {
    band(site.delays.detail_delay_min_ms, site.delays.detail_delay_max_ms)
}

/// Uniform random duration inside `[min_ms, max_ms]`.
fn band(min_ms: u64, max_ms: u64) -> Duration {
    let max_ms = max_ms.max(min_ms);
    Duration::from_millis(fastrand::u64(min_ms..=max_ms))
}
