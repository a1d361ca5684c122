//! Listing collection: readiness probing, scroll stabilization, and
//! container-chain lookup.

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::models::SiteConfig;

use super::page::{ElementHandle, PageDriver};
use super::CrawlError;

/// Script returning the scrollable content height.
pub const PAGE_HEIGHT_SCRIPT: &str = "document.body.scrollHeight";

/// Script scrolling to the bottom of the page.
pub const SCROLL_BOTTOM_SCRIPT: &str = "window.scrollTo(0, document.body.scrollHeight)";

/// Interval between readiness probe attempts.
const PROBE_POLL: Duration = Duration::from_millis(250);

/// Materialize the full ordered set of listing elements on the current page.
///
/// Waits for a readiness probe, stabilizes lazy-loaded content by scrolling
/// until the page height stops growing, then queries the listing container
/// chain. An empty page is a normal outcome, not an error.
pub async fn collect_listings(
    driver: &mut dyn PageDriver,
    site: &SiteConfig,
) -> Result<Vec<ElementHandle>, CrawlError> {
    wait_until_ready(driver, site).await?;
    stabilize_scroll(driver, site).await;

    for selector in site.listing_selectors.iter() {
        match driver.query_all(None, selector).await {
            Ok(elements) if !elements.is_empty() => {
                debug!("Found {} listings with selector {:?}", elements.len(), selector);
                return Ok(elements);
            }
            Ok(_) => continue,
            Err(e) => {
                debug!("Listing selector {:?} failed: {}", selector, e);
                continue;
            }
        }
    }

    debug!("No listing selector matched anything");
    Ok(Vec::new())
}

/// Wait for the first readiness probe to appear, each probe bounded by the
/// configured timeout. Exhausting every probe means the page never rendered
/// enough to be queried.
async fn wait_until_ready(driver: &mut dyn PageDriver, site: &SiteConfig) -> Result<(), CrawlError> {
    if site.ready_probes.is_empty() {
        debug!("No readiness probes configured, assuming page is ready");
        return Ok(());
    }

    let per_probe = Duration::from_secs(site.delays.probe_timeout_secs);

    for probe in site.ready_probes.iter() {
        if wait_for_probe(driver, probe, per_probe).await {
            debug!("Page ready (probe {:?} matched)", probe);
            return Ok(());
        }
        debug!("Readiness probe {:?} did not appear", probe);
    }

    Err(CrawlError::PageNotReady(
        per_probe * site.ready_probes.len().max(1) as u32,
    ))
}

async fn wait_for_probe(driver: &mut dyn PageDriver, probe: &str, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if let Ok(Some(_)) = driver.query_one(None, probe).await {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(PROBE_POLL.min(timeout)).await;
    }
}

/// Scroll to the bottom until two consecutive height measurements agree,
/// so lazily-loaded listings are mounted before collection.
///
/// The round cap guards against sites with perpetual synthetic scroll
/// growth; hitting it is a soft failure and the crawl proceeds with
/// whatever loaded.
async fn stabilize_scroll(driver: &mut dyn PageDriver, site: &SiteConfig) {
    let settle = Duration::from_millis(site.delays.scroll_settle_ms);
    let mut last = page_height(driver).await;

    for _ in 0..site.limits.max_scroll_rounds {
        if driver.execute_script(SCROLL_BOTTOM_SCRIPT).await.is_err() {
            return;
        }
        tokio::time::sleep(settle).await;

        let current = page_height(driver).await;
        if current == last {
            return;
        }
        last = current;
    }

    warn!(
        "Page height still growing after {} scroll rounds, continuing with loaded content",
        site.limits.max_scroll_rounds
    );
}

async fn page_height(driver: &mut dyn PageDriver) -> i64 {
    driver
        .execute_script(PAGE_HEIGHT_SCRIPT)
        .await
        .ok()
        .and_then(|v| v.as_i64())
        .unwrap_or(0)
}
