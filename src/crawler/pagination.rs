//! Next-page detection.

use tracing::debug;

use crate::models::SiteConfig;

use super::page::{ElementHandle, PageDriver};

/// Whether another results page exists.
///
/// The first next-control selector that matches decides: the page has more
/// results unless the control carries a recognized disabled marker. When no
/// selector matches at all this conservatively reports `false`, so a site
/// that drops its pagination markup terminates the crawl instead of looping.
pub async fn has_next_page(driver: &mut dyn PageDriver, site: &SiteConfig) -> bool {
    for selector in site.next_selectors.iter() {
        match driver.query_one(None, selector).await {
            Ok(Some(control)) => {
                let enabled = control_is_enabled(driver, control, site).await;
                debug!(
                    "Next control {:?} found, enabled={}",
                    selector, enabled
                );
                return enabled;
            }
            Ok(None) => continue,
            Err(e) => {
                debug!("Next selector {:?} failed: {}", selector, e);
                continue;
            }
        }
    }

    debug!("No next-page control matched");
    false
}

async fn control_is_enabled(
    driver: &mut dyn PageDriver,
    control: ElementHandle,
    site: &SiteConfig,
) -> bool {
    if let Ok(Some(class)) = driver.attribute(control, "class").await {
        let disabled = class
            .split_whitespace()
            .any(|token| site.disabled_markers.iter().any(|m| m == token));
        if disabled {
            return false;
        }
    }

    if let Ok(Some(aria)) = driver.attribute(control, "aria-disabled").await {
        if aria.eq_ignore_ascii_case("true") {
            return false;
        }
    }

    if let Ok(Some(_)) = driver.attribute(control, "disabled").await {
        return false;
    }

    true
}
