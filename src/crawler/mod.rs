//! Resilient listing-extraction engine.
//!
//! The engine is parameterized entirely by [`crate::models::SiteConfig`]
//! and drives any [`PageDriver`] implementation; no selector literals live
//! in the orchestration logic itself.

#[cfg(feature = "browser")]
pub mod browser;
mod chain;
mod collect;
mod extract;
pub mod page;
mod pagination;
mod session;
pub mod static_page;
#[cfg(test)]
pub(crate) mod testing;

use std::time::Duration;

use thiserror::Error;

pub use chain::{resolve, Extract};
pub use collect::{collect_listings, PAGE_HEIGHT_SCRIPT, SCROLL_BOTTOM_SCRIPT};
pub use extract::FieldExtractor;
pub use page::{ElementHandle, PageDriver, PageError};
pub use pagination::has_next_page;
pub use session::{crawl_site, CrawlReport};

/// User agents rotated per session to blur the crawler's fingerprint.
pub(crate) const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
];

pub(crate) fn random_user_agent() -> &'static str {
    USER_AGENTS[fastrand::usize(0..USER_AGENTS.len())]
}

/// Session-fatal crawl failures.
///
/// Element- and field-level problems never surface here; they are recovered
/// inside the page being processed. Anything below aborts the current
/// site's session (after the driver is released) and lets the batch move on.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// No readiness probe matched on a freshly loaded page.
    #[error("page not ready: no readiness probe matched within {0:?}")]
    PageNotReady(Duration),

    /// A page failed to load within the allotted time, retries included.
    #[error("navigation to {url} timed out after {timeout:?}")]
    NavigationTimeout { url: String, timeout: Duration },

    /// The page driver could not be constructed.
    #[error("page driver setup failed: {0}")]
    Setup(String),

    /// The site configuration is unusable.
    #[error("invalid site config: {0}")]
    Config(String),

    /// Unexpected driver failure at page scope.
    #[error(transparent)]
    Driver(#[from] PageError),
}
