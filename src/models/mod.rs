//! Domain models: job records and per-site crawl configuration.

mod job;
mod site;

pub use job::{JobRecord, UNKNOWN_FIELD};
pub use site::{
    builtin_sites, CrawlLimits, DelayConfig, DetailConfig, FieldSelectors, SelectorChain,
    SiteConfig,
};
