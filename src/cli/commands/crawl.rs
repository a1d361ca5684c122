//! `harvest crawl` - run crawl sessions against the configured sites.

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use crate::config::Settings;
use crate::crawler::static_page::StaticPage;
use crate::crawler::{crawl_site, CrawlError, CrawlReport, PageDriver};
use crate::models::SiteConfig;
use crate::repository::JobRepository;

use super::sites::load_sites;

#[derive(Args)]
pub struct CrawlArgs {
    /// Only crawl these sites (by company name, repeatable)
    #[arg(long = "site", value_name = "NAME")]
    sites: Vec<String>,

    /// Override the per-site page cap
    #[arg(long)]
    max_pages: Option<u32>,

    /// Show the browser window while crawling
    #[arg(long)]
    headed: bool,

    /// Crawl without writing to the database
    #[arg(long)]
    dry_run: bool,
}

pub async fn run(args: CrawlArgs, settings: &Settings) -> anyhow::Result<()> {
    let mut sites = load_sites(settings);

    if !args.sites.is_empty() {
        for name in &args.sites {
            if !sites.iter().any(|s| &s.company == name) {
                anyhow::bail!("unknown site {:?}; see `harvest sites list`", name);
            }
        }
        sites.retain(|s| args.sites.contains(&s.company));
    }
    if let Some(max_pages) = args.max_pages.or(settings.max_pages) {
        for site in &mut sites {
            site.limits.max_pages = max_pages;
        }
    }

    let headless = settings.headless && !args.headed;
    let repo = if args.dry_run {
        None
    } else {
        Some(JobRepository::new(&settings.database_path)?)
    };

    let progress = ProgressBar::new(sites.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let mut total = 0usize;
    let mut failed_sites = 0usize;

    // Sites are independent sequential sessions, each with its own driver;
    // one site's failure never halts the batch.
    for site in &sites {
        progress.set_message(site.company.clone());

        match crawl_one(site, headless).await {
            Ok(report) => {
                if let Some(failure) = &report.failure {
                    failed_sites += 1;
                    progress.println(format!(
                        "{} {}: {} ({} jobs kept from earlier pages)",
                        style("✗").red(),
                        site.company,
                        failure,
                        report.records.len()
                    ));
                } else {
                    progress.println(format!(
                        "{} {}: {} jobs across {} pages",
                        style("✓").green(),
                        site.company,
                        report.records.len(),
                        report.pages_visited
                    ));
                }

                total += report.records.len();
                if let Some(repo) = &repo {
                    let (created, updated) = repo.store_all(&report.records)?;
                    debug!(
                        "{}: {} new, {} refreshed",
                        site.company, created, updated
                    );
                }
            }
            Err(e) => {
                failed_sites += 1;
                progress.println(format!("{} {}: {}", style("✗").red(), site.company, e));
            }
        }

        progress.inc(1);
    }

    progress.finish_and_clear();

    println!(
        "Found {} jobs across {} sites ({} failed)",
        style(total).bold(),
        sites.len(),
        failed_sites
    );
    if args.dry_run {
        println!("Dry run: nothing was stored");
    } else {
        println!("Stored in {}", settings.database_path.display());
    }

    Ok(())
}

/// Crawl one site with a fresh driver, releasing it on every exit path.
async fn crawl_one(site: &SiteConfig, headless: bool) -> Result<CrawlReport, CrawlError> {
    let mut driver = build_driver(site, headless).await?;
    let report = crawl_site(driver.as_mut(), site).await;
    if let Err(e) = driver.close().await {
        debug!("Driver close failed for {}: {}", site.company, e);
    }
    Ok(report)
}

async fn build_driver(
    site: &SiteConfig,
    headless: bool,
) -> Result<Box<dyn PageDriver>, CrawlError> {
    #[cfg(feature = "browser")]
    {
        if site.use_browser {
            let session = crate::crawler::browser::BrowserSession::launch(headless).await?;
            return Ok(Box::new(session));
        }
    }

    #[cfg(not(feature = "browser"))]
    {
        let _ = headless;
        if site.use_browser {
            tracing::warn!(
                "Browser support not compiled; fetching {} statically. Rebuild with --features browser",
                site.company
            );
        }
    }

    Ok(Box::new(StaticPage::new()?))
}
