//! `harvest sites` - inspect site configurations.

use clap::Subcommand;
use console::style;

use crate::config::Settings;
use crate::models::{builtin_sites, SiteConfig};

#[derive(Subcommand)]
pub enum SitesCommand {
    /// List known sites
    List,

    /// Print one site's full configuration as JSON
    Show { name: String },
}

/// Built-in sites overlaid with any definitions from the sites directory;
/// a file with a matching company name replaces the built-in.
pub(crate) fn load_sites(settings: &Settings) -> Vec<SiteConfig> {
    let mut sites = builtin_sites();

    if let Some(dir) = &settings.sites_dir {
        for site in SiteConfig::load_dir(dir) {
            match sites.iter_mut().find(|s| s.company == site.company) {
                Some(existing) => *existing = site,
                None => sites.push(site),
            }
        }
    }

    sites.sort_by(|a, b| a.company.cmp(&b.company));
    sites
}

pub fn run(command: SitesCommand, settings: &Settings) -> anyhow::Result<()> {
    let sites = load_sites(settings);

    match command {
        SitesCommand::List => {
            for site in &sites {
                let mode = if site.use_browser { "browser" } else { "static" };
                println!(
                    "{:<12} {} {}",
                    style(&site.company).bold(),
                    style(mode).dim(),
                    site.base_url
                );
            }
        }

        SitesCommand::Show { name } => {
            let site = sites
                .iter()
                .find(|s| s.company == name)
                .ok_or_else(|| anyhow::anyhow!("unknown site {:?}", name))?;
            println!("{}", serde_json::to_string_pretty(site)?);
        }
    }

    Ok(())
}
