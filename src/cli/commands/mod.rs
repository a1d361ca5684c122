//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific
//! modules.

mod crawl;
mod export;
mod jobs;
mod sites;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Settings;

#[derive(Parser)]
#[command(name = "harvest")]
#[command(about = "Job posting acquisition and tracking system")]
#[command(version)]
pub struct Cli {
    /// Database file (overrides config file)
    #[arg(long, short = 'd', global = true)]
    database: Option<PathBuf>,

    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl configured career sites and store the listings
    Crawl(crawl::CrawlArgs),

    /// Inspect stored jobs
    Jobs {
        #[command(subcommand)]
        command: jobs::JobsCommand,
    },

    /// Export stored jobs to CSV or JSON
    Export(export::ExportArgs),

    /// Inspect site configurations
    Sites {
        #[command(subcommand)]
        command: sites::SitesCommand,
    },
}

/// Parse arguments, load settings, and dispatch.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(database) = cli.database {
        settings.database_path = database;
    }

    match cli.command {
        Commands::Crawl(args) => crawl::run(args, &settings).await,
        Commands::Jobs { command } => jobs::run(command, &settings),
        Commands::Export(args) => export::run(args, &settings),
        Commands::Sites { command } => sites::run(command, &settings),
    }
}
