//! `harvest export` - write stored records to CSV or JSON.

use std::path::PathBuf;

use chrono::Utc;
use clap::Args;

use crate::config::Settings;
use crate::export::{export_jobs, ExportFormat};
use crate::repository::JobRepository;

#[derive(Args)]
pub struct ExportArgs {
    /// Output format
    #[arg(long, value_enum, default_value = "csv")]
    format: ExportFormat,

    /// Output file (defaults into the configured export directory)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Restrict to one company
    #[arg(long)]
    company: Option<String>,
}

pub fn run(args: ExportArgs, settings: &Settings) -> anyhow::Result<()> {
    let repo = JobRepository::new(&settings.database_path)?;
    let jobs = repo.list(args.company.as_deref())?;

    if jobs.is_empty() {
        println!("Nothing to export.");
        return Ok(());
    }

    let path = args.output.unwrap_or_else(|| {
        let stem = match &args.company {
            Some(company) => format!("{company}-jobs"),
            None => "jobs".to_string(),
        };
        settings.export_dir.join(format!(
            "{}-{}.{}",
            stem,
            Utc::now().format("%Y%m%d"),
            args.format.extension()
        ))
    });

    export_jobs(&jobs, args.format, &path)?;
    println!("Wrote {} jobs to {}", jobs.len(), path.display());
    Ok(())
}
