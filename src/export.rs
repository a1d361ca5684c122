//! CSV and JSON export of stored job records.

use std::path::Path;

use anyhow::Context;
use tracing::info;

use crate::models::JobRecord;

/// Export format selector for the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

/// Write records to `path` in the given format, creating parent directories.
pub fn export_jobs(jobs: &[JobRecord], format: ExportFormat, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }

    match format {
        ExportFormat::Csv => export_csv(jobs, path),
        ExportFormat::Json => export_json(jobs, path),
    }?;

    info!("Exported {} jobs to {}", jobs.len(), path.display());
    Ok(())
}

fn export_csv(jobs: &[JobRecord], path: &Path) -> anyhow::Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    for job in jobs {
        writer.serialize(job)?;
    }
    writer.flush()?;
    Ok(())
}

fn export_json(jobs: &[JobRecord], path: &Path) -> anyhow::Result<()> {
    let file =
        std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(file, jobs)?;
    Ok(())
}
