//! `harvest jobs` - inspect stored records.

use clap::Subcommand;
use console::style;

use crate::config::Settings;
use crate::repository::JobRepository;

#[derive(Subcommand)]
pub enum JobsCommand {
    /// List stored jobs
    List {
        /// Restrict to one company
        #[arg(long)]
        company: Option<String>,

        /// Maximum rows to print
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },

    /// Per-company record counts
    Stats,
}

pub fn run(command: JobsCommand, settings: &Settings) -> anyhow::Result<()> {
    let repo = JobRepository::new(&settings.database_path)?;

    match command {
        JobsCommand::List { company, limit } => {
            let jobs = repo.list(company.as_deref())?;
            if jobs.is_empty() {
                println!("No jobs stored yet. Run `harvest crawl` first.");
                return Ok(());
            }

            for job in jobs.iter().take(limit) {
                // The tilde marks records from the positional fallback.
                let marker = if job.via_heuristic { "~" } else { " " };
                println!(
                    "{}{} {} {} {}",
                    marker,
                    style(&job.title).bold(),
                    style("·").dim(),
                    job.location,
                    style(format!("({}/{})", job.company, job.id)).dim()
                );
            }
            if jobs.len() > limit {
                println!("... and {} more (use --limit)", jobs.len() - limit);
            }
        }

        JobsCommand::Stats => {
            let counts = repo.count_by_company()?;
            if counts.is_empty() {
                println!("No jobs stored yet.");
                return Ok(());
            }
            for (company, count) in &counts {
                println!("{:>8}  {}", count, style(company).bold());
            }
            println!("{:>8}  total", repo.count()?);
        }
    }

    Ok(())
}
