//! Job repository: idempotent storage keyed on (company, job_id).

use std::path::{Path, PathBuf};

use chrono::Utc;
use rusqlite::{params, Connection, Row};
use tracing::warn;

use super::Result;
use crate::models::JobRecord;

/// SQLite-backed job store.
///
/// Re-crawling a site must never duplicate rows: the same `(company, id)`
/// pair updates the existing record in place, refreshing its mutable fields
/// and `last_seen` while keeping `first_seen` from the first sighting.
pub struct JobRepository {
    db_path: PathBuf,
}

impl JobRepository {
    pub fn new(db_path: &Path) -> Result<Self> {
        let repo = Self {
            db_path: db_path.to_path_buf(),
        };
        repo.init_schema()?;
        Ok(repo)
    }

    fn connect(&self) -> Result<Connection> {
        super::connect(&self.db_path)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.connect()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS jobs (
                company TEXT NOT NULL,
                job_id TEXT NOT NULL,
                title TEXT NOT NULL,
                team TEXT NOT NULL,
                location TEXT NOT NULL,
                posted TEXT NOT NULL,
                url TEXT NOT NULL,
                description TEXT NOT NULL,
                via_heuristic INTEGER NOT NULL DEFAULT 0,
                first_seen TEXT NOT NULL,
                last_seen TEXT NOT NULL,
                PRIMARY KEY (company, job_id)
            );
            CREATE INDEX IF NOT EXISTS idx_jobs_company ON jobs(company);
        "#,
        )?;
        Ok(())
    }

    /// Insert or refresh one record. Returns true when the row was new.
    pub fn upsert(&self, record: &JobRecord) -> Result<bool> {
        let conn = self.connect()?;
        let now = Utc::now().to_rfc3339();

        let existed: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM jobs WHERE company = ? AND job_id = ?)",
            params![record.company, record.id],
            |row| row.get(0),
        )?;

        conn.execute(
            r#"
            INSERT INTO jobs (
                company, job_id, title, team, location, posted, url,
                description, via_heuristic, first_seen, last_seen
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
            ON CONFLICT(company, job_id) DO UPDATE SET
                title = excluded.title,
                team = excluded.team,
                location = excluded.location,
                posted = excluded.posted,
                url = excluded.url,
                description = excluded.description,
                via_heuristic = excluded.via_heuristic,
                last_seen = excluded.last_seen
        "#,
            params![
                record.company,
                record.id,
                record.title,
                record.team,
                record.location,
                record.posted,
                record.url,
                record.description,
                record.via_heuristic,
                now,
            ],
        )?;

        Ok(!existed)
    }

    /// Store a batch, returning (created, updated) counts. Records missing
    /// their identity fields are refused rather than stored under an empty
    /// key.
    pub fn store_all(&self, records: &[JobRecord]) -> Result<(usize, usize)> {
        let mut created = 0;
        let mut updated = 0;
        for record in records {
            if !record.is_valid() {
                warn!("Refusing to store record without id/url: {:?}", record.title);
                continue;
            }
            if self.upsert(record)? {
                created += 1;
            } else {
                updated += 1;
            }
        }
        Ok((created, updated))
    }

    /// Get one record by its identity.
    pub fn get(&self, company: &str, id: &str) -> Result<Option<JobRecord>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare("SELECT * FROM jobs WHERE company = ? AND job_id = ?")?;
        let mut rows = stmt.query_map(params![company, id], row_to_record)?;
        Ok(rows.next().transpose()?)
    }

    /// All records, optionally restricted to one company, newest last seen
    /// first.
    pub fn list(&self, company: Option<&str>) -> Result<Vec<JobRecord>> {
        let conn = self.connect()?;
        let records = match company {
            Some(company) => {
                let mut stmt = conn.prepare(
                    "SELECT * FROM jobs WHERE company = ? ORDER BY last_seen DESC, job_id",
                )?;
                let rows = stmt.query_map(params![company], row_to_record)?;
                rows.collect::<std::result::Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt =
                    conn.prepare("SELECT * FROM jobs ORDER BY company, last_seen DESC, job_id")?;
                let rows = stmt.query_map([], row_to_record)?;
                rows.collect::<std::result::Result<Vec<_>, _>>()?
            }
        };
        Ok(records)
    }

    /// Per-company record counts.
    pub fn count_by_company(&self) -> Result<Vec<(String, u64)>> {
        let conn = self.connect()?;
        let mut stmt =
            conn.prepare("SELECT company, COUNT(*) FROM jobs GROUP BY company ORDER BY company")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    /// Total stored records.
    pub fn count(&self) -> Result<u64> {
        let conn = self.connect()?;
        Ok(conn.query_row("SELECT COUNT(*) FROM jobs", [], |row| row.get(0))?)
    }
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<JobRecord> {
    Ok(JobRecord {
        company: row.get("company")?,
        id: row.get("job_id")?,
        title: row.get("title")?,
        team: row.get("team")?,
        location: row.get("location")?,
        posted: row.get("posted")?,
        url: row.get("url")?,
        description: row.get("description")?,
        via_heuristic: row.get("via_heuristic")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_repo() -> (tempfile::TempDir, JobRepository) {
        let dir = tempfile::tempdir().unwrap();
        let repo = JobRepository::new(&dir.path().join("jobs.db")).unwrap();
        (dir, repo)
    }

    fn record(company: &str, id: &str, title: &str) -> JobRecord {
        let mut record =
            JobRecord::new(company, id, format!("https://{company}.test/jobs/{id}/"));
        record.title = title.to_string();
        record
    }

    #[test]
    fn storing_same_identity_twice_keeps_one_row() {
        let (_dir, repo) = temp_repo();

        let first = record("apple", "200554", "Engineer");
        let mut second = first.clone();
        second.title = "Senior Engineer".to_string();

        assert!(repo.upsert(&first).unwrap());
        assert!(!repo.upsert(&second).unwrap());

        assert_eq!(repo.count().unwrap(), 1);
        let stored = repo.get("apple", "200554").unwrap().unwrap();
        assert_eq!(stored.title, "Senior Engineer");
    }

    #[test]
    fn same_id_under_different_companies_are_distinct() {
        let (_dir, repo) = temp_repo();

        repo.upsert(&record("apple", "1", "A")).unwrap();
        repo.upsert(&record("meta", "1", "B")).unwrap();

        assert_eq!(repo.count().unwrap(), 2);
        assert_eq!(
            repo.count_by_company().unwrap(),
            vec![("apple".to_string(), 1), ("meta".to_string(), 1)]
        );
    }

    #[test]
    fn list_filters_by_company() {
        let (_dir, repo) = temp_repo();

        repo.upsert(&record("apple", "1", "A")).unwrap();
        repo.upsert(&record("apple", "2", "B")).unwrap();
        repo.upsert(&record("meta", "9", "C")).unwrap();

        assert_eq!(repo.list(Some("apple")).unwrap().len(), 2);
        assert_eq!(repo.list(None).unwrap().len(), 3);
        assert!(repo.list(Some("netflix")).unwrap().is_empty());
    }

    #[test]
    fn heuristic_flag_round_trips() {
        let (_dir, repo) = temp_repo();

        let mut flagged = record("apple", "5", "ML Engineer");
        flagged.via_heuristic = true;
        repo.upsert(&flagged).unwrap();

        let stored = repo.get("apple", "5").unwrap().unwrap();
        assert!(stored.via_heuristic);
    }
}
