//! SQLite repository implementation
//!
//! This module provides a SQLite-based implementation of the Repository
//! trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Repository, StorageError, StorageResult};
use crate::storage::{JobDetail, PostingRecord, RunRecord, RunStatus};
use crate::SiftError;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// SQLite persistence backend
pub struct SqliteRepository {
    conn: Connection,
}

impl SqliteRepository {
    /// Creates a new SqliteRepository instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteRepository)` - Successfully opened/created database
    /// * `Err(SiftError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, SiftError> {
        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self, SiftError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn posting_id(&self, source: &str, candidate_id: &str) -> StorageResult<Option<i64>> {
        let id = self
            .conn
            .query_row(
                "SELECT id FROM postings WHERE source = ?1 AND candidate_id = ?2",
                params![source, candidate_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    fn row_to_run(row: &rusqlite::Row<'_>) -> rusqlite::Result<RunRecord> {
        Ok(RunRecord {
            id: row.get(0)?,
            role: row.get(1)?,
            started_at: row.get(2)?,
            finished_at: row.get(3)?,
            config_hash: row.get(4)?,
            status: RunStatus::from_db_string(&row.get::<_, String>(5)?)
                .unwrap_or(RunStatus::Running),
            error_message: row.get(6)?,
        })
    }
}

const RUN_COLUMNS: &str = "id, role, started_at, finished_at, config_hash, status, error_message";

impl Repository for SqliteRepository {
    // ===== Run Management =====

    fn create_run(&mut self, role: &str, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (role, started_at, config_hash, status) VALUES (?1, ?2, ?3, ?4)",
            params![role, now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn complete_run(&mut self, run_id: i64) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![RunStatus::Completed.to_db_string(), now, run_id],
        )?;
        Ok(())
    }

    fn fail_run(&mut self, run_id: i64, error: &str) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, error_message = ?3 WHERE id = ?4",
            params![RunStatus::Failed.to_db_string(), now, error, run_id],
        )?;
        Ok(())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS))?;

        stmt.query_row(params![run_id], Self::row_to_run)
            .map_err(|_| StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM runs ORDER BY id DESC LIMIT 1",
            RUN_COLUMNS
        ))?;

        let run = stmt.query_row([], Self::row_to_run).optional()?;
        Ok(run)
    }

    // ===== Phase 1: Discovery =====

    fn upsert_discovered(
        &mut self,
        source: &str,
        candidate_id: &str,
        url: &str,
        title: &str,
        role: &str,
        run_id: i64,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO postings (source, candidate_id, url, title, role, discovered_at, discovered_run)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(source, candidate_id)
             DO UPDATE SET url = excluded.url, title = excluded.title, role = excluded.role",
            params![source, candidate_id, url, title, role, now, run_id],
        )?;
        Ok(())
    }

    fn get_undetailed(
        &self,
        source: &str,
        role: &str,
        limit: usize,
    ) -> StorageResult<Vec<(String, String)>> {
        let mut stmt = self.conn.prepare(
            "SELECT candidate_id, url FROM postings
             WHERE source = ?1 AND role = ?2 AND detailed = 0
             ORDER BY id LIMIT ?3",
        )?;

        let rows = stmt.query_map(params![source, role, limit as i64], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn get_posting(&self, source: &str, candidate_id: &str) -> StorageResult<PostingRecord> {
        let mut stmt = self.conn.prepare(
            "SELECT id, source, candidate_id, url, title, role, detailed, discovered_at, discovered_run
             FROM postings WHERE source = ?1 AND candidate_id = ?2",
        )?;

        stmt.query_row(params![source, candidate_id], |row| {
            Ok(PostingRecord {
                id: row.get(0)?,
                source: row.get(1)?,
                candidate_id: row.get(2)?,
                url: row.get(3)?,
                title: row.get(4)?,
                role: row.get(5)?,
                detailed: row.get::<_, i64>(6)? != 0,
                discovered_at: row.get(7)?,
                discovered_run: row.get(8)?,
            })
        })
        .optional()?
        .ok_or_else(|| StorageError::PostingNotFound {
            board: source.to_string(),
            candidate_id: candidate_id.to_string(),
        })
    }

    // ===== Phase 2: Details =====

    fn upsert_detail(&mut self, detail: &JobDetail) -> StorageResult<bool> {
        let posting_id = self
            .posting_id(&detail.source, &detail.candidate_id)?
            .ok_or_else(|| StorageError::PostingNotFound {
                board: detail.source.clone(),
                candidate_id: detail.candidate_id.clone(),
            })?;

        let skills = serde_json::to_string(&detail.skills)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        let posted_at = detail.posted_at.map(|t| t.to_rfc3339());
        let now = Utc::now().to_rfc3339();

        let existing: Option<i64> = self
            .conn
            .query_row(
                "SELECT posting_id FROM details WHERE posting_id = ?1",
                params![posting_id],
                |row| row.get(0),
            )
            .optional()?;

        self.conn.execute(
            "INSERT INTO details (posting_id, role, company, description, skills, posted_at, fetched_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(posting_id)
             DO UPDATE SET role = excluded.role, company = excluded.company,
                           description = excluded.description, skills = excluded.skills,
                           posted_at = excluded.posted_at, fetched_at = excluded.fetched_at",
            params![
                posting_id,
                detail.role,
                detail.company,
                detail.description,
                skills,
                posted_at,
                now
            ],
        )?;

        Ok(existing.is_none())
    }

    fn mark_detailed(&mut self, source: &str, candidate_id: &str) -> StorageResult<()> {
        self.conn.execute(
            "UPDATE postings SET detailed = 1 WHERE source = ?1 AND candidate_id = ?2",
            params![source, candidate_id],
        )?;
        Ok(())
    }

    // ===== Statistics =====

    fn count_discovered(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM postings", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_detailed(&self) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM postings WHERE detailed = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_by_source(&self) -> StorageResult<Vec<(String, u64, u64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT source, COUNT(*), SUM(detailed) FROM postings
             GROUP BY source ORDER BY source",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)? as u64,
                row.get::<_, Option<i64>>(2)?.unwrap_or(0) as u64,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn skill_counts(
        &self,
        role: Option<&str>,
        limit: usize,
    ) -> StorageResult<Vec<(String, u64)>> {
        // The skills column is a JSON array; json_each unnests it so one
        // posting counts once per distinct skill it lists.
        let (sql, role_filter) = match role {
            Some(r) => (
                "SELECT je.value, COUNT(*) AS n
                 FROM details d, json_each(d.skills) je
                 WHERE d.role LIKE '%' || ?1 || '%'
                 GROUP BY je.value ORDER BY n DESC, je.value LIMIT ?2",
                Some(r),
            ),
            None => (
                "SELECT je.value, COUNT(*) AS n
                 FROM details d, json_each(d.skills) je
                 GROUP BY je.value ORDER BY n DESC, je.value LIMIT ?1",
                None,
            ),
        };

        let mut stmt = self.conn.prepare(sql)?;
        let map = |row: &rusqlite::Row<'_>| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
        };

        let rows = match role_filter {
            Some(r) => stmt.query_map(params![r, limit as i64], map)?,
            None => stmt.query_map(params![limit as i64], map)?,
        };

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn count_runs_by_status(&self, status: RunStatus) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM runs WHERE status = ?1",
            params![status.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

/// Parses an RFC-3339 timestamp stored by this backend
pub fn parse_stored_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
