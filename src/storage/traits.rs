//! Repository trait and error types
//!
//! This module defines the trait interface for persistence backends and
//! associated error types.

use crate::storage::{JobDetail, PostingRecord, RunRecord, RunStatus};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Posting not found: {board}/{candidate_id}")]
    PostingNotFound { board: String, candidate_id: String },

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for persistence backends
///
/// Every call is individually atomic; the pipeline never needs a
/// cross-call transaction. A candidate is marked detailed only after its
/// detail row (including extracted skills) has been written, so a write
/// that half-fails leaves the candidate eligible for retry on the next run.
pub trait Repository {
    // ===== Run Management =====

    /// Creates a new crawl run for the given role keyword
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, role: &str, config_hash: &str) -> StorageResult<i64>;

    /// Marks a run as completed with a finish timestamp
    fn complete_run(&mut self, run_id: i64) -> StorageResult<()>;

    /// Marks a run as failed, recording the error
    fn fail_run(&mut self, run_id: i64, error: &str) -> StorageResult<()>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    // ===== Phase 1: Discovery =====

    /// Inserts or refreshes a discovered posting
    ///
    /// Called the moment a candidate is admitted, not batched, so a crashed
    /// run loses at most the in-flight discovery page. Re-discovering a
    /// known candidate refreshes its url/title and leaves its detailed flag
    /// untouched.
    fn upsert_discovered(
        &mut self,
        source: &str,
        candidate_id: &str,
        url: &str,
        title: &str,
        role: &str,
        run_id: i64,
    ) -> StorageResult<()>;

    /// Returns up to `limit` discovered-but-not-detailed candidates for a
    /// source and role keyword, as (candidate_id, url) pairs in discovery
    /// order
    fn get_undetailed(
        &self,
        source: &str,
        role: &str,
        limit: usize,
    ) -> StorageResult<Vec<(String, String)>>;

    /// Gets a posting by its source-scoped candidate id
    fn get_posting(&self, source: &str, candidate_id: &str) -> StorageResult<PostingRecord>;

    // ===== Phase 2: Details =====

    /// Persists a fetched detail (including extracted skills)
    ///
    /// Returns `true` if a new detail row was inserted, `false` if an
    /// existing row was replaced.
    fn upsert_detail(&mut self, detail: &JobDetail) -> StorageResult<bool>;

    /// Flags a posting as detailed
    ///
    /// Called only after `upsert_detail` succeeds.
    fn mark_detailed(&mut self, source: &str, candidate_id: &str) -> StorageResult<()>;

    // ===== Statistics =====

    /// Total number of discovered postings
    fn count_discovered(&self) -> StorageResult<u64>;

    /// Total number of detailed postings
    fn count_detailed(&self) -> StorageResult<u64>;

    /// Per-source (discovered, detailed) counts, sorted by source name
    fn count_by_source(&self) -> StorageResult<Vec<(String, u64, u64)>>;

    /// Skill frequency across stored details, optionally filtered by role
    /// keyword, most frequent first
    fn skill_counts(&self, role: Option<&str>, limit: usize)
        -> StorageResult<Vec<(String, u64)>>;

    /// Run status counts for reporting
    fn count_runs_by_status(&self, status: RunStatus) -> StorageResult<u64>;
}
