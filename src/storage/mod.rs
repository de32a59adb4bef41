//! Storage module for persisting crawl data
//!
//! This module handles all database operations for the crawler, including:
//! - SQLite database initialization and schema management
//! - Discovered-posting persistence (phase 1 output)
//! - Detail persistence with extracted skills (phase 2 output)
//! - Run tracking and incremental resumption support

mod schema;
mod sqlite;
mod traits;

pub use sqlite::{parse_stored_timestamp, SqliteRepository};
pub use traits::{Repository, StorageError, StorageResult};

use crate::SiftError;
use chrono::{DateTime, Utc};
use std::path::Path;

/// Initializes or opens a repository database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteRepository)` - Successfully initialized repository
/// * `Err(SiftError)` - Failed to initialize
pub fn open_repository(path: &Path) -> Result<SqliteRepository, SiftError> {
    SqliteRepository::new(path)
}

/// One fully fetched job posting
///
/// Created once per successfully rendered detail page, immutable after
/// creation, and owned by the worker pool until handed to the repository.
#[derive(Debug, Clone, PartialEq)]
pub struct JobDetail {
    /// Opaque identifier of the posting within its source platform
    pub candidate_id: String,

    /// Name of the source this posting was discovered through
    pub source: String,

    /// Role title from the detail page
    pub role: String,

    /// Company name from the detail page
    pub company: String,

    /// Detail page URL
    pub url: String,

    /// Raw description text
    pub description: String,

    /// Canonical, deduplicated skills extracted from the description
    pub skills: Vec<String>,

    /// Posting timestamp, when the page carries one
    pub posted_at: Option<DateTime<Utc>>,
}

/// A posting discovered in phase 1 but not necessarily detailed yet
#[derive(Debug, Clone)]
pub struct PostingRecord {
    pub id: i64,
    pub source: String,
    pub candidate_id: String,
    pub url: String,
    pub title: String,
    pub role: String,
    pub detailed: bool,
    pub discovered_at: String,
    pub discovered_run: i64,
}

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub role: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub error_message: Option<String>,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_status_roundtrip() {
        for status in &[RunStatus::Running, RunStatus::Completed, RunStatus::Failed] {
            let db_str = status.to_db_string();
            let parsed = RunStatus::from_db_string(db_str);
            assert_eq!(Some(*status), parsed);
        }
    }

    #[test]
    fn test_run_status_invalid() {
        assert_eq!(RunStatus::from_db_string("invalid"), None);
    }
}
