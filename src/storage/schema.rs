//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Skillsift
//! database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    role TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    error_message TEXT
);

-- Track discovered postings (phase 1 output)
CREATE TABLE IF NOT EXISTS postings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source TEXT NOT NULL,
    candidate_id TEXT NOT NULL,
    url TEXT NOT NULL,
    title TEXT NOT NULL,
    role TEXT NOT NULL,
    detailed INTEGER NOT NULL DEFAULT 0,
    discovered_at TEXT NOT NULL,
    discovered_run INTEGER NOT NULL REFERENCES runs(id),
    UNIQUE(source, candidate_id)
);

CREATE INDEX IF NOT EXISTS idx_postings_source ON postings(source);
CREATE INDEX IF NOT EXISTS idx_postings_undetailed ON postings(source, role, detailed);

-- Track fetched details with extracted skills (phase 2 output)
CREATE TABLE IF NOT EXISTS details (
    posting_id INTEGER PRIMARY KEY REFERENCES postings(id),
    role TEXT NOT NULL,
    company TEXT NOT NULL,
    description TEXT NOT NULL,
    skills TEXT NOT NULL,
    posted_at TEXT,
    fetched_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_details_role ON details(role);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
