//! Skillsift: a job-posting crawler and skill-demand extractor
//!
//! This crate implements a concurrent crawl pipeline that discovers job
//! postings across multiple sources, fetches posting details through a
//! pluggable page renderer, and converts free-text descriptions into a
//! canonical skill list for aggregate demand analysis.

pub mod config;
pub mod crawler;
pub mod output;
pub mod render;
pub mod skills;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Skillsift operations
#[derive(Debug, Error)]
pub enum SiftError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Render error: {0}")]
    Render(#[from] render::RenderError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Skill reference error: {0}")]
    Reference(#[from] skills::ReferenceError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No source could be reached for role '{role}'")]
    AllSourcesUnreachable { role: String },

    #[error("Summary error: {0}")]
    Summary(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid URL template: {0}")]
    InvalidTemplate(String),
}

/// Result type alias for Skillsift operations
pub type Result<T> = std::result::Result<T, SiftError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlOutcome, CrawlRequest, CrawlSummary, PacingTier};
pub use skills::SkillExtractor;
pub use state::CrawlState;
pub use storage::JobDetail;
