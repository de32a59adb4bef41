//! Configuration module for Skillsift
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files, including the per-source selector tables.
//!
//! # Example
//!
//! ```no_run
//! use skillsift::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Detail window size: {}", config.crawler.window_size);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, OutputConfig, SelectorConfig, SkillsConfig, SourceConfig,
    UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
