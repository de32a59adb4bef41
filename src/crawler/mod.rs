//! Crawler module for posting discovery and detail fetching
//!
//! This module contains the core crawl logic, including:
//! - Round-robin multi-source discovery
//! - The rolling-window detail worker pool
//! - Tiered per-source rate limiting
//! - Overall crawl coordination and run tracking

mod collector;
mod coordinator;
mod limiter;
mod parser;
mod worker;

pub use collector::{Collector, DiscoveryOutcome};
pub use coordinator::Coordinator;
pub use limiter::{Backoff, PacingTier, RateLimiter, RequestPermit};
pub use parser::{parse_detail_page, parse_discovery_page, DiscoveredCandidate, ParsedDetail};
pub use worker::{drain, CrawlCounters, WorkItem, WorkerContext};

use crate::config::{Config, SourceConfig};
use crate::render::HttpRenderer;
use crate::skills::{SkillExtractor, SkillReference};
use crate::storage::{open_repository, JobDetail};
use crate::SiftError;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Progress callback: `(discovered_count, detailed_count)`
pub type ProgressFn = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// One crawl invocation, immutable once the crawl starts
#[derive(Debug, Clone)]
pub struct CrawlRequest {
    /// Role keyword substituted into discovery URLs
    pub role: String,

    /// Number of detailed postings to collect
    pub target_count: usize,

    /// Concurrent detail-fetch workers
    pub window_size: usize,

    /// Pacing tier for every source in this request
    pub tier: PacingTier,

    /// Consecutive render errors before a source is marked exhausted
    pub source_error_threshold: u32,

    /// Per-render timeout
    pub render_timeout: Duration,

    /// Sources, in the fixed round-robin visiting order
    pub sources: Vec<SourceConfig>,
}

impl CrawlRequest {
    /// Assembles a request from loaded configuration plus CLI overrides
    pub fn from_config(
        config: &Config,
        role: &str,
        target_count: Option<usize>,
        tier: Option<PacingTier>,
    ) -> Self {
        let tier = tier
            .or_else(|| PacingTier::from_name(&config.crawler.tier))
            .unwrap_or(PacingTier::Balanced);

        Self {
            role: role.to_string(),
            target_count: target_count.unwrap_or(config.crawler.default_target_count),
            window_size: config.crawler.window_size,
            tier,
            source_error_threshold: config.crawler.source_error_threshold,
            render_timeout: Duration::from_secs(config.crawler.render_timeout_secs),
            sources: config.sources.clone(),
        }
    }
}

/// Counters returned alongside the collected details
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    /// Candidates handed to the worker pool
    pub attempted: usize,

    /// Details fetched, extracted and persisted
    pub succeeded: usize,

    /// Candidates dropped after retries or validation failures
    pub failed: usize,

    /// Rate-limit signals observed across all sources
    pub rate_limit_hits: u64,

    /// Candidates admitted during this run's discovery phase
    pub discovered: usize,

    /// Details collected before truncation to the target (overshoot kept
    /// for observability)
    pub raw_collected: usize,
}

/// The final product of one crawl
#[derive(Debug)]
pub struct CrawlOutcome {
    /// At most `target_count` details, in completion order
    pub details: Vec<JobDetail>,

    /// Attempt accounting for the whole request
    pub summary: CrawlSummary,
}

/// Runs a complete crawl against the configured sources
///
/// This is the main entry point for library callers. It will:
/// 1. Open the repository and record a run
/// 2. Load the skill reference and compile the extractor
/// 3. Discover candidates round-robin across sources (phase 1)
/// 4. Fetch, extract and persist details through the worker pool (phase 2)
/// 5. Return the collected details with a summary
///
/// # Arguments
///
/// * `config` - The loaded configuration
/// * `request` - The crawl request (role, target, tier, sources)
/// * `config_hash` - Hash of the configuration file, recorded on the run
/// * `progress` - Optional `(discovered, detailed)` callback
pub async fn crawl(
    config: &Config,
    request: CrawlRequest,
    config_hash: &str,
    progress: Option<ProgressFn>,
) -> Result<CrawlOutcome, SiftError> {
    let repository = open_repository(Path::new(&config.output.database_path))?;

    let reference = SkillReference::load(
        config
            .skills
            .reference_path
            .as_ref()
            .map(Path::new),
    )?;
    let extractor = SkillExtractor::new(reference)?;

    let renderer = HttpRenderer::new(&config.user_agent)?;

    let mut coordinator = Coordinator::new(
        request,
        Arc::new(Mutex::new(repository)),
        Arc::new(renderer),
        Arc::new(extractor),
        config_hash.to_string(),
    );
    if let Some(progress) = progress {
        coordinator = coordinator.with_progress(progress);
    }

    coordinator.run().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CrawlerConfig, OutputConfig, SkillsConfig, UserAgentConfig};

    fn test_config() -> Config {
        Config {
            crawler: CrawlerConfig {
                window_size: 4,
                default_target_count: 10,
                tier: "conservative".to_string(),
                source_error_threshold: 3,
                render_timeout_secs: 30,
            },
            user_agent: UserAgentConfig {
                crawler_name: "TestSift".to_string(),
                crawler_version: "1.0".to_string(),
                contact_url: "https://example.com/about".to_string(),
                contact_email: "admin@example.com".to_string(),
            },
            output: OutputConfig {
                database_path: "./test.db".to_string(),
                summary_path: "./summary.md".to_string(),
            },
            skills: SkillsConfig::default(),
            sources: vec![],
        }
    }

    #[test]
    fn test_request_from_config_uses_defaults() {
        let config = test_config();
        let request = CrawlRequest::from_config(&config, "Data Analyst", None, None);

        assert_eq!(request.role, "Data Analyst");
        assert_eq!(request.target_count, 10);
        assert_eq!(request.window_size, 4);
        assert_eq!(request.tier, PacingTier::Conservative);
    }

    #[test]
    fn test_request_overrides_win() {
        let config = test_config();
        let request = CrawlRequest::from_config(
            &config,
            "Data Analyst",
            Some(5),
            Some(PacingTier::Aggressive),
        );

        assert_eq!(request.target_count, 5);
        assert_eq!(request.tier, PacingTier::Aggressive);
    }
}
