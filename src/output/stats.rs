//! Statistics generation from the crawl database
//!
//! This module provides functionality for extracting and displaying
//! skill-demand statistics from the repository.

use crate::storage::{Repository, RunStatus};
use crate::SiftError;

/// How many skills the console view and reports show
const TOP_SKILL_LIMIT: usize = 25;

/// Aggregate demand statistics
#[derive(Debug, Clone)]
pub struct DemandStatistics {
    /// Total number of postings discovered
    pub total_discovered: u64,

    /// Postings with fetched details and extracted skills
    pub total_detailed: u64,

    /// Per-source (discovered, detailed) counts
    pub by_source: Vec<(String, u64, u64)>,

    /// Most frequently mentioned skills, descending
    pub top_skills: Vec<(String, u64)>,

    /// Completed crawl runs
    pub completed_runs: u64,

    /// Failed crawl runs
    pub failed_runs: u64,
}

/// Loads statistics from the repository
///
/// # Arguments
///
/// * `repository` - The repository to query
/// * `role` - Optional role keyword to filter skill counts by
pub fn load_statistics(
    repository: &dyn Repository,
    role: Option<&str>,
) -> Result<DemandStatistics, SiftError> {
    let total_discovered = repository.count_discovered()?;
    let total_detailed = repository.count_detailed()?;
    let by_source = repository.count_by_source()?;
    let top_skills = repository.skill_counts(role, TOP_SKILL_LIMIT)?;
    let completed_runs = repository.count_runs_by_status(RunStatus::Completed)?;
    let failed_runs = repository.count_runs_by_status(RunStatus::Failed)?;

    Ok(DemandStatistics {
        total_discovered,
        total_detailed,
        by_source,
        top_skills,
        completed_runs,
        failed_runs,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &DemandStatistics) {
    println!("=== Skill Demand Statistics ===\n");

    println!("Overview:");
    println!("  Postings discovered: {}", stats.total_discovered);
    println!("  Postings detailed:   {}", stats.total_detailed);
    println!(
        "  Runs: {} completed, {} failed",
        stats.completed_runs, stats.failed_runs
    );
    println!();

    if !stats.by_source.is_empty() {
        println!("By Source:");
        for (source, discovered, detailed) in &stats.by_source {
            println!("  {}: {} discovered, {} detailed", source, discovered, detailed);
        }
        println!();
    }

    if stats.top_skills.is_empty() {
        println!("No skills extracted yet.");
    } else {
        println!("Top Skills:");
        for (skill, count) in &stats.top_skills {
            println!("  {:<24} {}", skill, count);
        }
    }
}
