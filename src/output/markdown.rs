//! Markdown demand-summary generation
//!
//! Renders the repository's aggregate view into a markdown report an
//! analyst can read or commit: run information, posting counts per
//! source, and the skill frequency table.

use crate::output::stats::{load_statistics, DemandStatistics};
use crate::storage::{parse_stored_timestamp, Repository};
use crate::SiftError;
use std::fmt::Write as _;
use std::path::Path;

/// Generates the markdown demand summary and writes it to `path`
///
/// # Arguments
///
/// * `repository` - The repository to summarize
/// * `role` - Optional role keyword to filter skill counts by
/// * `path` - Output file path
pub fn generate_demand_summary(
    repository: &dyn Repository,
    role: Option<&str>,
    path: &Path,
) -> Result<(), SiftError> {
    let stats = load_statistics(repository, role)?;
    let latest_run = repository.get_latest_run()?;

    let mut report = String::new();

    report.push_str("# Skill Demand Summary\n\n");

    if let Some(role) = role {
        let _ = writeln!(report, "Role filter: **{}**\n", role);
    }

    if let Some(run) = latest_run {
        let _ = writeln!(report, "## Latest Run\n");
        let _ = writeln!(report, "- Run ID: {}", run.id);
        let _ = writeln!(report, "- Role: {}", run.role);
        let _ = writeln!(report, "- Status: {}", run.status.to_db_string());
        let _ = writeln!(report, "- Started: {}", run.started_at);

        if let (Some(started), Some(finished)) = (
            parse_stored_timestamp(&run.started_at),
            run.finished_at.as_deref().and_then(parse_stored_timestamp),
        ) {
            let _ = writeln!(
                report,
                "- Duration: {}s",
                (finished - started).num_seconds()
            );
        }
        report.push('\n');
    }

    render_counts(&mut report, &stats);
    render_skill_table(&mut report, &stats);

    std::fs::write(path, report)?;
    Ok(())
}

fn render_counts(report: &mut String, stats: &DemandStatistics) {
    let _ = writeln!(report, "## Postings\n");
    let _ = writeln!(report, "- Discovered: {}", stats.total_discovered);
    let _ = writeln!(report, "- Detailed: {}", stats.total_detailed);
    report.push('\n');

    if !stats.by_source.is_empty() {
        let _ = writeln!(report, "| Source | Discovered | Detailed |");
        let _ = writeln!(report, "|--------|-----------:|---------:|");
        for (source, discovered, detailed) in &stats.by_source {
            let _ = writeln!(report, "| {} | {} | {} |", source, discovered, detailed);
        }
        report.push('\n');
    }
}

fn render_skill_table(report: &mut String, stats: &DemandStatistics) {
    let _ = writeln!(report, "## Skill Demand\n");

    if stats.top_skills.is_empty() {
        let _ = writeln!(report, "No skills extracted yet.");
        return;
    }

    let _ = writeln!(report, "| Skill | Postings |");
    let _ = writeln!(report, "|-------|---------:|");
    for (skill, count) in &stats.top_skills {
        let _ = writeln!(report, "| {} | {} |", skill, count);
    }
}
