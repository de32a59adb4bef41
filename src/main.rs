//! Skillsift main entry point
//!
//! Command-line interface for the job-posting crawler and skill-demand
//! extractor.

use clap::Parser;
use skillsift::config::{load_config_with_hash, Config};
use skillsift::crawler::{crawl, CrawlRequest, PacingTier, ProgressFn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Skillsift: a job-posting crawler and skill-demand extractor
///
/// Skillsift discovers job postings across configured sources, fetches
/// posting details, extracts canonical skills from descriptions, and
/// answers "how many current postings for role X mention skill Y".
#[derive(Parser, Debug)]
#[command(name = "skillsift")]
#[command(version = "1.0.0")]
#[command(about = "A job-posting crawler and skill-demand extractor", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Role keyword to crawl for (e.g. "Data Analyst")
    #[arg(short, long)]
    role: Option<String>,

    /// Target number of detailed postings (overrides the config default)
    #[arg(short, long)]
    target: Option<usize>,

    /// Pacing tier override: conservative, balanced, or aggressive
    #[arg(long)]
    tier: Option<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without crawling
    #[arg(long, conflicts_with_all = ["stats", "export_summary"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "export_summary"])]
    stats: bool,

    /// Generate the markdown demand summary from existing data and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    export_summary: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((config, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (config, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config, cli.role.as_deref())?;
    } else if cli.export_summary {
        handle_export_summary(&config, cli.role.as_deref())?;
    } else {
        handle_crawl(&config, &config_hash, &cli).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("skillsift=info,warn"),
            1 => EnvFilter::new("skillsift=debug,info"),
            2 => EnvFilter::new("skillsift=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows the crawl plan
fn handle_dry_run(config: &Config) {
    println!("=== Skillsift Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Window size: {}", config.crawler.window_size);
    println!(
        "  Default target count: {}",
        config.crawler.default_target_count
    );
    println!("  Tier: {}", config.crawler.tier);
    println!(
        "  Source error threshold: {}",
        config.crawler.source_error_threshold
    );
    println!("  Render timeout: {}s", config.crawler.render_timeout_secs);

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Summary: {}", config.output.summary_path);

    println!("\nSkill Reference:");
    match &config.skills.reference_path {
        Some(path) => println!("  Built-in table plus {}", path),
        None => println!("  Built-in table only"),
    }

    println!("\nSources ({}):", config.sources.len());
    for source in &config.sources {
        println!("  - {} (locator: {})", source.name, source.locator);
        println!("    {}", source.list_url);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config, role: Option<&str>) -> anyhow::Result<()> {
    use skillsift::output::{load_statistics, print_statistics};
    use skillsift::storage::open_repository;

    println!("Database: {}\n", config.output.database_path);

    let repository = open_repository(Path::new(&config.output.database_path))?;
    let stats = load_statistics(&repository, role)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --export-summary mode: generates the markdown report
fn handle_export_summary(config: &Config, role: Option<&str>) -> anyhow::Result<()> {
    use skillsift::output::generate_demand_summary;
    use skillsift::storage::open_repository;

    println!("=== Exporting Demand Summary ===\n");
    println!("Database: {}", config.output.database_path);
    println!("Output: {}", config.output.summary_path);

    let repository = open_repository(Path::new(&config.output.database_path))?;
    generate_demand_summary(&repository, role, Path::new(&config.output.summary_path))?;

    println!("✓ Summary exported to: {}", config.output.summary_path);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: &Config, config_hash: &str, cli: &Cli) -> anyhow::Result<()> {
    let Some(role) = cli.role.as_deref() else {
        anyhow::bail!("--role is required to start a crawl");
    };

    let tier = match cli.tier.as_deref() {
        Some(name) => Some(
            PacingTier::from_name(name)
                .ok_or_else(|| anyhow::anyhow!("unknown tier '{}'", name))?,
        ),
        None => None,
    };

    let request = CrawlRequest::from_config(config, role, cli.target, tier);

    tracing::info!(
        "Crawling role '{}' across {} sources (target {})",
        request.role,
        request.sources.len(),
        request.target_count
    );

    let progress: ProgressFn = Arc::new(|discovered, detailed| {
        tracing::debug!("Progress: {} discovered, {} detailed", discovered, detailed);
    });

    let outcome = crawl(config, request, config_hash, Some(progress)).await?;

    println!("\n=== Crawl Complete ===");
    println!("Details collected: {}", outcome.details.len());
    println!(
        "Attempted: {}, succeeded: {}, failed: {}, rate-limit hits: {}",
        outcome.summary.attempted,
        outcome.summary.succeeded,
        outcome.summary.failed,
        outcome.summary.rate_limit_hits
    );
    println!(
        "Discovered this run: {} (raw collected: {})",
        outcome.summary.discovered, outcome.summary.raw_collected
    );

    Ok(())
}
