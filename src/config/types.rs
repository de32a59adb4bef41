use serde::Deserialize;

/// Main configuration structure for Skillsift
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub skills: SkillsConfig,
    #[serde(rename = "source", default)]
    pub sources: Vec<SourceConfig>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Number of concurrent detail-fetch workers (the rolling window)
    #[serde(rename = "window-size", default = "default_window_size")]
    pub window_size: usize,

    /// Target number of postings when the CLI does not override it
    #[serde(rename = "default-target-count", default = "default_target_count")]
    pub default_target_count: usize,

    /// Pacing tier: "conservative", "balanced", or "aggressive"
    #[serde(default = "default_tier")]
    pub tier: String,

    /// Consecutive render errors before a source is marked exhausted
    #[serde(rename = "source-error-threshold", default = "default_error_threshold")]
    pub source_error_threshold: u32,

    /// Per-render timeout in seconds
    #[serde(rename = "render-timeout-secs", default = "default_render_timeout")]
    pub render_timeout_secs: u64,
}

fn default_window_size() -> usize {
    8
}

fn default_target_count() -> usize {
    25
}

fn default_tier() -> String {
    "balanced".to_string()
}

fn default_error_threshold() -> u32 {
    3
}

fn default_render_timeout() -> u64 {
    30
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Path to the markdown demand-summary file
    #[serde(rename = "summary-path")]
    pub summary_path: String,
}

/// Skill reference configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SkillsConfig {
    /// Optional TOML file extending the built-in skill reference
    #[serde(rename = "reference-path", default)]
    pub reference_path: Option<String>,
}

/// One discovery partition of the crawl (e.g. a geography segment)
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Source name, unique within a config
    pub name: String,

    /// Opaque parameter substituted into the discovery URL template
    pub locator: String,

    /// Discovery URL template with `{role}`, `{locator}` and `{page}`
    /// placeholders
    #[serde(rename = "list-url")]
    pub list_url: String,

    /// CSS selectors for this source's markup
    pub selectors: SelectorConfig,
}

/// Per-source CSS selectors
///
/// Source-specific markup quirks live here as data, never as code paths.
#[derive(Debug, Clone, Deserialize)]
pub struct SelectorConfig {
    /// Selector matching one posting card on a discovery page
    pub card: String,

    /// Attribute on the card element carrying the candidate id
    #[serde(rename = "id-attr")]
    pub id_attr: String,

    /// Selector for the detail-page anchor inside a card
    pub link: String,

    /// Selector for the coarse title inside a card
    pub title: String,

    /// Selector for the role title on a detail page
    #[serde(rename = "detail-title")]
    pub detail_title: String,

    /// Selector for the company name on a detail page
    pub company: String,

    /// Selector for the description body on a detail page
    pub description: String,

    /// Optional selector for a `<time datetime="...">` posted-at element
    #[serde(rename = "posted-at", default)]
    pub posted_at: Option<String>,
}
