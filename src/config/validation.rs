use crate::config::types::{
    Config, CrawlerConfig, OutputConfig, SelectorConfig, SourceConfig, UserAgentConfig,
};
use crate::crawler::PacingTier;
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    validate_sources(&config.sources)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.window_size < 1 || config.window_size > 64 {
        return Err(ConfigError::Validation(format!(
            "window_size must be between 1 and 64, got {}",
            config.window_size
        )));
    }

    if config.default_target_count < 1 {
        return Err(ConfigError::Validation(
            "default_target_count must be >= 1".to_string(),
        ));
    }

    if PacingTier::from_name(&config.tier).is_none() {
        return Err(ConfigError::Validation(format!(
            "tier must be one of conservative, balanced, aggressive; got '{}'",
            config.tier
        )));
    }

    if config.source_error_threshold < 1 {
        return Err(ConfigError::Validation(
            "source_error_threshold must be >= 1".to_string(),
        ));
    }

    if config.render_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "render_timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Basic email shape check: local@domain with a dot in the domain part
fn validate_email(email: &str) -> Result<(), ConfigError> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.'),
        None => false,
    };

    if !valid {
        return Err(ConfigError::Validation(format!(
            "contact_email does not look like an email address: '{}'",
            email
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.summary_path.is_empty() {
        return Err(ConfigError::Validation(
            "summary_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates source entries: at least one source, unique names, resolvable
/// URL templates, and parseable CSS selectors
fn validate_sources(sources: &[SourceConfig]) -> Result<(), ConfigError> {
    if sources.is_empty() {
        return Err(ConfigError::Validation(
            "at least one [[source]] entry is required".to_string(),
        ));
    }

    let mut names = HashSet::new();
    for source in sources {
        if source.name.is_empty() {
            return Err(ConfigError::Validation(
                "source name cannot be empty".to_string(),
            ));
        }

        if !names.insert(source.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate source name '{}'",
                source.name
            )));
        }

        if source.locator.is_empty() {
            return Err(ConfigError::Validation(format!(
                "source '{}' has an empty locator",
                source.name
            )));
        }

        validate_list_url(source)?;
        validate_selectors(&source.name, &source.selectors)?;
    }

    Ok(())
}

/// Checks the discovery URL template substitutes into a parseable URL
fn validate_list_url(source: &SourceConfig) -> Result<(), ConfigError> {
    if !source.list_url.contains("{page}") {
        return Err(ConfigError::InvalidTemplate(format!(
            "source '{}' list-url must contain a {{page}} placeholder",
            source.name
        )));
    }

    let resolved = source
        .list_url
        .replace("{role}", "probe")
        .replace("{locator}", &source.locator)
        .replace("{page}", "1");

    Url::parse(&resolved).map_err(|e| {
        ConfigError::InvalidTemplate(format!(
            "source '{}' list-url does not resolve to a valid URL: {}",
            source.name, e
        ))
    })?;

    Ok(())
}

/// Checks every configured CSS selector parses
fn validate_selectors(source_name: &str, selectors: &SelectorConfig) -> Result<(), ConfigError> {
    let mut named = vec![
        ("card", selectors.card.as_str()),
        ("link", selectors.link.as_str()),
        ("title", selectors.title.as_str()),
        ("detail-title", selectors.detail_title.as_str()),
        ("company", selectors.company.as_str()),
        ("description", selectors.description.as_str()),
    ];
    if let Some(posted_at) = &selectors.posted_at {
        named.push(("posted-at", posted_at.as_str()));
    }

    for (field, selector) in named {
        if scraper::Selector::parse(selector).is_err() {
            return Err(ConfigError::Validation(format!(
                "source '{}' selector '{}' is not a valid CSS selector: '{}'",
                source_name, field, selector
            )));
        }
    }

    if selectors.id_attr.is_empty() {
        return Err(ConfigError::Validation(format!(
            "source '{}' id-attr cannot be empty",
            source_name
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_selectors() -> SelectorConfig {
        SelectorConfig {
            card: "div.card".to_string(),
            id_attr: "data-id".to_string(),
            link: "a".to_string(),
            title: "h2".to_string(),
            detail_title: "h1".to_string(),
            company: ".company".to_string(),
            description: ".description".to_string(),
            posted_at: None,
        }
    }

    fn test_source(name: &str) -> SourceConfig {
        SourceConfig {
            name: name.to_string(),
            locator: "us".to_string(),
            list_url: "https://jobs.example.com/{locator}/{page}?q={role}".to_string(),
            selectors: test_selectors(),
        }
    }

    #[test]
    fn test_validate_email_accepts_plain_address() {
        assert!(validate_email("admin@example.com").is_ok());
    }

    #[test]
    fn test_validate_email_rejects_garbage() {
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("user@nodot").is_err());
    }

    #[test]
    fn test_validate_sources_requires_one() {
        let result = validate_sources(&[]);
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }

    #[test]
    fn test_validate_sources_rejects_duplicate_names() {
        let sources = vec![test_source("a"), test_source("a")];
        let result = validate_sources(&sources);
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }

    #[test]
    fn test_validate_list_url_requires_page_placeholder() {
        let mut source = test_source("a");
        source.list_url = "https://jobs.example.com/{locator}?q={role}".to_string();
        let result = validate_list_url(&source);
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InvalidTemplate(_)
        ));
    }

    #[test]
    fn test_validate_list_url_rejects_unparseable_template() {
        let mut source = test_source("a");
        source.list_url = "not a url {page}".to_string();
        assert!(validate_list_url(&source).is_err());
    }

    #[test]
    fn test_validate_selectors_rejects_bad_css() {
        let mut selectors = test_selectors();
        selectors.card = ":::".to_string();
        let result = validate_selectors("a", &selectors);
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }

    #[test]
    fn test_valid_sources_pass() {
        let sources = vec![test_source("a"), test_source("b")];
        assert!(validate_sources(&sources).is_ok());
    }
}
