//! Selector-driven page parsing
//!
//! This module turns rendered HTML into structured records using the CSS
//! selectors configured per source. Discovery pages yield candidate ids
//! and detail links; detail pages yield the posting fields the extraction
//! engine and repository consume.

use crate::config::SelectorConfig;
use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// One candidate found on a discovery page
#[derive(Debug, Clone)]
pub struct DiscoveredCandidate {
    /// Opaque id from the configured card attribute
    pub candidate_id: String,

    /// Absolute detail-page URL
    pub url: String,

    /// Coarse title from the card
    pub title: String,
}

/// Fields parsed from a detail page
#[derive(Debug, Clone)]
pub struct ParsedDetail {
    pub title: String,
    pub company: String,
    pub description: String,
    pub posted_at: Option<DateTime<Utc>>,
}

/// Parses a discovery page into candidates
///
/// Cards missing their id attribute or detail link are skipped; a page
/// with no matching cards parses to an empty list, which the collector
/// treats as an empty discovery round.
pub fn parse_discovery_page(
    html: &str,
    selectors: &SelectorConfig,
    base_url: &Url,
) -> Result<Vec<DiscoveredCandidate>, String> {
    let document = Html::parse_document(html);

    let card_selector = parse_selector(&selectors.card)?;
    let link_selector = parse_selector(&selectors.link)?;
    let title_selector = parse_selector(&selectors.title)?;

    let mut candidates = Vec::new();

    for card in document.select(&card_selector) {
        let candidate_id = match card.value().attr(&selectors.id_attr) {
            Some(id) if !id.trim().is_empty() => id.trim().to_string(),
            _ => {
                tracing::debug!("Skipping card without '{}' attribute", selectors.id_attr);
                continue;
            }
        };

        let href = card
            .select(&link_selector)
            .next()
            .and_then(|a| a.value().attr("href"));
        let url = match href.and_then(|h| base_url.join(h).ok()) {
            Some(u) => u.to_string(),
            None => {
                tracing::debug!("Skipping card {} without a detail link", candidate_id);
                continue;
            }
        };

        let title = card
            .select(&title_selector)
            .next()
            .map(element_text)
            .unwrap_or_default();

        candidates.push(DiscoveredCandidate {
            candidate_id,
            url,
            title,
        });
    }

    Ok(candidates)
}

/// Parses a detail page into posting fields
///
/// Title, company and description are required; a page missing any of
/// them is a validation failure and the candidate is dropped by the
/// caller.
pub fn parse_detail_page(html: &str, selectors: &SelectorConfig) -> Result<ParsedDetail, String> {
    let document = Html::parse_document(html);

    let title = select_required(&document, &selectors.detail_title, "title")?;
    let company = select_required(&document, &selectors.company, "company")?;
    let description = select_required(&document, &selectors.description, "description")?;

    let posted_at = match &selectors.posted_at {
        Some(selector) => extract_posted_at(&document, selector)?,
        None => None,
    };

    Ok(ParsedDetail {
        title,
        company,
        description,
        posted_at,
    })
}

fn parse_selector(selector: &str) -> Result<Selector, String> {
    Selector::parse(selector).map_err(|e| format!("Invalid selector '{}': {:?}", selector, e))
}

fn select_required(document: &Html, selector: &str, field: &str) -> Result<String, String> {
    let parsed = parse_selector(selector)?;
    let text = document
        .select(&parsed)
        .next()
        .map(element_text)
        .unwrap_or_default();

    if text.is_empty() {
        return Err(format!("Missing required field '{}'", field));
    }
    Ok(text)
}

/// Collects an element's text, separating fragments so adjacent tags do
/// not fuse words together
fn element_text(element: ElementRef<'_>) -> String {
    let fragments: Vec<&str> = element
        .text()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect();
    fragments.join(" ")
}

fn extract_posted_at(document: &Html, selector: &str) -> Result<Option<DateTime<Utc>>, String> {
    let parsed = parse_selector(selector)?;

    let Some(element) = document.select(&parsed).next() else {
        return Ok(None);
    };

    // Prefer a machine-readable datetime attribute over the element text
    let raw = element
        .value()
        .attr("datetime")
        .map(|v| v.to_string())
        .unwrap_or_else(|| element_text(element));

    Ok(DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|t| t.with_timezone(&Utc)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SelectorConfig;

    fn test_selectors() -> SelectorConfig {
        SelectorConfig {
            card: "div.job-card".to_string(),
            id_attr: "data-job-id".to_string(),
            link: "a.job-link".to_string(),
            title: "h2.job-title".to_string(),
            detail_title: "h1.title".to_string(),
            company: "span.company".to_string(),
            description: "div.description".to_string(),
            posted_at: Some("time.posted".to_string()),
        }
    }

    fn base() -> Url {
        Url::parse("https://jobs.example.com/search").unwrap()
    }

    const DISCOVERY_HTML: &str = r#"
        <html><body>
            <div class="job-card" data-job-id="a1">
                <h2 class="job-title">Data Analyst</h2>
                <a class="job-link" href="/view/a1">details</a>
            </div>
            <div class="job-card" data-job-id="a2">
                <h2 class="job-title">Senior Data Analyst</h2>
                <a class="job-link" href="https://jobs.example.com/view/a2">details</a>
            </div>
            <div class="job-card">
                <h2 class="job-title">No id, skipped</h2>
                <a class="job-link" href="/view/broken">details</a>
            </div>
        </body></html>
    "#;

    #[test]
    fn test_parse_discovery_page() {
        let candidates =
            parse_discovery_page(DISCOVERY_HTML, &test_selectors(), &base()).unwrap();

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].candidate_id, "a1");
        assert_eq!(candidates[0].url, "https://jobs.example.com/view/a1");
        assert_eq!(candidates[0].title, "Data Analyst");
        assert_eq!(candidates[1].candidate_id, "a2");
    }

    #[test]
    fn test_parse_discovery_preserves_page_order() {
        let candidates =
            parse_discovery_page(DISCOVERY_HTML, &test_selectors(), &base()).unwrap();
        let ids: Vec<_> = candidates.iter().map(|c| c.candidate_id.as_str()).collect();
        assert_eq!(ids, vec!["a1", "a2"]);
    }

    #[test]
    fn test_parse_discovery_empty_page() {
        let candidates =
            parse_discovery_page("<html><body></body></html>", &test_selectors(), &base())
                .unwrap();
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_parse_detail_page() {
        let html = r#"
            <html><body>
                <h1 class="title">Data Analyst</h1>
                <span class="company">Acme Corp</span>
                <div class="description"><p>Python, SQL</p><p>Tableau</p></div>
                <time class="posted" datetime="2026-07-01T09:00:00Z">July 1</time>
            </body></html>
        "#;

        let detail = parse_detail_page(html, &test_selectors()).unwrap();
        assert_eq!(detail.title, "Data Analyst");
        assert_eq!(detail.company, "Acme Corp");
        // Fragments are joined with a space, not fused
        assert_eq!(detail.description, "Python, SQL Tableau");
        assert!(detail.posted_at.is_some());
    }

    #[test]
    fn test_parse_detail_missing_description_fails() {
        let html = r#"
            <html><body>
                <h1 class="title">Data Analyst</h1>
                <span class="company">Acme Corp</span>
            </body></html>
        "#;

        let result = parse_detail_page(html, &test_selectors());
        assert!(result.unwrap_err().contains("description"));
    }

    #[test]
    fn test_parse_detail_unparseable_timestamp_is_none() {
        let html = r#"
            <html><body>
                <h1 class="title">T</h1>
                <span class="company">C</span>
                <div class="description">D</div>
                <time class="posted">two weeks ago</time>
            </body></html>
        "#;

        let detail = parse_detail_page(html, &test_selectors()).unwrap();
        assert!(detail.posted_at.is_none());
    }
}
