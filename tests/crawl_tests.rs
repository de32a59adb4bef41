//! Integration tests for the crawl pipeline
//!
//! These tests use wiremock to stand up mock job boards and drive the
//! full crawl cycle end to end: discovery, detail fetching, skill
//! extraction, and repository persistence.

use skillsift::config::{
    Config, CrawlerConfig, OutputConfig, SelectorConfig, SkillsConfig, SourceConfig,
    UserAgentConfig,
};
use skillsift::crawler::{crawl, CrawlRequest, PacingTier};
use skillsift::storage::{Repository, SqliteRepository};
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn selectors() -> SelectorConfig {
    SelectorConfig {
        card: "div.job-card".to_string(),
        id_attr: "data-job-id".to_string(),
        link: "a.job-link".to_string(),
        title: "h2.job-title".to_string(),
        detail_title: "h1.title".to_string(),
        company: "span.company".to_string(),
        description: "div.description".to_string(),
        posted_at: None,
    }
}

fn source(server_uri: &str, name: &str) -> SourceConfig {
    SourceConfig {
        name: name.to_string(),
        locator: name.to_string(),
        list_url: format!("{}/{{locator}}/jobs/{{page}}?q={{role}}", server_uri),
        selectors: selectors(),
    }
}

fn test_config(db_path: &str, sources: Vec<SourceConfig>) -> Config {
    Config {
        crawler: CrawlerConfig {
            window_size: 2,
            default_target_count: 5,
            tier: "aggressive".to_string(),
            source_error_threshold: 3,
            render_timeout_secs: 5,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestSift".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        output: OutputConfig {
            database_path: db_path.to_string(),
            summary_path: "./test_summary.md".to_string(),
        },
        skills: SkillsConfig::default(),
        sources,
    }
}

fn request(config: &Config, target: usize, window: usize) -> CrawlRequest {
    let mut request =
        CrawlRequest::from_config(config, "Data Analyst", Some(target), None);
    request.window_size = window;
    request
}

fn discovery_html(source: &str, ids: &[&str]) -> String {
    let cards: String = ids
        .iter()
        .map(|id| {
            format!(
                r#"<div class="job-card" data-job-id="{id}">
                       <h2 class="job-title">Data Analyst</h2>
                       <a class="job-link" href="/{source}/view/{id}">details</a>
                   </div>"#
            )
        })
        .collect();
    format!("<html><body>{}</body></html>", cards)
}

fn detail_html(description: &str) -> String {
    format!(
        r#"<html><body>
               <h1 class="title">Data Analyst</h1>
               <span class="company">Acme Corp</span>
               <div class="description">{}</div>
           </body></html>"#,
        description
    )
}

/// Mounts a discovery page and detail pages for one source
async fn mount_source(server: &MockServer, name: &str, ids: &[&str], description: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/{}/jobs/1", name)))
        .respond_with(ResponseTemplate::new(200).set_body_string(discovery_html(name, ids)))
        .mount(server)
        .await;

    for id in ids {
        Mock::given(method("GET"))
            .and(path(format!("/{}/view/{}", name, id)))
            .respond_with(ResponseTemplate::new(200).set_body_string(detail_html(description)))
            .mount(server)
            .await;
    }
}

/// Catch-all for later discovery pages: renders fine but lists nothing,
/// so sources exhaust cleanly instead of erroring
async fn mount_empty_fallback(server: &MockServer) {
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("<html><body></body></html>"),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_two_source_crawl_reaches_target() {
    let server = MockServer::start().await;
    mount_source(&server, "a", &["a1", "a2", "a3"], "Python, SQL, Tableau.").await;
    mount_source(&server, "b", &["b1", "b2", "b3"], "Python, SQL, Tableau.").await;
    mount_empty_fallback(&server).await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("crawl.db");
    let config = test_config(
        db_path.to_str().unwrap(),
        vec![source(&server.uri(), "a"), source(&server.uri(), "b")],
    );

    let outcome = crawl(&config, request(&config, 5, 2), "test-hash", None)
        .await
        .unwrap();

    // Exactly the target, despite six candidates being available
    assert_eq!(outcome.details.len(), 5);
    assert_eq!(outcome.summary.succeeded, outcome.summary.raw_collected);
    assert!(outcome.summary.raw_collected >= 5);

    // Dedup invariant: no (source, id) pair appears twice
    let mut keys: Vec<_> = outcome
        .details
        .iter()
        .map(|d| (d.source.as_str(), d.candidate_id.as_str()))
        .collect();
    keys.sort();
    keys.dedup();
    assert_eq!(keys.len(), 5);

    // Canonical skills extracted from every description
    for detail in &outcome.details {
        for skill in ["Python", "SQL", "Tableau"] {
            assert!(
                detail.skills.contains(&skill.to_string()),
                "missing {} in {:?}",
                skill,
                detail.skills
            );
        }
    }

    // Round-robin fairness: neither source dominates the admitted set
    let from_a = outcome.details.iter().filter(|d| d.source == "a").count();
    let from_b = outcome.details.iter().filter(|d| d.source == "b").count();
    assert!(
        from_a >= 2 && from_b >= 2,
        "expected a fair split, got a={} b={}",
        from_a,
        from_b
    );

    // Everything returned was persisted and flagged detailed
    let repo = SqliteRepository::new(&db_path).unwrap();
    assert_eq!(repo.count_detailed().unwrap() as usize, outcome.summary.raw_collected);
    let skills = repo.skill_counts(None, 10).unwrap();
    assert!(skills.iter().any(|(name, count)| name == "Python" && *count >= 5));
}

#[tokio::test]
async fn test_incremental_resumption_fetches_each_detail_once() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/a/jobs/1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(discovery_html("a", &["a1", "a2", "a3"])),
        )
        .mount(&server)
        .await;

    // Each detail page may be fetched at most once across both runs
    for id in ["a1", "a2", "a3"] {
        Mock::given(method("GET"))
            .and(path(format!("/a/view/{}", id)))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(detail_html("Python and SQL.")),
            )
            .expect(1)
            .mount(&server)
            .await;
    }
    mount_empty_fallback(&server).await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("crawl.db");
    let config = test_config(
        db_path.to_str().unwrap(),
        vec![source(&server.uri(), "a")],
    );

    // First run: target 2, window 1, so exactly a1 and a2 are discovered
    // and detailed (discovery stops at its budget before reaching a3)
    let first = crawl(&config, request(&config, 2, 1), "hash-1", None)
        .await
        .unwrap();
    assert_eq!(first.details.len(), 2);

    {
        let repo = SqliteRepository::new(&db_path).unwrap();
        assert_eq!(repo.count_detailed().unwrap(), 2);
        assert!(repo.get_undetailed("a", "Data Analyst", 10).unwrap().is_empty());
    }

    // Second run: a3 is discovered as the delta and is the only candidate
    // fetched; a1 and a2 are already flagged detailed
    let second = crawl(&config, request(&config, 5, 1), "hash-2", None)
        .await
        .unwrap();
    assert_eq!(second.details.len(), 1);
    assert_eq!(second.details[0].candidate_id, "a3");

    let repo = SqliteRepository::new(&db_path).unwrap();
    assert_eq!(repo.count_detailed().unwrap(), 3);
    assert!(repo.get_undetailed("a", "Data Analyst", 10).unwrap().is_empty());

    // MockServer verifies the expect(1) counts on drop
}

#[tokio::test]
async fn test_rate_limited_detail_retried_and_counted() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/a/jobs/1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(discovery_html("a", &["a1"])),
        )
        .mount(&server)
        .await;

    // First hit is throttled, the retry succeeds
    Mock::given(method("GET"))
        .and(path("/a/view/a1"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/a/view/a1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(detail_html("Python.")))
        .mount(&server)
        .await;
    mount_empty_fallback(&server).await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("crawl.db");
    let config = test_config(
        db_path.to_str().unwrap(),
        vec![source(&server.uri(), "a")],
    );

    let outcome = crawl(&config, request(&config, 1, 1), "hash", None)
        .await
        .unwrap();

    assert_eq!(outcome.details.len(), 1);
    assert_eq!(outcome.summary.failed, 0);
    assert!(
        outcome.summary.rate_limit_hits >= 1,
        "rate-limit signal should be counted: {:?}",
        outcome.summary
    );
}

#[tokio::test]
async fn test_unreachable_sources_fail_the_crawl() {
    // No server at all: connections are refused on first contact
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("crawl.db");
    let config = test_config(
        db_path.to_str().unwrap(),
        vec![source("http://127.0.0.1:9", "a")],
    );

    let result = crawl(&config, request(&config, 2, 1), "hash", None).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_broken_detail_pages_drop_candidates_not_the_crawl() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/a/jobs/1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(discovery_html("a", &["a1", "a2"])),
        )
        .mount(&server)
        .await;

    // a1 renders but is not a posting; a2 is fine
    Mock::given(method("GET"))
        .and(path("/a/view/a1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("<html><body>gone</body></html>"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/a/view/a2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(detail_html("SQL.")))
        .mount(&server)
        .await;
    mount_empty_fallback(&server).await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("crawl.db");
    let config = test_config(
        db_path.to_str().unwrap(),
        vec![source(&server.uri(), "a")],
    );

    let outcome = crawl(&config, request(&config, 5, 1), "hash", None)
        .await
        .unwrap();

    assert_eq!(outcome.details.len(), 1);
    assert_eq!(outcome.details[0].candidate_id, "a2");
    assert_eq!(outcome.summary.failed, 1);
    assert_eq!(outcome.summary.succeeded, 1);

    // The broken candidate remains eligible for a later run
    let repo = SqliteRepository::new(Path::new(db_path.to_str().unwrap())).unwrap();
    let undetailed = repo.get_undetailed("a", "Data Analyst", 10).unwrap();
    assert_eq!(undetailed.len(), 1);
    assert_eq!(undetailed[0].0, "a1");
}
