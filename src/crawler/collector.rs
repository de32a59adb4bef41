//! Round-robin multi-source discovery
//!
//! One producer task per source renders discovery pages and feeds a
//! bounded channel; a single merger drains one candidate per source per
//! cycle in the fixed request order, so no source dominates admissions.
//! Admitted candidates are upserted to the repository the moment they are
//! seen, which is what keeps re-runs cheap: a crashed run loses at most
//! the in-flight discovery page.

use crate::config::SourceConfig;
use crate::crawler::limiter::{Backoff, RateLimiter};
use crate::crawler::parser::{parse_discovery_page, DiscoveredCandidate};
use crate::crawler::{CrawlRequest, ProgressFn};
use crate::render::Renderer;
use crate::state::CrawlState;
use crate::storage::Repository;
use crate::SiftError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use url::Url;

/// Buffered candidates per source; keeps a fast source from racing far
/// ahead of the round-robin cursor
const DISCOVERY_CHANNEL_CAPACITY: usize = 32;

/// What phase 1 produced
#[derive(Debug)]
pub struct DiscoveryOutcome {
    /// Candidates admitted to the deduplication set and repository
    pub admitted: usize,

    /// Sources that answered at least one discovery render
    pub contacted_sources: usize,
}

/// Fans discovery out across sources and merges candidates fairly
pub struct Collector {
    request: Arc<CrawlRequest>,
    renderer: Arc<dyn Renderer>,
    limiter: Arc<RateLimiter>,
    state: Arc<CrawlState>,
    repository: Arc<Mutex<dyn Repository + Send>>,
}

impl Collector {
    pub fn new(
        request: Arc<CrawlRequest>,
        renderer: Arc<dyn Renderer>,
        limiter: Arc<RateLimiter>,
        state: Arc<CrawlState>,
        repository: Arc<Mutex<dyn Repository + Send>>,
    ) -> Self {
        Self {
            request,
            renderer,
            limiter,
            state,
            repository,
        }
    }

    /// Runs discovery until the budget is met or every source is exhausted
    ///
    /// # Arguments
    ///
    /// * `run_id` - The repository run discoveries are attributed to
    /// * `progress` - Optional `(discovered, detailed)` callback
    pub async fn run_discovery(
        &self,
        run_id: i64,
        progress: Option<&ProgressFn>,
    ) -> Result<DiscoveryOutcome, SiftError> {
        let contacted = Arc::new(AtomicUsize::new(0));
        let mut producers = JoinSet::new();
        let mut receivers = Vec::new();

        for source in &self.request.sources {
            let (tx, rx) = mpsc::channel(DISCOVERY_CHANNEL_CAPACITY);
            receivers.push((source.name.clone(), rx));

            producers.spawn(produce_candidates(
                source.clone(),
                self.request.role.clone(),
                Arc::clone(&self.renderer),
                Arc::clone(&self.limiter),
                Arc::clone(&self.state),
                tx,
                self.request.source_error_threshold,
                self.request.render_timeout,
                Arc::clone(&contacted),
            ));
        }

        // Round-robin merge: one candidate per source per cycle, in the
        // fixed order given by the request
        let mut admitted = 0usize;
        let mut index = 0usize;

        while !receivers.is_empty() && !self.state.discovery_done() {
            if index >= receivers.len() {
                index = 0;
            }

            match receivers[index].1.recv().await {
                Some(candidate) => {
                    let source_name = receivers[index].0.clone();
                    if self.state.try_admit(&source_name, &candidate.candidate_id) {
                        self.upsert_candidate(&source_name, &candidate, run_id)?;
                        admitted += 1;
                        tracing::debug!(
                            "Admitted {}/{} from '{}'",
                            candidate.candidate_id,
                            admitted,
                            source_name
                        );
                        if let Some(callback) = progress {
                            callback(admitted, self.state.detailed_count());
                        }
                    }
                    index += 1;
                }
                None => {
                    tracing::info!("Source '{}' finished discovery", receivers[index].0);
                    receivers.remove(index);
                }
            }
        }

        // Closing the channels unblocks any producer waiting on a full
        // buffer; aborting skips out of long backoff sleeps
        drop(receivers);
        producers.abort_all();
        while producers.join_next().await.is_some() {}

        let outcome = DiscoveryOutcome {
            admitted,
            contacted_sources: contacted.load(Ordering::Relaxed),
        };
        tracing::info!(
            "Discovery complete: {} admitted across {} contacted sources",
            outcome.admitted,
            outcome.contacted_sources
        );
        Ok(outcome)
    }

    fn upsert_candidate(
        &self,
        source_name: &str,
        candidate: &DiscoveredCandidate,
        run_id: i64,
    ) -> Result<(), SiftError> {
        let mut repository = self.repository.lock().unwrap();
        repository.upsert_discovered(
            source_name,
            &candidate.candidate_id,
            &candidate.url,
            &candidate.title,
            &self.request.role,
            run_id,
        )?;
        Ok(())
    }
}

/// Builds the discovery URL for a source page
pub fn build_discovery_url(
    source: &SourceConfig,
    role: &str,
    page: u32,
) -> Result<Url, SiftError> {
    let encoded_role: String = url::form_urlencoded::byte_serialize(role.as_bytes()).collect();

    let resolved = source
        .list_url
        .replace("{role}", &encoded_role)
        .replace("{locator}", &source.locator)
        .replace("{page}", &page.to_string());

    Ok(Url::parse(&resolved)?)
}

/// Produces candidates for one source until it is exhausted or discovery
/// no longer needs input
#[allow(clippy::too_many_arguments)]
async fn produce_candidates(
    source: SourceConfig,
    role: String,
    renderer: Arc<dyn Renderer>,
    limiter: Arc<RateLimiter>,
    state: Arc<CrawlState>,
    tx: mpsc::Sender<DiscoveredCandidate>,
    error_threshold: u32,
    render_timeout: Duration,
    contacted: Arc<AtomicUsize>,
) {
    let mut page: u32 = 1;
    let mut error_streak: u32 = 0;
    let mut empty_rounds: u32 = 0;
    let mut first_contact = false;

    loop {
        if state.discovery_done() {
            break;
        }

        let url = match build_discovery_url(&source, &role, page) {
            Ok(url) => url,
            Err(e) => {
                tracing::error!("Cannot build discovery URL for '{}': {}", source.name, e);
                break;
            }
        };

        let _permit = limiter.before_request(&source.name).await;
        match renderer.render(url.as_str(), render_timeout).await {
            Ok(html) => {
                limiter.on_success(&source.name);
                error_streak = 0;
                if !first_contact {
                    first_contact = true;
                    contacted.fetch_add(1, Ordering::Relaxed);
                }

                let candidates = match parse_discovery_page(&html, &source.selectors, &url) {
                    Ok(candidates) => candidates,
                    Err(e) => {
                        tracing::warn!("Discovery parse failed for '{}': {}", source.name, e);
                        Vec::new()
                    }
                };

                if candidates.is_empty() {
                    empty_rounds += 1;
                    // One re-render of the next page before reporting
                    // exhaustion
                    if empty_rounds >= 2 {
                        tracing::info!(
                            "Source '{}' exhausted after {} empty rounds at page {}",
                            source.name,
                            empty_rounds,
                            page
                        );
                        break;
                    }
                } else {
                    empty_rounds = 0;
                    for candidate in candidates {
                        if tx.send(candidate).await.is_err() {
                            // Merger is gone; discovery is over
                            return;
                        }
                    }
                }
                page += 1;
            }
            Err(e) => {
                error_streak += 1;
                tracing::warn!(
                    "Discovery render failed for '{}' page {} ({} consecutive): {}",
                    source.name,
                    page,
                    error_streak,
                    e
                );

                if error_streak >= error_threshold {
                    tracing::warn!(
                        "Source '{}' exhausted after {} consecutive render errors",
                        source.name,
                        error_streak
                    );
                    break;
                }

                match limiter.on_failure(&source.name, e.is_rate_limited()) {
                    Backoff::RetryAfter(delay) => tokio::time::sleep(delay).await,
                    Backoff::GiveUp => {
                        tracing::warn!("Retry budget spent for source '{}'", source.name);
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SelectorConfig;
    use crate::crawler::PacingTier;
    use crate::render::RenderError;
    use crate::storage::SqliteRepository;
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct FakeRenderer {
        pages: HashMap<String, String>,
    }

    #[async_trait]
    impl Renderer for FakeRenderer {
        async fn render(&self, url: &str, _timeout: Duration) -> Result<String, RenderError> {
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| RenderError::Network {
                    url: url.to_string(),
                    message: "no such page".to_string(),
                })
        }
    }

    fn selectors() -> SelectorConfig {
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

    fn source(name: &str) -> SourceConfig {
        SourceConfig {
            name: name.to_string(),
            locator: name.to_string(),
            list_url: format!("https://{}.test/jobs/{{locator}}/{{page}}?q={{role}}", name),
            selectors: selectors(),
        }
    }

    fn discovery_html(ids: &[&str]) -> String {
        let cards: String = ids
            .iter()
            .map(|id| {
                format!(
                    r#"<div class="card" data-id="{id}"><h2>Role {id}</h2><a href="/view/{id}">go</a></div>"#
                )
            })
            .collect();
        format!("<html><body>{}</body></html>", cards)
    }

    fn request(sources: Vec<SourceConfig>, target: usize) -> Arc<CrawlRequest> {
        Arc::new(CrawlRequest {
            role: "Data Analyst".to_string(),
            target_count: target,
            window_size: 2,
            tier: PacingTier::Aggressive,
            source_error_threshold: 3,
            render_timeout: Duration::from_secs(5),
            sources,
        })
    }

    fn collector_for(
        req: Arc<CrawlRequest>,
        pages: HashMap<String, String>,
    ) -> (Collector, Arc<CrawlState>, Arc<Mutex<dyn Repository + Send>>, i64) {
        let mut repo = SqliteRepository::new_in_memory().unwrap();
        let run_id = repo.create_run(&req.role, "hash").unwrap();
        let repository: Arc<Mutex<dyn Repository + Send>> = Arc::new(Mutex::new(repo));

        let state = Arc::new(CrawlState::new(req.target_count));
        let limiter = Arc::new(RateLimiter::new(
            req.tier,
            req.sources.iter().map(|s| s.name.clone()),
        ));

        let collector = Collector::new(
            req,
            Arc::new(FakeRenderer { pages }),
            limiter,
            Arc::clone(&state),
            Arc::clone(&repository),
        );
        (collector, state, repository, run_id)
    }

    #[test]
    fn test_build_discovery_url_substitutes_placeholders() {
        let url = build_discovery_url(&source("a"), "Data Analyst", 3).unwrap();
        assert_eq!(url.as_str(), "https://a.test/jobs/a/3?q=Data+Analyst");
    }

    #[tokio::test]
    async fn test_round_robin_interleaves_sources() {
        let mut pages = HashMap::new();
        pages.insert(
            "https://a.test/jobs/a/1?q=Data+Analyst".to_string(),
            discovery_html(&["a1", "a2", "a3"]),
        );
        pages.insert(
            "https://b.test/jobs/b/1?q=Data+Analyst".to_string(),
            discovery_html(&["b1", "b2", "b3"]),
        );

        let req = request(vec![source("a"), source("b")], 4);
        let (collector, state, repository, run_id) = collector_for(req, pages);

        let outcome = collector.run_discovery(run_id, None).await.unwrap();

        assert_eq!(outcome.admitted, 4);
        assert_eq!(outcome.contacted_sources, 2);
        assert!(state.discovery_done());

        // Fairness: two candidates from each source, not four from one
        let repo = repository.lock().unwrap();
        let a = repo.get_undetailed("a", "Data Analyst", 10).unwrap();
        let b = repo.get_undetailed("b", "Data Analyst", 10).unwrap();
        assert_eq!(a.len(), 2);
        assert_eq!(b.len(), 2);
        assert_eq!(a[0].0, "a1");
        assert_eq!(b[0].0, "b1");
    }

    #[tokio::test]
    async fn test_failing_source_does_not_stop_the_crawl() {
        let mut pages = HashMap::new();
        pages.insert(
            "https://a.test/jobs/a/1?q=Data+Analyst".to_string(),
            discovery_html(&["a1", "a2"]),
        );
        // Source b has no pages at all: every render errors

        let req = request(vec![source("a"), source("b")], 2);
        let (collector, _state, repository, run_id) = collector_for(req, pages);

        let outcome = collector.run_discovery(run_id, None).await.unwrap();

        assert_eq!(outcome.admitted, 2);
        assert_eq!(outcome.contacted_sources, 1);

        let repo = repository.lock().unwrap();
        assert_eq!(repo.get_undetailed("a", "Data Analyst", 10).unwrap().len(), 2);
        assert!(repo.get_undetailed("b", "Data Analyst", 10).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_exhausted_sources_end_discovery_short_of_budget() {
        let mut pages = HashMap::new();
        pages.insert(
            "https://a.test/jobs/a/1?q=Data+Analyst".to_string(),
            discovery_html(&["a1"]),
        );
        // Pages 2 and 3 exist but are empty: source reports exhaustion
        pages.insert(
            "https://a.test/jobs/a/2?q=Data+Analyst".to_string(),
            discovery_html(&[]),
        );
        pages.insert(
            "https://a.test/jobs/a/3?q=Data+Analyst".to_string(),
            discovery_html(&[]),
        );

        let req = request(vec![source("a")], 10);
        let (collector, state, _repository, run_id) = collector_for(req, pages);

        let outcome = collector.run_discovery(run_id, None).await.unwrap();

        assert_eq!(outcome.admitted, 1);
        assert!(!state.discovery_done());
    }

    #[tokio::test]
    async fn test_duplicate_ids_admitted_once() {
        let mut pages = HashMap::new();
        // The same id appears on both pages
        pages.insert(
            "https://a.test/jobs/a/1?q=Data+Analyst".to_string(),
            discovery_html(&["a1", "a2"]),
        );
        pages.insert(
            "https://a.test/jobs/a/2?q=Data+Analyst".to_string(),
            discovery_html(&["a1", "a3"]),
        );
        pages.insert(
            "https://a.test/jobs/a/3?q=Data+Analyst".to_string(),
            discovery_html(&[]),
        );
        pages.insert(
            "https://a.test/jobs/a/4?q=Data+Analyst".to_string(),
            discovery_html(&[]),
        );

        let req = request(vec![source("a")], 10);
        let (collector, _state, repository, run_id) = collector_for(req, pages);

        let outcome = collector.run_discovery(run_id, None).await.unwrap();

        assert_eq!(outcome.admitted, 3);
        let repo = repository.lock().unwrap();
        assert_eq!(repo.count_discovered().unwrap(), 3);
    }
}
