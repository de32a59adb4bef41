//! Crawl coordinator - main crawl orchestration logic
//!
//! This module drives one crawl request to completion:
//! - Recording the run in the repository
//! - Phase 1: round-robin discovery across sources into the shared
//!   deduplication state
//! - Phase 2: draining the discovered-but-undetailed backlog through the
//!   rolling-window worker pool
//! - Assembling the final result list and summary

use crate::crawler::collector::Collector;
use crate::crawler::limiter::RateLimiter;
use crate::crawler::worker::{drain, CrawlCounters, WorkItem, WorkerContext};
use crate::crawler::{CrawlOutcome, CrawlRequest, CrawlSummary, ProgressFn};
use crate::render::Renderer;
use crate::skills::SkillExtractor;
use crate::state::CrawlState;
use crate::storage::Repository;
use crate::SiftError;
use std::collections::VecDeque;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

/// Drives one `CrawlRequest` from discovery to a final result
pub struct Coordinator {
    request: Arc<CrawlRequest>,
    repository: Arc<Mutex<dyn Repository + Send>>,
    renderer: Arc<dyn Renderer>,
    extractor: Arc<SkillExtractor>,
    config_hash: String,
    progress: Option<ProgressFn>,
}

impl Coordinator {
    /// Creates a coordinator for one request
    pub fn new(
        request: CrawlRequest,
        repository: Arc<Mutex<dyn Repository + Send>>,
        renderer: Arc<dyn Renderer>,
        extractor: Arc<SkillExtractor>,
        config_hash: String,
    ) -> Self {
        Self {
            request: Arc::new(request),
            repository,
            renderer,
            extractor,
            config_hash,
            progress: None,
        }
    }

    /// Attaches a `(discovered, detailed)` progress callback
    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Runs the crawl and returns the collected details with a summary
    ///
    /// Fails only on fatal errors: the repository becoming unusable, the
    /// run setup failing, or every source erroring on first contact.
    /// Everything else degrades to a partial result described by the
    /// summary.
    pub async fn run(&self) -> Result<CrawlOutcome, SiftError> {
        let run_id = {
            let mut repository = self.repository.lock().unwrap();
            repository.create_run(&self.request.role, &self.config_hash)?
        };

        tracing::info!(
            "Starting crawl run {} for role '{}' (target {}, window {}, tier {})",
            run_id,
            self.request.role,
            self.request.target_count,
            self.request.window_size,
            self.request.tier.name()
        );

        match self.execute(run_id).await {
            Ok(outcome) => {
                let mut repository = self.repository.lock().unwrap();
                repository.complete_run(run_id)?;
                Ok(outcome)
            }
            Err(e) => {
                // Best effort: the failure being recorded must not mask
                // the original error
                if let Ok(mut repository) = self.repository.lock() {
                    let _ = repository.fail_run(run_id, &e.to_string());
                }
                Err(e)
            }
        }
    }

    async fn execute(&self, run_id: i64) -> Result<CrawlOutcome, SiftError> {
        let state = Arc::new(CrawlState::new(self.request.target_count));
        let limiter = Arc::new(RateLimiter::new(
            self.request.tier,
            self.request.sources.iter().map(|s| s.name.clone()),
        ));

        // Phase 1: discovery
        let collector = Collector::new(
            Arc::clone(&self.request),
            Arc::clone(&self.renderer),
            Arc::clone(&limiter),
            Arc::clone(&state),
            Arc::clone(&self.repository),
        );
        let discovery = collector.run_discovery(run_id, self.progress.as_ref()).await?;

        if discovery.contacted_sources == 0 {
            return Err(SiftError::AllSourcesUnreachable {
                role: self.request.role.clone(),
            });
        }

        // Phase 2: detail the backlog, including leftovers of earlier runs
        let items = self.build_work_queue()?;
        tracing::info!(
            "Phase 2: {} undetailed candidates, window size {}",
            items.len(),
            self.request.window_size
        );

        let counters = Arc::new(CrawlCounters::default());
        let context = WorkerContext {
            sources: Arc::new(WorkerContext::source_map(&self.request)),
            request: Arc::clone(&self.request),
            renderer: Arc::clone(&self.renderer),
            limiter: Arc::clone(&limiter),
            extractor: Arc::clone(&self.extractor),
            state: Arc::clone(&state),
            repository: Arc::clone(&self.repository),
            counters: Arc::clone(&counters),
            progress: self.progress.clone(),
        };
        drain(items, self.request.window_size, context).await?;

        // Assemble the outcome; the raw count survives in the summary
        let raw_collected = state.detailed_count();
        let mut details = match Arc::try_unwrap(state) {
            Ok(state) => state.into_results(),
            Err(state) => state.results_snapshot(),
        };
        details.truncate(self.request.target_count);

        let summary = CrawlSummary {
            attempted: counters.attempted.load(Ordering::Relaxed),
            succeeded: counters.succeeded.load(Ordering::Relaxed),
            failed: counters.failed.load(Ordering::Relaxed),
            rate_limit_hits: limiter.rate_limit_hits(),
            discovered: discovery.admitted,
            raw_collected,
        };

        tracing::info!(
            "Crawl run {} finished: {} returned ({} raw), {}/{} attempts succeeded, {} rate-limit hits",
            run_id,
            details.len(),
            summary.raw_collected,
            summary.succeeded,
            summary.attempted,
            summary.rate_limit_hits
        );

        Ok(CrawlOutcome { details, summary })
    }

    /// Builds the phase-2 queue from the repository, interleaving sources
    /// round-robin so detail fetching inherits discovery's fairness
    fn build_work_queue(&self) -> Result<Vec<WorkItem>, SiftError> {
        let mut per_source: Vec<(String, VecDeque<(String, String)>)> = Vec::new();
        {
            let repository = self.repository.lock().unwrap();
            for source in &self.request.sources {
                let undetailed = repository.get_undetailed(
                    &source.name,
                    &self.request.role,
                    self.request.target_count,
                )?;
                per_source.push((source.name.clone(), undetailed.into()));
            }
        }

        let mut items = Vec::new();
        loop {
            let mut yielded_any = false;
            for (source_name, backlog) in per_source.iter_mut() {
                if let Some((candidate_id, url)) = backlog.pop_front() {
                    items.push(WorkItem {
                        source_name: source_name.clone(),
                        candidate_id,
                        url,
                    });
                    yielded_any = true;
                }
            }
            if !yielded_any {
                break;
            }
        }
        Ok(items)
    }
}
