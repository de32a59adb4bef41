//! Rolling-window detail worker pool
//!
//! A fixed number of workers drain a shared queue of discovered
//! candidates. Completion of any item immediately admits the next one, so
//! the window rolls instead of proceeding in batches. Each worker checks
//! the stop signal before fetching, paces itself through the rate
//! limiter, and persists its result before recording it in the shared
//! state.

use crate::config::SourceConfig;
use crate::crawler::limiter::{Backoff, RateLimiter};
use crate::crawler::parser::parse_detail_page;
use crate::crawler::{CrawlRequest, ProgressFn};
use crate::render::Renderer;
use crate::skills::SkillExtractor;
use crate::state::CrawlState;
use crate::storage::{JobDetail, Repository};
use crate::SiftError;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task::JoinSet;

/// One unit of detail work
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub source_name: String,
    pub candidate_id: String,
    pub url: String,
}

/// Attempt accounting shared across workers
#[derive(Debug, Default)]
pub struct CrawlCounters {
    pub attempted: AtomicUsize,
    pub succeeded: AtomicUsize,
    pub failed: AtomicUsize,
}

/// Everything a worker loop needs, cheaply cloneable
#[derive(Clone)]
pub struct WorkerContext {
    pub request: Arc<CrawlRequest>,
    pub sources: Arc<HashMap<String, SourceConfig>>,
    pub renderer: Arc<dyn Renderer>,
    pub limiter: Arc<RateLimiter>,
    pub extractor: Arc<SkillExtractor>,
    pub state: Arc<CrawlState>,
    pub repository: Arc<Mutex<dyn Repository + Send>>,
    pub counters: Arc<CrawlCounters>,
    pub progress: Option<ProgressFn>,
}

impl WorkerContext {
    /// Builds the per-source lookup from a request
    pub fn source_map(request: &CrawlRequest) -> HashMap<String, SourceConfig> {
        request
            .sources
            .iter()
            .map(|s| (s.name.clone(), s.clone()))
            .collect()
    }
}

/// Drains the queue with `window_size` concurrent workers
///
/// Returns once the queue is empty or the stop signal ended the request.
/// Worker-level failures (retries spent, parse failures) are counted and
/// logged; only storage failures propagate, since nothing further can be
/// safely persisted once the repository is gone.
pub async fn drain(
    items: Vec<WorkItem>,
    window_size: usize,
    context: WorkerContext,
) -> Result<(), SiftError> {
    let queue = Arc::new(Mutex::new(VecDeque::from(items)));
    let mut workers = JoinSet::new();

    for worker_id in 0..window_size.max(1) {
        let queue = Arc::clone(&queue);
        let context = context.clone();
        workers.spawn(worker_loop(worker_id, queue, context));
    }

    let mut first_error = None;
    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::error!("Worker failed fatally: {}", e);
                if first_error.is_none() {
                    first_error = Some(e);
                    workers.abort_all();
                }
            }
            Err(e) if e.is_cancelled() => {}
            Err(e) => {
                tracing::error!("Worker panicked: {}", e);
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// One worker: pull, check stop, fetch, extract, persist, repeat
async fn worker_loop(
    worker_id: usize,
    queue: Arc<Mutex<VecDeque<WorkItem>>>,
    context: WorkerContext,
) -> Result<(), SiftError> {
    loop {
        if context.state.is_stopped() {
            tracing::debug!("Worker {} observed stop signal, exiting", worker_id);
            return Ok(());
        }

        let item = {
            let mut queue = queue.lock().unwrap();
            queue.pop_front()
        };
        let Some(item) = item else {
            tracing::debug!("Worker {} found the queue empty, exiting", worker_id);
            return Ok(());
        };

        context.counters.attempted.fetch_add(1, Ordering::Relaxed);

        if process_item(&context, &item).await? {
            context.counters.succeeded.fetch_add(1, Ordering::Relaxed);
            if let Some(callback) = &context.progress {
                callback(
                    context.state.admitted_count(),
                    context.state.detailed_count(),
                );
            }
        } else {
            context.counters.failed.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Processes one candidate end to end
///
/// `Ok(true)` means the detail was persisted and recorded; `Ok(false)`
/// means the item was dropped (retries spent or validation failed).
async fn process_item(context: &WorkerContext, item: &WorkItem) -> Result<bool, SiftError> {
    let Some(source) = context.sources.get(&item.source_name) else {
        tracing::warn!(
            "No source config for '{}', dropping {}",
            item.source_name,
            item.candidate_id
        );
        return Ok(false);
    };

    let max_attempts = context.limiter.tier().max_attempts();
    let mut attempts: u32 = 0;

    let html = loop {
        let _permit = context.limiter.before_request(&item.source_name).await;

        match context
            .renderer
            .render(&item.url, context.request.render_timeout)
            .await
        {
            Ok(html) => {
                context.limiter.on_success(&item.source_name);
                break html;
            }
            Err(e) => {
                attempts += 1;
                let rate_limited = e.is_rate_limited();
                tracing::warn!(
                    "Detail render failed for {} (attempt {}, rate_limited={}): {}",
                    item.candidate_id,
                    attempts,
                    rate_limited,
                    e
                );

                match context.limiter.on_failure(&item.source_name, rate_limited) {
                    Backoff::RetryAfter(delay) if attempts < max_attempts => {
                        tokio::time::sleep(delay).await;
                    }
                    _ => {
                        tracing::warn!(
                            "Dropping {} after {} attempts",
                            item.candidate_id,
                            attempts
                        );
                        return Ok(false);
                    }
                }
            }
        }
    };

    let parsed = match parse_detail_page(&html, &source.selectors) {
        Ok(parsed) => parsed,
        Err(e) => {
            // Not retried: the page rendered but does not look like a
            // posting; logged with its id for offline inspection
            tracing::warn!(
                "Detail parse failed for {}/{}: {}",
                item.source_name,
                item.candidate_id,
                e
            );
            return Ok(false);
        }
    };

    let skills = context.extractor.extract(&parsed.description);

    let detail = JobDetail {
        candidate_id: item.candidate_id.clone(),
        source: item.source_name.clone(),
        role: parsed.title,
        company: parsed.company,
        url: item.url.clone(),
        description: parsed.description,
        skills,
        posted_at: parsed.posted_at,
    };

    // Persist first, then flag: a crash between the two leaves the
    // candidate eligible for retry on the next run
    {
        let mut repository = context.repository.lock().unwrap();
        repository.upsert_detail(&detail)?;
        repository.mark_detailed(&item.source_name, &item.candidate_id)?;
    }

    if context.state.push_result(detail) {
        tracing::info!(
            "Target of {} details reached, stop signal set",
            context.state.target_count()
        );
    }

    Ok(true)
}
