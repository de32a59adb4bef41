use crate::storage::JobDetail;
use std::collections::HashSet;
use std::sync::Mutex;

/// Shared coordination state for one crawl request
///
/// This structure owns the deduplication set, the ordered result list, the
/// discovery budget, and the stop signal. All of them live behind a single
/// mutex, and every exposed operation is one atomic critical section, so
/// callers can never observe a check-then-act window. The underlying set is
/// never handed out.
pub struct CrawlState {
    target_count: usize,
    inner: Mutex<StateInner>,
}

struct StateInner {
    /// (source, candidate_id) pairs admitted during discovery
    seen: HashSet<(String, String)>,

    /// Completed details, in completion order
    results: Vec<JobDetail>,

    /// Set exactly once, never unset for the lifetime of the request
    stopped: bool,

    /// Number of candidates admitted through `try_admit`
    admitted: usize,
}

impl CrawlState {
    /// Creates coordination state for a request targeting `target_count`
    /// detailed postings
    pub fn new(target_count: usize) -> Self {
        Self {
            target_count,
            inner: Mutex::new(StateInner {
                seen: HashSet::new(),
                results: Vec::new(),
                stopped: false,
                admitted: 0,
            }),
        }
    }

    /// Atomically tests and inserts a candidate into the deduplication set
    ///
    /// Returns `true` if the candidate was admitted: it was not seen before,
    /// the discovery budget has room, and the stop signal is not set. A
    /// `false` return means the caller must not enqueue the candidate.
    pub fn try_admit(&self, source: &str, candidate_id: &str) -> bool {
        let mut inner = self.inner.lock().unwrap();

        if inner.stopped || inner.admitted >= self.target_count {
            return false;
        }

        let inserted = inner
            .seen
            .insert((source.to_string(), candidate_id.to_string()));
        if inserted {
            inner.admitted += 1;
        }
        inserted
    }

    /// Appends a completed detail and sets the stop signal the instant the
    /// appended count reaches the target
    ///
    /// The append is unconditional: a worker that passed its own stop check
    /// before fetching may still land its result here, which is the bounded
    /// overshoot the caller truncates away. Returns `true` if this call is
    /// the one that set the stop signal.
    pub fn push_result(&self, detail: JobDetail) -> bool {
        let mut inner = self.inner.lock().unwrap();
        inner.results.push(detail);

        if !inner.stopped && inner.results.len() >= self.target_count {
            inner.stopped = true;
            return true;
        }
        false
    }

    /// Whether the stop signal has been set
    pub fn is_stopped(&self) -> bool {
        self.inner.lock().unwrap().stopped
    }

    /// Whether discovery has admitted its full budget of candidates
    pub fn discovery_done(&self) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.stopped || inner.admitted >= self.target_count
    }

    /// Number of candidates admitted so far
    pub fn admitted_count(&self) -> usize {
        self.inner.lock().unwrap().admitted
    }

    /// Number of details collected so far (including overshoot)
    pub fn detailed_count(&self) -> usize {
        self.inner.lock().unwrap().results.len()
    }

    /// The configured target count
    pub fn target_count(&self) -> usize {
        self.target_count
    }

    /// Clones the raw result list in completion order, without truncation
    pub fn results_snapshot(&self) -> Vec<JobDetail> {
        self.inner.lock().unwrap().results.clone()
    }

    /// Consumes the state and returns the raw result list in completion
    /// order, without truncation
    pub fn into_results(self) -> Vec<JobDetail> {
        self.inner.into_inner().unwrap().results
    }
}
