//! Tiered per-source rate limiting
//!
//! Pacing works against a shared "last satisfied time" stamp per source:
//! each worker suspends until the minimum inter-request delay has elapsed,
//! then stamps the source and proceeds. Failures feed an exponential
//! backoff schedule; rate-limit signals are counted separately for the
//! crawl summary. Cross-source state is fully independent, so there is no
//! global lock.

use crate::state::PaceState;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Named pacing tiers
///
/// Tiers differ only in base delay, concurrency ceiling, and retry budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacingTier {
    Conservative,
    Balanced,
    Aggressive,
}

impl PacingTier {
    /// Parses a tier name from configuration
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "conservative" => Some(Self::Conservative),
            "balanced" => Some(Self::Balanced),
            "aggressive" => Some(Self::Aggressive),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Conservative => "conservative",
            Self::Balanced => "balanced",
            Self::Aggressive => "aggressive",
        }
    }

    /// Minimum delay between requests to one source
    pub fn min_delay(&self) -> Duration {
        match self {
            Self::Conservative => Duration::from_millis(2000),
            Self::Balanced => Duration::from_millis(1000),
            Self::Aggressive => Duration::from_millis(250),
        }
    }

    /// First-failure backoff delay
    pub fn base_delay(&self) -> Duration {
        match self {
            Self::Conservative => Duration::from_millis(2000),
            Self::Balanced => Duration::from_millis(1000),
            Self::Aggressive => Duration::from_millis(500),
        }
    }

    /// Ceiling for the exponential backoff schedule
    pub fn max_delay_cap(&self) -> Duration {
        match self {
            Self::Conservative => Duration::from_secs(120),
            Self::Balanced => Duration::from_secs(60),
            Self::Aggressive => Duration::from_secs(30),
        }
    }

    /// Retry budget per failure streak
    pub fn max_attempts(&self) -> u32 {
        match self {
            Self::Conservative => 3,
            Self::Balanced => 5,
            Self::Aggressive => 7,
        }
    }

    /// Concurrent in-flight requests allowed per source
    pub fn concurrency_ceiling(&self) -> usize {
        match self {
            Self::Conservative => 2,
            Self::Balanced => 4,
            Self::Aggressive => 8,
        }
    }
}

/// Decision returned by `on_failure`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Retry after the given delay
    RetryAfter(Duration),

    /// The retry budget is spent; drop the item
    GiveUp,
}

struct SourceLimit {
    pace: Mutex<PaceState>,
    slots: Arc<Semaphore>,
}

/// Permit held for the duration of one request
///
/// Dropping the permit frees the source's concurrency slot.
pub struct RequestPermit {
    _permit: Option<OwnedSemaphorePermit>,
}

/// Per-source request pacing and backoff
pub struct RateLimiter {
    tier: PacingTier,
    sources: HashMap<String, SourceLimit>,
    rate_limit_hits: AtomicU64,
}

impl RateLimiter {
    /// Creates a limiter for the given tier and source names
    pub fn new<I>(tier: PacingTier, source_names: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let sources = source_names
            .into_iter()
            .map(|name| {
                (
                    name.into(),
                    SourceLimit {
                        pace: Mutex::new(PaceState::new(tier.min_delay())),
                        slots: Arc::new(Semaphore::new(tier.concurrency_ceiling())),
                    },
                )
            })
            .collect();

        Self {
            tier,
            sources,
            rate_limit_hits: AtomicU64::new(0),
        }
    }

    /// The configured tier
    pub fn tier(&self) -> PacingTier {
        self.tier
    }

    /// Suspends the caller until the source can accept another request
    ///
    /// Acquires one of the source's concurrency slots, then waits out the
    /// minimum inter-request delay against the shared last-satisfied
    /// stamp. The returned permit must be held for the duration of the
    /// request.
    pub async fn before_request(&self, source: &str) -> RequestPermit {
        let Some(limit) = self.sources.get(source) else {
            tracing::warn!("No rate-limit state for source '{}'", source);
            return RequestPermit { _permit: None };
        };

        let permit = limit.slots.clone().acquire_owned().await.ok();

        loop {
            let wait = {
                let mut pace = limit.pace.lock().unwrap();
                match pace.time_until_ready(Instant::now()) {
                    None => {
                        pace.record_issued(Instant::now());
                        break;
                    }
                    Some(wait) => wait,
                }
            };
            tokio::time::sleep(wait).await;
        }

        RequestPermit { _permit: permit }
    }

    /// Records a failure and decides whether the caller should retry
    ///
    /// Rate-limit signals and other transient errors share the same
    /// schedule; they differ only in accounting.
    pub fn on_failure(&self, source: &str, rate_limited: bool) -> Backoff {
        if rate_limited {
            self.rate_limit_hits.fetch_add(1, Ordering::Relaxed);
        }

        let Some(limit) = self.sources.get(source) else {
            return Backoff::GiveUp;
        };

        let mut pace = limit.pace.lock().unwrap();
        if pace.consecutive_failures >= self.tier.max_attempts() {
            Backoff::GiveUp
        } else {
            Backoff::RetryAfter(pace.record_failure(self.tier.base_delay(), self.tier.max_delay_cap()))
        }
    }

    /// Clears the failure streak after a successful request
    pub fn on_success(&self, source: &str) {
        if let Some(limit) = self.sources.get(source) {
            limit.pace.lock().unwrap().record_success();
        }
    }

    /// Number of rate-limit signals observed so far
    pub fn rate_limit_hits(&self) -> u64 {
        self.rate_limit_hits.load(Ordering::Relaxed)
    }

    /// Cumulative backoff time handed out for a source
    pub fn cumulative_backoff(&self, source: &str) -> Duration {
        self.sources
            .get(source)
            .map(|limit| limit.pace.lock().unwrap().cumulative_backoff)
            .unwrap_or(Duration::ZERO)
    }
}
