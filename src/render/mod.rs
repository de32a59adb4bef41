//! Page renderer capability
//!
//! The crawl core consumes rendering as a capability: given a URL, produce
//! the page content or fail with a classified error. How a page gets
//! rendered (plain HTTP, a headless browser behind an HTTP bridge, a
//! recorded fixture in tests) is outside the core; implementations plug in
//! behind the `Renderer` trait.

mod http;

pub use http::{build_http_client, HttpRenderer};

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors a renderer can fail with
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Render timed out for {url}")]
    Timeout { url: String },

    #[error("Request blocked for {url} (HTTP {status})")]
    Blocked { url: String, status: u16 },

    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },
}

impl RenderError {
    /// Whether this failure is the rate-limit-pressure signal
    ///
    /// `Blocked` carries the HTTP 429-equivalent; timeouts and network
    /// errors share the backoff schedule but are counted separately.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, RenderError::Blocked { .. })
    }

    /// The URL the failure occurred for
    pub fn url(&self) -> &str {
        match self {
            RenderError::Timeout { url }
            | RenderError::Blocked { url, .. }
            | RenderError::Network { url, .. } => url,
        }
    }
}

/// Capability that turns a URL into rendered page content
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Renders the page at `url`, failing after `timeout`
    async fn render(&self, url: &str, timeout: Duration) -> Result<String, RenderError>;
}
