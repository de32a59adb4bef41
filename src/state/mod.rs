//! State module for tracking crawl progress
//!
//! This module provides the shared mutable structures of one crawl request.
//!
//! # Components
//!
//! - `CrawlState`: the deduplication set, result list, discovery budget and
//!   stop signal, behind one mutex with atomic test-and-set operations
//! - `PaceState`: per-source request pacing and exponential backoff state

mod crawl_state;
mod pace_state;

// Re-export main types
pub use crawl_state::CrawlState;
pub use pace_state::PaceState;
