//! Output module for demand summaries and reports
//!
//! This module handles:
//! - Loading aggregate skill-demand statistics from the repository
//! - Printing the console statistics view
//! - Generating the markdown demand summary

mod markdown;
pub mod stats;

pub use markdown::generate_demand_summary;
pub use stats::{load_statistics, print_statistics, DemandStatistics};
