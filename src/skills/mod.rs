//! Skill extraction from job-description text
//!
//! This module converts one free-text description into a deduplicated list
//! of canonical skill names using three match layers:
//!
//! 1. Phrase match: known multi-word technical phrases, longest first
//! 2. Context match: trigger templates such as "experience with X"
//! 3. Direct match: skill-reference patterns plus a small built-in set of
//!    high-precision single-token patterns
//!
//! Each layer records the spans it consumed so later layers never
//! double-count the same region of text. Extraction is a pure function of
//! the description and the reference loaded at startup.

mod extract;
mod reference;

pub use extract::SkillExtractor;
pub use reference::{ReferenceError, SkillEntry, SkillReference, SuppressionEntry};
