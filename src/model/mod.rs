//! Core data types for dependencies, registry lookups, and scan results.
//!
//! This module contains the fundamental types used throughout depsentry:
//!
//! - [`Ecosystem`] - A package ecosystem (npm, RubyGems, PyPI)
//! - [`WorkItem`] - One pending registry lookup
//! - [`Finding`] - A package whose registry record signals risk
//! - [`ScanProgress`] - Scanned/total counters emitted during a scan
//! - [`ScanOutcome`] - Final result of one scan
//!
//! # Example
//!
//! ```
//! use depsentry::{Ecosystem, Finding, FindingStatus};
//!
//! let finding = Finding::new("left-pad", Ecosystem::Npm, FindingStatus::Unpublished, "package.json");
//! assert_eq!(finding.status.to_string(), "Unpublished");
//! ```

mod ecosystem;
mod finding;

pub use ecosystem::*;
pub use finding::*;
