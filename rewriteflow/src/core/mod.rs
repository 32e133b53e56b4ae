//! Core domain model types for rewriteflow.
//!
//! This module contains the fundamental types used throughout the crate:
//! - The closed stage enumeration
//! - Append-only change records
//! - Oracle metrics
//! - Word-level text helpers (change ratio, fingerprints)

mod change;
mod metrics;
mod stage_name;
pub mod text;

pub use change::{kinds, plugin_source, ChangeRecord, PIPELINE_SOURCE};
pub use metrics::TextMetrics;
pub use stage_name::StageName;
