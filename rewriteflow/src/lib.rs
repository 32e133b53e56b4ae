//! # Rewriteflow
//!
//! The orchestration core of a staged text-rewriting pipeline.
//!
//! Rewriteflow does not decide *what* to rewrite; stages do. It decides
//! how stages are sequenced, bounded, measured and recovered from:
//!
//! - **Stage isolation**: a failing or panicking stage is skipped, never fatal
//! - **Adaptive intensity**: input that already reads as natural takes a
//!   typography-only fast path
//! - **Checkpoints**: every completed stage is checkpointed for partial rollback
//! - **Perplexity gate**: a naturalization pass that makes text more
//!   predictable is undone
//! - **Graduated retry**: runs that change too much are retried at lower
//!   intensity
//! - **Plugins**: hooks and plugin stages spliced before or after any stage
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rewriteflow::prelude::*;
//! use std::sync::Arc;
//!
//! let executor = PipelineExecutor::builder()
//!     .stage(StageName::Typography, Arc::new(MyTypography))
//!     .stage(StageName::Naturalize, Arc::new(MyNaturalizer))
//!     .metrics_oracle(Arc::new(MyScorer))
//!     .build();
//!
//! let config = PipelineConfig::new("en")
//!     .with_intensity(60)
//!     .with_seed(42)
//!     .with_keep_keyword("Acme");
//!
//! let result = executor.run("Text to rewrite.", &config)?;
//! println!("{}", result.text);
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::cast_precision_loss
)]

pub mod config;
pub mod core;
pub mod errors;
pub mod events;
pub mod observability;
pub mod oracles;
pub mod pipeline;
pub mod stages;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{Constraints, PipelineConfig, PreservationPolicy, Profile};
    pub use crate::core::{kinds, ChangeRecord, StageName, TextMetrics};
    pub use crate::errors::{OracleError, Result, RewriteflowError, StageError};
    pub use crate::events::{EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::observability::{init_tracing, LogFormat};
    pub use crate::oracles::{
        CachedMetricsOracle, LanguageModelOracle, MetricsOracle, SpanProtector, WatermarkCleaner,
    };
    pub use crate::pipeline::{
        global_registry, run_batch, HookPosition, PipelineExecutor, PipelineResult,
        PluginRegistry,
    };
    pub use crate::stages::{
        FnStage, LanguageCapabilities, Stage, StageCatalog, StageOutcome, StageRequest,
        StaticCapabilities,
    };
}
