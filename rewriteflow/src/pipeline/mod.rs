//! Pipeline execution.
//!
//! This module provides:
//! - The executor and its builder
//! - Adaptive intensity control
//! - Checkpointing, the perplexity regression gate and rollback
//! - Validation and graduated retry
//! - The plugin and hook registry
//! - Concurrent batch processing

mod batch;
mod executor;
mod gate;
mod intensity;
mod ledger;
mod registry;
mod result;
mod retry;
mod validator;


pub use batch::run_batch;
pub use executor::{ExecutorBuilder, PipelineExecutor};
pub use gate::{GateVerdict, PerplexityGate};
pub use intensity::{
    AdaptiveIntensity, IntensityDecision, FAST_PATH_THRESHOLD, MAX_INTENSITY, MIN_INTENSITY,
};
pub use ledger::{Checkpoint, CheckpointLedger};
pub use registry::{
    clear_plugins, global_registry, register_hook, register_plugin, Extension, Hook, HookContext,
    HookPosition, PluginRegistry, RegistrySnapshot,
};
pub use result::PipelineResult;
pub use retry::{AttemptSummary, GraduatedRetry};
pub use validator::{QualityValidator, ValidationResult};
