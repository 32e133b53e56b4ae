//! Pipeline event emission.
//!
//! The executor reports its progress to an [`EventSink`] alongside its
//! `tracing` output. Sinks never fail the pipeline.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

/// Event type names emitted by the pipeline.
pub mod event_types {
    /// A public `run` call began.
    pub const PIPELINE_STARTED: &str = "pipeline.started";
    /// The adaptive controller routed an attempt through the fast path.
    pub const PIPELINE_FAST_PATH: &str = "pipeline.fast_path";
    /// A stage completed and was checkpointed.
    pub const STAGE_COMPLETED: &str = "stage.completed";
    /// A stage failed and its effect was discarded.
    pub const STAGE_SKIPPED: &str = "stage.skipped";
    /// The language-resource stage group was skipped.
    pub const STAGE_GROUP_SKIPPED: &str = "stage.group_skipped";
    /// The perplexity gate undid a stage.
    pub const GATE_ROLLBACK: &str = "gate.rollback";
    /// Validation forced a partial or full rollback.
    pub const PIPELINE_ROLLBACK: &str = "pipeline.rollback";
    /// A reduced-intensity attempt is starting.
    pub const PIPELINE_RETRY: &str = "pipeline.retry";
    /// A public `run` call finished.
    pub const PIPELINE_COMPLETED: &str = "pipeline.completed";
    /// A batch finished.
    pub const BATCH_COMPLETED: &str = "batch.completed";
}
