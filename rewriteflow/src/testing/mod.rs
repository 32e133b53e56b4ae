//! Testing utilities for rewriteflow pipelines.
//!
//! Mock stages and scripted oracles that count their calls, plus
//! assertions over [`PipelineResult`](crate::pipeline::PipelineResult)
//! change records.

mod assertions;
mod mocks;
mod oracles;

pub use assertions::{
    assert_change_count, assert_has_change, assert_no_change, assert_untouched,
};
pub use mocks::{FailingStage, MockStage};
pub use oracles::{ScriptedMetricsOracle, ScriptedPerplexityOracle};
