//! Error types for the rewriteflow orchestration core.
//!
//! Only configuration errors ever reach the caller of
//! [`PipelineExecutor::run`](crate::pipeline::PipelineExecutor::run).
//! Stage and oracle failures are data-dependent and are absorbed by the
//! executor, leaving an audit record behind instead.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// The caller-visible error type.
///
/// Every variant indicates a programmer error (bad configuration or a bad
/// registration), never a property of the input text.
#[derive(Debug, Error)]
pub enum RewriteflowError {
    /// A hook or plugin was registered against a name outside the stage enumeration.
    #[error("Unknown stage '{name}'")]
    UnknownStage {
        /// The rejected name.
        name: String,
    },

    /// Intensity outside of `0..=100`.
    #[error("Intensity {value} is out of range (expected 0..=100)")]
    InvalidIntensity {
        /// The rejected value.
        value: i64,
    },

    /// A style profile name that does not parse.
    #[error("Invalid profile '{name}'")]
    InvalidProfile {
        /// The rejected name.
        name: String,
    },

    /// An invalid constraint or tunable.
    #[error("Invalid constraint: {0}")]
    InvalidConstraint(String),

    /// The configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A batch worker panicked or was cancelled.
    #[error("Batch worker failed: {0}")]
    Join(String),
}

impl RewriteflowError {
    /// Creates an unknown stage error.
    #[must_use]
    pub fn unknown_stage(name: impl Into<String>) -> Self {
        Self::UnknownStage { name: name.into() }
    }

    /// Creates an invalid profile error.
    #[must_use]
    pub fn invalid_profile(name: impl Into<String>) -> Self {
        Self::InvalidProfile { name: name.into() }
    }

    /// Returns a stable machine-readable code for the error.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::UnknownStage { .. } => "CONFIG-UNKNOWN-STAGE",
            Self::InvalidIntensity { .. } => "CONFIG-INTENSITY",
            Self::InvalidProfile { .. } => "CONFIG-PROFILE",
            Self::InvalidConstraint(_) => "CONFIG-CONSTRAINT",
            Self::Config(_) => "CONFIG-LOAD",
            Self::Join(_) => "BATCH-JOIN",
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("code".to_string(), serde_json::json!(self.code()));
        map.insert("message".to_string(), serde_json::json!(self.to_string()));
        map
    }
}

impl From<serde_json::Error> for RewriteflowError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<std::io::Error> for RewriteflowError {
    fn from(err: std::io::Error) -> Self {
        Self::Config(err.to_string())
    }
}

/// Error returned by a stage (or a plugin) that could not rewrite its input.
///
/// The executor turns it into a `stage_skipped` record and carries on with
/// the pre-stage text.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("Stage {stage} failed: {message}")]
pub struct StageError {
    /// Stage that failed.
    pub stage: String,
    /// Original error message.
    pub message: String,
}

impl StageError {
    /// Creates a new stage error.
    #[must_use]
    pub fn new(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// Creates a stage error from a caught panic payload.
    #[must_use]
    pub fn from_panic(stage: impl Into<String>, payload: &(dyn std::any::Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "stage panicked".to_string());
        Self::new(stage, format!("panic: {message}"))
    }
}

impl From<anyhow::Error> for StageError {
    fn from(err: anyhow::Error) -> Self {
        Self::new("unknown", format!("{err:#}"))
    }
}

/// Error returned by an external scoring oracle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Oracle {oracle} unavailable: {message}")]
pub struct OracleError {
    /// Which oracle failed (e.g. "metrics", "language_model").
    pub oracle: String,
    /// The failure message.
    pub message: String,
}

impl OracleError {
    /// Creates a new oracle error.
    #[must_use]
    pub fn new(oracle: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            oracle: oracle.into(),
            message: message.into(),
        }
    }
}

/// Result alias for caller-visible operations.
pub type Result<T, E = RewriteflowError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_stage_error() {
        let err = RewriteflowError::unknown_stage("bogus");
        assert!(err.to_string().contains("bogus"));
        assert_eq!(err.code(), "CONFIG-UNKNOWN-STAGE");
    }

    #[test]
    fn test_error_to_dict() {
        let err = RewriteflowError::InvalidIntensity { value: 150 };
        let dict = err.to_dict();

        assert_eq!(dict.get("code").unwrap(), "CONFIG-INTENSITY");
        assert!(dict.get("message").unwrap().as_str().unwrap().contains("150"));
    }

    #[test]
    fn test_stage_error_display() {
        let error = StageError::new("paraphrase", "dictionary missing");
        assert_eq!(error.stage, "paraphrase");
        assert!(error.to_string().contains("paraphrase"));
        assert!(error.to_string().contains("dictionary missing"));
    }

    #[test]
    fn test_stage_error_from_anyhow() {
        let err: StageError = anyhow::anyhow!("boom").into();
        assert!(err.message.contains("boom"));
    }

    #[test]
    fn test_stage_error_from_panic_payload() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("exploded");
        let err = StageError::from_panic("grammar_polish", payload.as_ref());
        assert_eq!(err.message, "panic: exploded");

        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        let err = StageError::from_panic("grammar_polish", payload.as_ref());
        assert_eq!(err.message, "panic: owned");
    }

    #[test]
    fn test_json_error_maps_to_config() {
        let err: RewriteflowError = serde_json::from_str::<u8>("nope").unwrap_err().into();
        assert!(matches!(err, RewriteflowError::Config(_)));
    }
}
