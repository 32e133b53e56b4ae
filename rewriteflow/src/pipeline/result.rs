//! The externally visible output of one pipeline invocation.

use super::retry::AttemptSummary;
use super::validator::ValidationResult;
use crate::config::Profile;
use crate::core::{ChangeRecord, TextMetrics};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Result of [`PipelineExecutor::run`](super::PipelineExecutor::run).
///
/// When graduated retry ran, this is the winning attempt; `attempts` lists
/// all of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    /// The input text.
    pub original: String,
    /// The rewritten text.
    pub text: String,
    /// Every change of the winning attempt, in order.
    pub changes: Vec<ChangeRecord>,
    /// Metrics of the input, if the oracle produced them.
    pub metrics_before: Option<TextMetrics>,
    /// Metrics of the output, if the oracle produced them.
    pub metrics_after: Option<TextMetrics>,
    /// Language code.
    pub lang: String,
    /// Style profile.
    pub profile: Profile,
    /// Intensity the winning attempt's stages ran at (0 on the fast path).
    pub intensity: u8,
    /// Unique id of this invocation.
    pub run_id: Uuid,
    /// Wall-clock start.
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration.
    pub duration_ms: f64,
    /// One summary per attempt.
    #[serde(default)]
    pub attempts: Vec<AttemptSummary>,
    /// Validation of the returned text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationResult>,
}

impl PipelineResult {
    /// Word-level change ratio of the returned text.
    #[must_use]
    pub fn change_ratio(&self) -> f64 {
        self.validation
            .as_ref()
            .map_or(0.0, |validation| validation.change_ratio)
    }

    /// Returns true if the text differs from the input.
    #[must_use]
    pub fn is_modified(&self) -> bool {
        self.text != self.original
    }

    /// Returns the records of one kind.
    pub fn changes_of_kind<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a ChangeRecord> + 'a {
        self.changes.iter().filter(move |change| change.kind == kind)
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("run_id".to_string(), serde_json::json!(self.run_id.to_string()));
        map.insert("original".to_string(), serde_json::json!(self.original));
        map.insert("text".to_string(), serde_json::json!(self.text));
        map.insert(
            "changes".to_string(),
            serde_json::json!(self.changes.iter().map(ChangeRecord::to_dict).collect::<Vec<_>>()),
        );
        map.insert("metrics_before".to_string(), serde_json::json!(self.metrics_before));
        map.insert("metrics_after".to_string(), serde_json::json!(self.metrics_after));
        map.insert("lang".to_string(), serde_json::json!(self.lang));
        map.insert("profile".to_string(), serde_json::json!(self.profile));
        map.insert("intensity".to_string(), serde_json::json!(self.intensity));
        map.insert("started_at".to_string(), serde_json::json!(self.started_at.to_rfc3339()));
        map.insert("duration_ms".to_string(), serde_json::json!(self.duration_ms));
        map.insert("change_ratio".to_string(), serde_json::json!(self.change_ratio()));
        map
    }
}
