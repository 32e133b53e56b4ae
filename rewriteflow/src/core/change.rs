//! Atomic change records with factory methods for the executor's own kinds.

use super::StageName;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Record kinds emitted by the orchestration core itself.
pub mod kinds {
    /// The adaptive controller changed the intensity.
    pub const INTENSITY_ADJUSTED: &str = "intensity_adjusted";
    /// The run was routed through the fast path.
    pub const FAST_PATH: &str = "fast_path";
    /// Watermarks were stripped before segmentation.
    pub const WATERMARK: &str = "watermark";
    /// The language-resource group was skipped as a block.
    pub const STAGE_GROUP_SKIPPED: &str = "stage_group_skipped";
    /// A stage failed and its effect was discarded.
    pub const STAGE_SKIPPED: &str = "stage_skipped";
    /// A plugin failed and its effect was discarded.
    pub const PLUGIN_SKIPPED: &str = "plugin_skipped";
    /// The perplexity gate undid the naturalization stage.
    pub const PERPLEXITY_ROLLBACK: &str = "perplexity_rollback";
    /// The final text was rolled back to a checkpoint.
    pub const PARTIAL_ROLLBACK: &str = "partial_rollback";
    /// The final text was rolled back to the original input.
    pub const FULL_ROLLBACK: &str = "full_rollback";
    /// The winning attempt came from a reduced-intensity rerun.
    pub const GRADUATED_RETRY: &str = "graduated_retry";
    /// A scoring oracle failed and its check was skipped.
    pub const ORACLE_UNAVAILABLE: &str = "oracle_unavailable";
}

/// Source name used for records that do not belong to a stage.
pub const PIPELINE_SOURCE: &str = "pipeline";

/// One atomic change made (or undone) during a run.
///
/// Records are append-only: a rollback never removes earlier records, it
/// appends a record explaining what was undone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// The stage (or `pipeline`, or `plugin:<stage>`) that produced the record.
    pub stage: String,
    /// What kind of change this is.
    pub kind: String,
    /// The replaced fragment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original: Option<String>,
    /// The replacement fragment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replacement: Option<String>,
    /// Free-form explanation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ChangeRecord {
    /// Creates a bare record.
    #[must_use]
    pub fn new(stage: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            kind: kind.into(),
            original: None,
            replacement: None,
            description: None,
        }
    }

    /// Creates a record for a fragment replacement.
    #[must_use]
    pub fn replacement(
        stage: impl Into<String>,
        kind: impl Into<String>,
        original: impl Into<String>,
        replacement: impl Into<String>,
    ) -> Self {
        Self::new(stage, kind)
            .with_original(original)
            .with_replacement(replacement)
    }

    /// Sets the original fragment.
    #[must_use]
    pub fn with_original(mut self, original: impl Into<String>) -> Self {
        self.original = Some(original.into());
        self
    }

    /// Sets the replacement fragment.
    #[must_use]
    pub fn with_replacement(mut self, replacement: impl Into<String>) -> Self {
        self.replacement = Some(replacement.into());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// A stage failed; its effect was discarded.
    #[must_use]
    pub fn stage_skipped(stage: StageName, reason: impl Into<String>) -> Self {
        Self::new(stage.as_str(), kinds::STAGE_SKIPPED).with_description(reason)
    }

    /// A plugin spliced around `stage` failed.
    #[must_use]
    pub fn plugin_skipped(stage: StageName, reason: impl Into<String>) -> Self {
        Self::new(plugin_source(stage), kinds::PLUGIN_SKIPPED).with_description(reason)
    }

    /// The capability group was skipped for `lang`.
    #[must_use]
    pub fn group_skipped(lang: &str, stages: &[StageName]) -> Self {
        let names: Vec<&str> = stages.iter().map(|s| s.as_str()).collect();
        Self::new(PIPELINE_SOURCE, kinds::STAGE_GROUP_SKIPPED).with_description(format!(
            "no linguistic resources for '{lang}'; skipped {}",
            names.join(", ")
        ))
    }

    /// The adaptive controller changed the intensity.
    #[must_use]
    pub fn intensity_adjusted(from: u8, to: u8, score: f64) -> Self {
        Self::replacement(
            PIPELINE_SOURCE,
            kinds::INTENSITY_ADJUSTED,
            from.to_string(),
            to.to_string(),
        )
        .with_description(format!("artificiality score {score:.1}"))
    }

    /// Returns true if this record marks a failed stage.
    #[must_use]
    pub fn is_stage_skip(&self) -> bool {
        self.kind == kinds::STAGE_SKIPPED
    }

    /// Converts the record to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("stage".to_string(), serde_json::json!(self.stage));
        map.insert("kind".to_string(), serde_json::json!(self.kind));
        if let Some(ref original) = self.original {
            map.insert("original".to_string(), serde_json::json!(original));
        }
        if let Some(ref replacement) = self.replacement {
            map.insert("replacement".to_string(), serde_json::json!(replacement));
        }
        if let Some(ref description) = self.description {
            map.insert("description".to_string(), serde_json::json!(description));
        }
        map
    }
}

/// Source name for records produced by plugins around `stage`.
#[must_use]
pub fn plugin_source(stage: StageName) -> String {
    format!("plugin:{stage}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replacement_record() {
        let record = ChangeRecord::replacement("paraphrase", "synonym", "utilize", "use");
        assert_eq!(record.original.as_deref(), Some("utilize"));
        assert_eq!(record.replacement.as_deref(), Some("use"));
        assert!(record.description.is_none());
    }

    #[test]
    fn test_stage_skipped_record() {
        let record = ChangeRecord::stage_skipped(StageName::Paraphrase, "boom");
        assert_eq!(record.stage, "paraphrase");
        assert!(record.is_stage_skip());
        assert_eq!(record.description.as_deref(), Some("boom"));
    }

    #[test]
    fn test_plugin_skipped_is_not_a_stage_skip() {
        let record = ChangeRecord::plugin_skipped(StageName::Naturalize, "boom");
        assert_eq!(record.stage, "plugin:naturalize");
        assert!(!record.is_stage_skip());
    }

    #[test]
    fn test_group_skipped_lists_stages() {
        let record = ChangeRecord::group_skipped("xx", &[StageName::Structure, StageName::Paraphrase]);
        let description = record.description.unwrap();
        assert!(description.contains("'xx'"));
        assert!(description.contains("structure, paraphrase"));
    }

    #[test]
    fn test_serialization_skips_empty_fields() {
        let record = ChangeRecord::new("typography", "quotes");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json, serde_json::json!({"stage": "typography", "kind": "quotes"}));
    }

    #[test]
    fn test_to_dict() {
        let record = ChangeRecord::intensity_adjusted(60, 78, 81.5);
        let dict = record.to_dict();
        assert_eq!(dict.get("kind"), Some(&serde_json::json!("intensity_adjusted")));
        assert_eq!(dict.get("original"), Some(&serde_json::json!("60")));
        assert_eq!(dict.get("replacement"), Some(&serde_json::json!("78")));
    }
}
