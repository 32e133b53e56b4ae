//! Quality validation of a candidate output against the original input.

use crate::config::{Constraints, ValidatorSettings};
use crate::core::{text, TextMetrics};
use crate::oracles::MetricsOracle;
use serde::{Deserialize, Serialize};

/// Outcome of validating one candidate text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// No critical errors.
    pub is_valid: bool,
    /// Change ratio over the bound, or a critical error present.
    pub should_rollback: bool,
    /// Word-level change ratio, 0–1.
    pub change_ratio: f64,
    /// Critical errors.
    pub errors: Vec<String>,
    /// Non-critical warnings.
    pub warnings: Vec<String>,
    /// Metrics of the candidate, when the oracle produced them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics_after: Option<TextMetrics>,
}

impl ValidationResult {
    /// Returns true if a critical error is present.
    #[must_use]
    pub fn has_critical_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns true if the change ratio exceeds `max_change_ratio`.
    #[must_use]
    pub fn exceeds_change_bound(&self, max_change_ratio: f64) -> bool {
        self.change_ratio > max_change_ratio
    }
}

/// Checks hard invariants of a rewrite.
pub struct QualityValidator<'a> {
    oracle: Option<&'a dyn MetricsOracle>,
    settings: &'a ValidatorSettings,
    constraints: &'a Constraints,
    lang: &'a str,
}

impl<'a> QualityValidator<'a> {
    /// Creates a validator.
    #[must_use]
    pub fn new(
        oracle: Option<&'a dyn MetricsOracle>,
        settings: &'a ValidatorSettings,
        constraints: &'a Constraints,
        lang: &'a str,
    ) -> Self {
        Self {
            oracle,
            settings,
            constraints,
            lang,
        }
    }

    /// Validates `candidate` against `original`.
    ///
    /// `before` are the original's metrics; without them (or without an
    /// oracle) the artificiality check is skipped with a warning.
    #[must_use]
    pub fn validate(
        &self,
        original: &str,
        candidate: &str,
        before: Option<&TextMetrics>,
    ) -> ValidationResult {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        let change_ratio = text::change_ratio(original, candidate);

        for keyword in self.missing_keywords(original, candidate) {
            errors.push(format!("required keyword lost: '{keyword}'"));
        }

        let metrics_after = self.measure(candidate, &mut warnings);
        if let (Some(before), Some(after)) = (before, metrics_after.as_ref()) {
            let delta = after.artificiality_score - before.artificiality_score;
            if delta > self.settings.artificiality_tolerance {
                errors.push(format!(
                    "artificiality rose from {:.1} to {:.1}",
                    before.artificiality_score, after.artificiality_score
                ));
            }
        } else if self.oracle.is_some() && before.is_none() {
            warnings.push("artificiality regression not checked: no baseline".to_string());
        }

        if text::numbers(original) != text::numbers(candidate) {
            warnings.push("numeric values changed".to_string());
        }

        let original_len = original.chars().count();
        if original_len > 0 {
            let ratio = candidate.chars().count() as f64 / original_len as f64;
            if ratio < self.settings.min_length_ratio || ratio > self.settings.max_length_ratio {
                warnings.push(format!("length ratio {ratio:.2} outside bounds"));
            }
        }

        let is_valid = errors.is_empty();
        ValidationResult {
            is_valid,
            should_rollback: !is_valid || change_ratio > self.constraints.max_change_ratio,
            change_ratio,
            errors,
            warnings,
            metrics_after,
        }
    }

    fn missing_keywords<'k>(&'k self, original: &str, candidate: &str) -> Vec<&'k str> {
        self.constraints
            .keep_keywords
            .iter()
            .map(String::as_str)
            .filter(|kw| text::contains_phrase(original, kw) && !text::contains_phrase(candidate, kw))
            .collect()
    }

    fn measure(&self, candidate: &str, warnings: &mut Vec<String>) -> Option<TextMetrics> {
        let oracle = self.oracle?;
        match oracle.analyze(candidate, self.lang) {
            Ok(metrics) => Some(metrics),
            Err(err) => {
                tracing::warn!(error = %err, "Validator could not score candidate");
                warnings.push(format!("artificiality not measured: {err}"));
                None
            }
        }
    }
}
