//! Metrics reported by the external scoring oracle.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Artificiality and auxiliary metrics for one text.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TextMetrics {
    /// How machine-generated the text appears, 0–100.
    pub artificiality_score: f64,
    /// Readability index, if the oracle computes one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readability: Option<f64>,
    /// Lexical repetition ratio, if the oracle computes one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repetition: Option<f64>,
    /// Any further oracle-specific metrics.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub extra: HashMap<String, f64>,
}

impl TextMetrics {
    /// Creates metrics carrying only an artificiality score.
    #[must_use]
    pub fn new(artificiality_score: f64) -> Self {
        Self {
            artificiality_score,
            ..Self::default()
        }
    }

    /// Sets the readability index.
    #[must_use]
    pub fn with_readability(mut self, readability: f64) -> Self {
        self.readability = Some(readability);
        self
    }

    /// Sets the repetition ratio.
    #[must_use]
    pub fn with_repetition(mut self, repetition: f64) -> Self {
        self.repetition = Some(repetition);
        self
    }

    /// Adds an extra metric.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: f64) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// The artificiality score clamped to 0–100.
    #[must_use]
    pub fn clamped_score(&self) -> f64 {
        if self.artificiality_score.is_nan() {
            return 0.0;
        }
        self.artificiality_score.clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let metrics = TextMetrics::new(42.0)
            .with_readability(61.2)
            .with_extra("burstiness", 0.4);
        assert_eq!(metrics.readability, Some(61.2));
        assert_eq!(metrics.extra.get("burstiness"), Some(&0.4));
    }

    #[test]
    fn test_clamped_score() {
        assert!((TextMetrics::new(140.0).clamped_score() - 100.0).abs() < f64::EPSILON);
        assert!(TextMetrics::new(-3.0).clamped_score().abs() < f64::EPSILON);
        assert!(TextMetrics::new(f64::NAN).clamped_score().abs() < f64::EPSILON);
    }

    #[test]
    fn test_deserialize_minimal() {
        let metrics: TextMetrics = serde_json::from_str(r#"{"artificiality_score": 12.5}"#).unwrap();
        assert!((metrics.artificiality_score - 12.5).abs() < f64::EPSILON);
        assert!(metrics.readability.is_none());
    }
}
