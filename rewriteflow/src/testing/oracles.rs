//! Scripted oracles for testing.

use parking_lot::Mutex;

use crate::core::TextMetrics;
use crate::errors::OracleError;
use crate::oracles::{LanguageModelOracle, MetricsOracle};

/// Returns the value of the first rule whose needle occurs in `text`.
fn lookup(rules: &[(String, f64)], text: &str, default: f64) -> f64 {
    rules
        .iter()
        .find(|(needle, _)| text.contains(needle.as_str()))
        .map_or(default, |(_, value)| *value)
}

/// Artificiality scorer driven by substring rules.
#[derive(Debug, Default)]
pub struct ScriptedMetricsOracle {
    default_score: f64,
    rules: Vec<(String, f64)>,
    failure: Option<String>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedMetricsOracle {
    /// Scores every text `default_score`.
    #[must_use]
    pub fn new(default_score: f64) -> Self {
        Self {
            default_score,
            ..Self::default()
        }
    }

    /// Fails every call.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    /// Scores texts containing `needle` as `score`. Earlier rules win.
    #[must_use]
    pub fn with_score_for(mut self, needle: impl Into<String>, score: f64) -> Self {
        self.rules.push((needle.into(), score));
        self
    }

    /// Returns the number of calls.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Returns every analyzed text, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

impl MetricsOracle for ScriptedMetricsOracle {
    fn analyze(&self, text: &str, _lang: &str) -> Result<TextMetrics, OracleError> {
        self.calls.lock().push(text.to_string());
        if let Some(ref message) = self.failure {
            return Err(OracleError::new("metrics", message.clone()));
        }
        Ok(TextMetrics::new(lookup(&self.rules, text, self.default_score)))
    }
}

/// Perplexity estimator driven by substring rules.
#[derive(Debug, Default)]
pub struct ScriptedPerplexityOracle {
    default_perplexity: f64,
    rules: Vec<(String, f64)>,
    failure: Option<String>,
    call_count: Mutex<usize>,
}

impl ScriptedPerplexityOracle {
    /// Reports `default_perplexity` for every text.
    #[must_use]
    pub fn new(default_perplexity: f64) -> Self {
        Self {
            default_perplexity,
            ..Self::default()
        }
    }

    /// Fails every call.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    /// Reports `perplexity` for texts containing `needle`. Earlier rules win.
    #[must_use]
    pub fn with_perplexity_for(mut self, needle: impl Into<String>, perplexity: f64) -> Self {
        self.rules.push((needle.into(), perplexity));
        self
    }

    /// Returns the number of calls.
    #[must_use]
    pub fn call_count(&self) -> usize {
        *self.call_count.lock()
    }
}

impl LanguageModelOracle for ScriptedPerplexityOracle {
    fn perplexity(&self, text: &str) -> Result<f64, OracleError> {
        *self.call_count.lock() += 1;
        if let Some(ref message) = self.failure {
            return Err(OracleError::new("language_model", message.clone()));
        }
        Ok(lookup(&self.rules, text, self.default_perplexity))
    }
}
