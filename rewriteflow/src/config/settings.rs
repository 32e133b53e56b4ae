//! Tunables for the gate, the validator and graduated retry.

use serde::{Deserialize, Serialize};

/// Perplexity regression gate settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateSettings {
    /// Whether the gate runs at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Maximum tolerated relative perplexity drop across the guarded stage.
    #[serde(default = "default_max_perplexity_drop")]
    pub max_perplexity_drop: f64,
}

fn default_true() -> bool {
    true
}

fn default_max_perplexity_drop() -> f64 {
    0.30
}

impl Default for GateSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_perplexity_drop: default_max_perplexity_drop(),
        }
    }
}

/// Validator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorSettings {
    /// Points of artificiality increase tolerated before it counts as a regression.
    #[serde(default = "default_artificiality_tolerance")]
    pub artificiality_tolerance: f64,
    /// Lower bound of the acceptable output/input length ratio.
    #[serde(default = "default_min_length_ratio")]
    pub min_length_ratio: f64,
    /// Upper bound of the acceptable output/input length ratio.
    #[serde(default = "default_max_length_ratio")]
    pub max_length_ratio: f64,
}

fn default_artificiality_tolerance() -> f64 {
    5.0
}

fn default_min_length_ratio() -> f64 {
    0.5
}

fn default_max_length_ratio() -> f64 {
    1.5
}

impl Default for ValidatorSettings {
    fn default() -> Self {
        Self {
            artificiality_tolerance: default_artificiality_tolerance(),
            min_length_ratio: default_min_length_ratio(),
            max_length_ratio: default_max_length_ratio(),
        }
    }
}

/// Graduated retry settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Intensity factors tried, in order, after the first attempt.
    #[serde(default = "default_factors")]
    pub factors: Vec<f64>,
}

fn default_factors() -> Vec<f64> {
    vec![0.4, 0.15]
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            factors: default_factors(),
        }
    }
}

impl RetrySettings {
    /// Sets the retry factors.
    #[must_use]
    pub fn with_factors(mut self, factors: Vec<f64>) -> Self {
        self.factors = factors;
        self
    }

    /// Disables graduated retry.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default().with_factors(Vec::new())
    }
}
