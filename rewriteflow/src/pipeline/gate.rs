//! Perplexity regression gate.
//!
//! Placed after the naturalization stage. If that stage made the text
//! markedly *more* predictable to a language model, its effect is undone.

use crate::config::GateSettings;
use crate::oracles::LanguageModelOracle;
use serde::{Deserialize, Serialize};

/// What the gate decided for one stage boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum GateVerdict {
    /// Perplexity did not drop past the threshold.
    Pass {
        /// Perplexity before the stage.
        before: f64,
        /// Perplexity after the stage.
        after: f64,
    },
    /// Perplexity dropped past the threshold; restore the pre-stage text.
    Rollback {
        /// Perplexity before the stage.
        before: f64,
        /// Perplexity after the stage.
        after: f64,
        /// Relative drop, 0–1.
        drop: f64,
    },
    /// The gate could not decide and did nothing.
    Skipped {
        /// Why.
        reason: String,
    },
}

impl GateVerdict {
    /// Returns true if the stage must be undone.
    #[must_use]
    pub fn is_rollback(&self) -> bool {
        matches!(self, Self::Rollback { .. })
    }
}

/// Compares language-model perplexity across one stage.
pub struct PerplexityGate<'a> {
    oracle: Option<&'a dyn LanguageModelOracle>,
    settings: &'a GateSettings,
}

impl<'a> PerplexityGate<'a> {
    /// Creates a gate over an optional oracle.
    #[must_use]
    pub fn new(oracle: Option<&'a dyn LanguageModelOracle>, settings: &'a GateSettings) -> Self {
        Self { oracle, settings }
    }

    /// Evaluates the transition `before -> after`.
    ///
    /// Oracle failures yield [`GateVerdict::Skipped`]; the gate never blocks
    /// the pipeline.
    #[must_use]
    pub fn evaluate(&self, before: &str, after: &str) -> GateVerdict {
        if !self.settings.enabled {
            return GateVerdict::Skipped {
                reason: "gate disabled".to_string(),
            };
        }
        let Some(oracle) = self.oracle else {
            return GateVerdict::Skipped {
                reason: "no language model configured".to_string(),
            };
        };
        if before == after {
            return GateVerdict::Skipped {
                reason: "stage left text unchanged".to_string(),
            };
        }

        let scores = oracle
            .perplexity(before)
            .and_then(|b| oracle.perplexity(after).map(|a| (b, a)));
        let (ppl_before, ppl_after) = match scores {
            Ok(pair) => pair,
            Err(err) => {
                tracing::warn!(error = %err, "Perplexity gate skipped");
                return GateVerdict::Skipped {
                    reason: err.to_string(),
                };
            }
        };

        if !ppl_before.is_finite() || !ppl_after.is_finite() || ppl_before <= 0.0 {
            return GateVerdict::Skipped {
                reason: format!("unusable perplexity ({ppl_before}, {ppl_after})"),
            };
        }

        let drop = (ppl_before - ppl_after) / ppl_before;
        if drop > self.settings.max_perplexity_drop {
            GateVerdict::Rollback {
                before: ppl_before,
                after: ppl_after,
                drop,
            }
        } else {
            GateVerdict::Pass {
                before: ppl_before,
                after: ppl_after,
            }
        }
    }
}
