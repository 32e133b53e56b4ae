//! Adaptive intensity control.
//!
//! Maps the pre-measured artificiality score of the input to an intensity
//! multiplier. Text that already reads as natural is not rewritten at all.

use serde::{Deserialize, Serialize};

/// Lowest intensity an adjusted run may use.
pub const MIN_INTENSITY: u8 = 5;
/// Highest intensity an adjusted run may use.
pub const MAX_INTENSITY: u8 = 100;
/// Scores at or below this take the fast path.
pub const FAST_PATH_THRESHOLD: f64 = 5.0;

/// The controller's decision for one attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum IntensityDecision {
    /// Skip every semantic stage; only normalize typography.
    FastPath {
        /// The score that triggered it.
        score: f64,
    },
    /// Run the full pipeline at `effective` intensity.
    Run {
        /// Intensity requested by the caller (after any retry scaling).
        requested: u8,
        /// Intensity handed to the stages.
        effective: u8,
        /// Multiplier applied, 1.0 when unchanged.
        multiplier: f64,
        /// The score, if the oracle produced one.
        score: Option<f64>,
    },
}

impl IntensityDecision {
    /// Returns true for the fast path.
    #[must_use]
    pub fn is_fast_path(&self) -> bool {
        matches!(self, Self::FastPath { .. })
    }

    /// Returns true if the intensity was changed.
    #[must_use]
    pub fn is_adjusted(&self) -> bool {
        matches!(self, Self::Run { requested, effective, .. } if requested != effective)
    }

    /// Intensity handed to the stages (0 on the fast path).
    #[must_use]
    pub fn effective(&self) -> u8 {
        match self {
            Self::FastPath { .. } => 0,
            Self::Run { effective, .. } => *effective,
        }
    }
}

/// Fixed-band adaptive intensity controller.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdaptiveIntensity;

impl AdaptiveIntensity {
    /// Multiplier for a score, or `None` for the fast path.
    ///
    /// | score | multiplier |
    /// |---|---|
    /// | ≥ 70 | 1.3 |
    /// | [50, 70) | 1.1 |
    /// | (25, 50) | 1.0 |
    /// | (15, 25] | 0.5 |
    /// | (10, 15] | 0.35 |
    /// | (5, 10] | 0.2 |
    /// | ≤ 5 | fast path |
    #[must_use]
    pub fn multiplier(score: f64) -> Option<f64> {
        if score >= 70.0 {
            Some(1.3)
        } else if score >= 50.0 {
            Some(1.1)
        } else if score > 25.0 {
            Some(1.0)
        } else if score > 15.0 {
            Some(0.5)
        } else if score > 10.0 {
            Some(0.35)
        } else if score > FAST_PATH_THRESHOLD {
            Some(0.2)
        } else {
            None
        }
    }

    /// Decides the intensity for an attempt.
    ///
    /// Without a score (oracle missing or failed) the requested intensity is
    /// used unchanged.
    #[must_use]
    pub fn decide(&self, requested: u8, score: Option<f64>) -> IntensityDecision {
        let Some(score) = score.filter(|s| !s.is_nan()) else {
            return IntensityDecision::Run {
                requested,
                effective: requested,
                multiplier: 1.0,
                score: None,
            };
        };

        match Self::multiplier(score) {
            None => IntensityDecision::FastPath { score },
            Some(multiplier) => {
                let effective = if (multiplier - 1.0).abs() < f64::EPSILON {
                    requested
                } else {
                    scale(requested, multiplier)
                };
                IntensityDecision::Run {
                    requested,
                    effective,
                    multiplier,
                    score: Some(score),
                }
            }
        }
    }
}

fn scale(intensity: u8, multiplier: f64) -> u8 {
    let scaled = (f64::from(intensity) * multiplier).round();
    // Clamped to [5, 100] before the cast.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let value = scaled.clamp(f64::from(MIN_INTENSITY), f64::from(MAX_INTENSITY)) as u8;
    value
}
