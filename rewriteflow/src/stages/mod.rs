//! Stage trait and implementations.
//!
//! Stages are the atomic, named text transformations of a rewriteflow
//! pipeline. The executor only knows their contract: given a
//! [`StageRequest`], return rewritten text plus change records, or a
//! [`StageError`].

mod capability;
mod catalog;

pub use capability::{AllLanguages, LanguageCapabilities, StaticCapabilities};
pub use catalog::{StageCatalog, StageDescriptor};

use crate::config::{Profile, StyleFingerprint};
use crate::core::{ChangeRecord, StageName};
use crate::errors::StageError;
use rand::rngs::StdRng;
use rand::SeedableRng;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::panic::{self, AssertUnwindSafe};

/// Everything a stage may read.
///
/// A stage must be a pure function of this request; all randomness comes
/// from [`StageRequest::rng`].
#[derive(Debug, Clone, Copy)]
pub struct StageRequest<'a> {
    /// The stage being executed (or the stage a plugin is attached to).
    pub stage: StageName,
    /// Input text.
    pub text: &'a str,
    /// Language code.
    pub lang: &'a str,
    /// Style profile.
    pub profile: Profile,
    /// Effective intensity, 0–100.
    pub intensity: u8,
    /// Run seed.
    pub seed: Option<u64>,
    /// Optional target style.
    pub target_style: Option<&'a StyleFingerprint>,
    /// Literal substitutions.
    pub substitutions: &'a BTreeMap<String, String>,
}

impl<'a> StageRequest<'a> {
    /// Returns a copy of the request carrying different text.
    #[must_use]
    pub fn with_text(self, text: &'a str) -> Self {
        Self { text, ..self }
    }

    /// Returns a random number generator for this stage.
    ///
    /// With a seed, the generator is derived from `(seed, stage)` so every
    /// stage gets an independent, reproducible stream. Without one it is
    /// seeded from entropy.
    #[must_use]
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(derive_seed(seed, self.stage)),
            None => StdRng::from_entropy(),
        }
    }

    /// Intensity as a probability in `[0, 1]`.
    #[must_use]
    pub fn probability(&self) -> f64 {
        f64::from(self.intensity.min(100)) / 100.0
    }
}

fn derive_seed(seed: u64, stage: StageName) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(seed.to_le_bytes());
    hasher.update(stage.as_str().as_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

/// The output of a successful stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageOutcome {
    /// Rewritten text.
    pub text: String,
    /// Changes made.
    pub changes: Vec<ChangeRecord>,
}

impl StageOutcome {
    /// Creates an outcome.
    #[must_use]
    pub fn new(text: impl Into<String>, changes: Vec<ChangeRecord>) -> Self {
        Self {
            text: text.into(),
            changes,
        }
    }

    /// Creates an outcome that leaves the text as it was.
    #[must_use]
    pub fn unchanged(text: impl Into<String>) -> Self {
        Self::new(text, Vec::new())
    }

    /// Appends a change record.
    #[must_use]
    pub fn with_change(mut self, change: ChangeRecord) -> Self {
        self.changes.push(change);
        self
    }
}

/// Trait for pipeline stages.
pub trait Stage: Send + Sync + Debug {
    /// Rewrites `request.text`.
    ///
    /// # Errors
    ///
    /// Any error makes the executor discard this stage's effect and
    /// continue with the pre-stage text.
    fn apply(&self, request: &StageRequest<'_>) -> Result<StageOutcome, StageError>;
}

/// A simple function-based stage.
pub struct FnStage<F>
where
    F: Fn(&StageRequest<'_>) -> Result<StageOutcome, StageError> + Send + Sync,
{
    label: String,
    func: F,
}

impl<F> FnStage<F>
where
    F: Fn(&StageRequest<'_>) -> Result<StageOutcome, StageError> + Send + Sync,
{
    /// Creates a new function-based stage.
    pub fn new(label: impl Into<String>, func: F) -> Self {
        Self {
            label: label.into(),
            func,
        }
    }
}

impl<F> Debug for FnStage<F>
where
    F: Fn(&StageRequest<'_>) -> Result<StageOutcome, StageError> + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnStage")
            .field("label", &self.label)
            .finish()
    }
}

impl<F> Stage for FnStage<F>
where
    F: Fn(&StageRequest<'_>) -> Result<StageOutcome, StageError> + Send + Sync,
{
    fn apply(&self, request: &StageRequest<'_>) -> Result<StageOutcome, StageError> {
        (self.func)(request)
    }
}

/// A stage that returns its input untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughStage;

impl Stage for PassthroughStage {
    fn apply(&self, request: &StageRequest<'_>) -> Result<StageOutcome, StageError> {
        Ok(StageOutcome::unchanged(request.text))
    }
}

/// Runs `f`, converting a panic into a [`StageError`] attributed to `label`.
pub(crate) fn catch_panic<T>(label: &str, f: impl FnOnce() -> T) -> Result<T, StageError> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| StageError::from_panic(label, &*payload))
}

/// Applies `stage` inside the isolation boundary.
///
/// Both an `Err` return and a panic come back as `Err`; nothing escapes.
pub fn apply_isolated(
    stage: &dyn Stage,
    request: &StageRequest<'_>,
    label: &str,
) -> Result<StageOutcome, StageError> {
    catch_panic(label, || stage.apply(request)).and_then(|result| {
        result.map_err(|mut err| {
            if err.stage == "unknown" || err.stage.is_empty() {
                err.stage = label.to_string();
            }
            err
        })
    })
}
