//! Mock stages for testing.

use parking_lot::Mutex;
use std::fmt;

use crate::core::ChangeRecord;
use crate::errors::StageError;
use crate::stages::{Stage, StageOutcome, StageRequest};

type Transform = Box<dyn Fn(&StageRequest<'_>) -> Result<StageOutcome, StageError> + Send + Sync>;

/// A stage with scripted behaviour that records every call.
pub struct MockStage {
    label: String,
    transform: Transform,
    call_count: Mutex<usize>,
    inputs: Mutex<Vec<String>>,
    intensities: Mutex<Vec<u8>>,
}

impl MockStage {
    /// Creates a mock running `transform`.
    pub fn new<F>(label: impl Into<String>, transform: F) -> Self
    where
        F: Fn(&StageRequest<'_>) -> Result<StageOutcome, StageError> + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            transform: Box::new(transform),
            call_count: Mutex::new(0),
            inputs: Mutex::new(Vec::new()),
            intensities: Mutex::new(Vec::new()),
        }
    }

    /// Returns its input unchanged.
    #[must_use]
    pub fn passthrough() -> Self {
        Self::new("passthrough", |req| Ok(StageOutcome::unchanged(req.text)))
    }

    /// Appends `suffix` and records one `append` change.
    #[must_use]
    pub fn appending(suffix: impl Into<String>) -> Self {
        let suffix = suffix.into();
        Self::new("appending", move |req| {
            Ok(StageOutcome::unchanged(format!("{}{suffix}", req.text))
                .with_change(ChangeRecord::new(req.stage.as_str(), "append").with_replacement(suffix.clone())))
        })
    }

    /// Replaces every occurrence of `from` with `to`, recording one
    /// `replace` change when anything matched.
    #[must_use]
    pub fn replacing(from: impl Into<String>, to: impl Into<String>) -> Self {
        let from = from.into();
        let to = to.into();
        Self::new("replacing", move |req| {
            if !req.text.contains(from.as_str()) {
                return Ok(StageOutcome::unchanged(req.text));
            }
            Ok(StageOutcome::unchanged(req.text.replace(from.as_str(), &to))
                .with_change(ChangeRecord::replacement(req.stage.as_str(), "replace", from.clone(), to.clone())))
        })
    }

    /// Returns `Err` on every call.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new("failing", move |req| Err(StageError::new(req.stage.as_str(), message.clone())))
    }

    /// Panics on every call.
    #[must_use]
    pub fn panicking(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new("panicking", move |_req| panic!("{message}"))
    }

    /// Returns the number of calls.
    #[must_use]
    pub fn call_count(&self) -> usize {
        *self.call_count.lock()
    }

    /// Returns the text of every call, in order.
    #[must_use]
    pub fn inputs(&self) -> Vec<String> {
        self.inputs.lock().clone()
    }

    /// Returns the intensity of every call, in order.
    #[must_use]
    pub fn intensities(&self) -> Vec<u8> {
        self.intensities.lock().clone()
    }

    /// Returns the intensity of the latest call.
    #[must_use]
    pub fn last_intensity(&self) -> Option<u8> {
        self.intensities.lock().last().copied()
    }

    /// Resets call tracking.
    pub fn reset(&self) {
        *self.call_count.lock() = 0;
        self.inputs.lock().clear();
        self.intensities.lock().clear();
    }
}

impl fmt::Debug for MockStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockStage")
            .field("label", &self.label)
            .field("call_count", &self.call_count())
            .finish_non_exhaustive()
    }
}

impl Stage for MockStage {
    fn apply(&self, request: &StageRequest<'_>) -> Result<StageOutcome, StageError> {
        *self.call_count.lock() += 1;
        self.inputs.lock().push(request.text.to_string());
        self.intensities.lock().push(request.intensity);
        (self.transform)(request)
    }
}

/// A stage that always fails.
#[derive(Debug)]
pub struct FailingStage {
    error: String,
    call_count: Mutex<usize>,
}

impl FailingStage {
    /// Creates a failing stage.
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            call_count: Mutex::new(0),
        }
    }

    /// Returns the number of calls.
    #[must_use]
    pub fn call_count(&self) -> usize {
        *self.call_count.lock()
    }
}

impl Stage for FailingStage {
    fn apply(&self, request: &StageRequest<'_>) -> Result<StageOutcome, StageError> {
        *self.call_count.lock() += 1;
        Err(StageError::new(request.stage.as_str(), self.error.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Profile;
    use crate::core::StageName;
    use std::collections::BTreeMap;

    fn request<'a>(text: &'a str, subs: &'a BTreeMap<String, String>) -> StageRequest<'a> {
        StageRequest {
            stage: StageName::Universal,
            text,
            lang: "en",
            profile: Profile::Web,
            intensity: 40,
            seed: None,
            target_style: None,
            substitutions: subs,
        }
    }

    #[test]
    fn test_mock_stage_tracks_calls() {
        let subs = BTreeMap::new();
        let stage = MockStage::appending("!");
        let outcome = stage.apply(&request("hi", &subs)).unwrap();

        assert_eq!(outcome.text, "hi!");
        assert_eq!(outcome.changes[0].stage, "universal");
        assert_eq!(stage.call_count(), 1);
        assert_eq!(stage.inputs(), vec!["hi"]);
        assert_eq!(stage.last_intensity(), Some(40));

        stage.reset();
        assert_eq!(stage.call_count(), 0);
        assert!(stage.intensities().is_empty());
    }

    #[test]
    fn test_replacing_stage() {
        let subs = BTreeMap::new();
        let stage = MockStage::replacing("Acme", "The firm");
        let outcome = stage.apply(&request("Acme and Acme", &subs)).unwrap();
        assert_eq!(outcome.text, "The firm and The firm");
        assert_eq!(outcome.changes.len(), 1);

        let untouched = stage.apply(&request("nothing", &subs)).unwrap();
        assert!(untouched.changes.is_empty());
    }

    #[test]
    fn test_failing_stages() {
        let subs = BTreeMap::new();
        assert!(MockStage::failing("nope").apply(&request("x", &subs)).is_err());

        let failing = FailingStage::new("broken");
        let err = failing.apply(&request("x", &subs)).unwrap_err();
        assert_eq!(err.stage, "universal");
        assert_eq!(failing.call_count(), 1);
    }
}
