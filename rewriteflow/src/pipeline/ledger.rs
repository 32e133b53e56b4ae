//! Append-only checkpoint ledger for one pipeline attempt.

use crate::core::{text, StageName};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Text snapshot taken after a stage completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// The stage that produced this text.
    pub stage: StageName,
    /// The text after the stage (and its hooks) ran.
    pub text: String,
    /// SHA-256 of `text`.
    pub fingerprint: String,
}

impl Checkpoint {
    /// Creates a checkpoint.
    #[must_use]
    pub fn new(stage: StageName, text: impl Into<String>) -> Self {
        let text = text.into();
        let fingerprint = text::fingerprint(&text);
        Self {
            stage,
            text,
            fingerprint,
        }
    }
}

/// Ordered checkpoints of one attempt, on top of the attempt's baseline text.
///
/// One checkpoint exists per successfully executed stage. Restoring
/// `checkpoints()[i].text` and replaying only later stages is a valid
/// continuation of the pipeline.
#[derive(Debug, Clone)]
pub struct CheckpointLedger {
    baseline: String,
    checkpoints: Vec<Checkpoint>,
}

impl CheckpointLedger {
    /// Starts a ledger from the text the first stage will see.
    #[must_use]
    pub fn new(baseline: impl Into<String>) -> Self {
        Self {
            baseline: baseline.into(),
            checkpoints: Vec::new(),
        }
    }

    /// Appends a checkpoint.
    pub fn record(&mut self, stage: StageName, text: impl Into<String>) {
        self.checkpoints.push(Checkpoint::new(stage, text));
    }

    /// The text before any stage ran.
    #[must_use]
    pub fn baseline(&self) -> &str {
        &self.baseline
    }

    /// The most recent text: the last checkpoint, or the baseline.
    #[must_use]
    pub fn latest_text(&self) -> &str {
        self.checkpoints
            .last()
            .map_or(self.baseline.as_str(), |cp| cp.text.as_str())
    }

    /// All checkpoints, oldest first.
    #[must_use]
    pub fn checkpoints(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    /// Number of checkpoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    /// Returns true if no stage has completed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }

    /// Finds the latest checkpoint whose text passes `is_clean`.
    ///
    /// Scans backwards from the last stage. Checkpoints whose text is
    /// identical to one already rejected are not re-checked.
    pub fn latest_clean<F>(&self, mut is_clean: F) -> Option<&Checkpoint>
    where
        F: FnMut(&str) -> bool,
    {
        let mut rejected: HashSet<&str> = HashSet::new();
        self.checkpoints.iter().rev().find(|&cp| {
            if rejected.contains(cp.fingerprint.as_str()) {
                return false;
            }
            if is_clean(&cp.text) {
                return true;
            }
            rejected.insert(cp.fingerprint.as_str());
            false
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger() -> CheckpointLedger {
        let mut ledger = CheckpointLedger::new("base");
        ledger.record(StageName::Typography, "one");
        ledger.record(StageName::Universal, "two");
        ledger.record(StageName::Naturalize, "three");
        ledger
    }

    #[test]
    fn test_latest_text() {
        let mut ledger = CheckpointLedger::new("base");
        assert_eq!(ledger.latest_text(), "base");
        assert!(ledger.is_empty());

        ledger.record(StageName::Typography, "typed");
        assert_eq!(ledger.latest_text(), "typed");
        assert_eq!(ledger.baseline(), "base");
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_latest_clean_scans_backwards() {
        let ledger = ledger();
        let mut seen = Vec::new();
        let found = ledger.latest_clean(|text| {
            seen.push(text.to_string());
            text == "one"
        });

        assert_eq!(found.map(|cp| cp.stage), Some(StageName::Typography));
        assert_eq!(seen, vec!["three", "two", "one"]);
    }

    #[test]
    fn test_latest_clean_returns_last_when_clean() {
        let ledger = ledger();
        let found = ledger.latest_clean(|_| true);
        assert_eq!(found.map(|cp| cp.stage), Some(StageName::Naturalize));
    }

    #[test]
    fn test_latest_clean_none() {
        assert!(ledger().latest_clean(|_| false).is_none());
    }

    #[test]
    fn test_identical_rejected_text_is_not_rechecked() {
        let mut ledger = CheckpointLedger::new("base");
        ledger.record(StageName::Typography, "same");
        ledger.record(StageName::Universal, "same");
        ledger.record(StageName::Readability, "same");

        let mut calls = 0;
        assert!(ledger
            .latest_clean(|_| {
                calls += 1;
                false
            })
            .is_none());
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_checkpoint_fingerprint() {
        let cp = Checkpoint::new(StageName::Typography, "abc");
        assert_eq!(cp.fingerprint, text::fingerprint("abc"));
    }
}
