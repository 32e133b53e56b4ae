//! Graduated retry: rerun the whole pipeline at reduced intensity when the
//! change-ratio bound is violated, keeping the best attempt.

use crate::config::RetrySettings;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Summary of one pipeline attempt, used to choose the winner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptSummary {
    /// Attempt number, 0 for the full-intensity run.
    pub attempt: usize,
    /// Intensity factor relative to the configured intensity.
    pub factor: f64,
    /// Intensity requested for this attempt.
    pub requested_intensity: u8,
    /// Intensity the stages actually ran at.
    pub effective_intensity: u8,
    /// Word-level change ratio of the attempt's final text.
    pub change_ratio: f64,
    /// Artificiality score of the final text, if measured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artificiality_after: Option<f64>,
    /// Critical validation errors left after rollback.
    pub critical_errors: usize,
    /// Whether the attempt took the fast path.
    #[serde(default)]
    pub fast_path: bool,
}

impl AttemptSummary {
    /// Returns true if the attempt satisfies the change-ratio bound.
    #[must_use]
    pub fn within_bound(&self, max_change_ratio: f64) -> bool {
        self.change_ratio <= max_change_ratio
    }

    /// Orders attempts by change ratio, then by artificiality when both
    /// were measured. `Less` is better.
    #[must_use]
    pub fn rank(&self, other: &Self) -> Ordering {
        self.change_ratio
            .total_cmp(&other.change_ratio)
            .then_with(|| match (self.artificiality_after, other.artificiality_after) {
                (Some(a), Some(b)) => a.total_cmp(&b),
                _ => Ordering::Equal,
            })
    }
}

/// The graduated retry policy.
#[derive(Debug, Clone)]
pub struct GraduatedRetry<'a> {
    settings: &'a RetrySettings,
}

impl<'a> GraduatedRetry<'a> {
    /// Creates a policy from settings.
    #[must_use]
    pub fn new(settings: &'a RetrySettings) -> Self {
        Self { settings }
    }

    /// `(factor, intensity)` for every reduced-intensity attempt, in order.
    #[must_use]
    pub fn schedule(&self, base_intensity: u8) -> Vec<(f64, u8)> {
        self.settings
            .factors
            .iter()
            .map(|&factor| (factor, scale(base_intensity, factor)))
            .collect()
    }

    /// Returns true if another attempt is needed after `latest`.
    #[must_use]
    pub fn needs_retry(&self, latest: &AttemptSummary, max_change_ratio: f64) -> bool {
        !latest.fast_path && !latest.within_bound(max_change_ratio)
    }

    /// Index of the winning attempt.
    ///
    /// Attempts with critical errors are only considered when every attempt
    /// has them. Among the rest, the first within the bound wins; otherwise
    /// the lowest change ratio, with artificiality breaking ties and
    /// remaining ties going to the earlier attempt.
    #[must_use]
    pub fn select(&self, attempts: &[AttemptSummary], max_change_ratio: f64) -> Option<usize> {
        let clean: Vec<usize> = (0..attempts.len())
            .filter(|&idx| attempts[idx].critical_errors == 0)
            .collect();
        let pool = if clean.is_empty() {
            (0..attempts.len()).collect()
        } else {
            clean
        };
        if let Some(&idx) = pool
            .iter()
            .find(|&&idx| attempts[idx].within_bound(max_change_ratio))
        {
            return Some(idx);
        }
        pool.into_iter()
            .min_by(|&a, &b| attempts[a].rank(&attempts[b]))
    }
}

fn scale(intensity: u8, factor: f64) -> u8 {
    let scaled = (f64::from(intensity) * factor).round().clamp(0.0, 100.0);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let value = scaled as u8;
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attempt(idx: usize, change_ratio: f64, artificiality: Option<f64>, critical: usize) -> AttemptSummary {
        AttemptSummary {
            attempt: idx,
            factor: 1.0,
            requested_intensity: 60,
            effective_intensity: 60,
            change_ratio,
            artificiality_after: artificiality,
            critical_errors: critical,
            fast_path: false,
        }
    }

    #[test]
    fn test_schedule() {
        let settings = RetrySettings::default();
        let retry = GraduatedRetry::new(&settings);
        assert_eq!(retry.schedule(60), vec![(0.4, 24), (0.15, 9)]);
        assert_eq!(retry.schedule(0), vec![(0.4, 0), (0.15, 0)]);
    }

    #[test]
    fn test_needs_retry() {
        let settings = RetrySettings::default();
        let retry = GraduatedRetry::new(&settings);
        assert!(retry.needs_retry(&attempt(0, 0.6, None, 0), 0.4));
        assert!(!retry.needs_retry(&attempt(0, 0.3, None, 0), 0.4));

        let mut fast = attempt(0, 0.6, None, 0);
        fast.fast_path = true;
        assert!(!retry.needs_retry(&fast, 0.4));
    }

    #[test]
    fn test_first_attempt_within_bound_wins() {
        let settings = RetrySettings::default();
        let retry = GraduatedRetry::new(&settings);
        let attempts = vec![attempt(0, 0.6, None, 0), attempt(1, 0.3, None, 0), attempt(2, 0.1, None, 0)];
        assert_eq!(retry.select(&attempts, 0.4), Some(1));
    }

    #[test]
    fn test_lowest_change_ratio_wins_when_none_fit() {
        let settings = RetrySettings::default();
        let retry = GraduatedRetry::new(&settings);
        let attempts = vec![attempt(0, 0.9, Some(30.0), 0), attempt(1, 0.7, Some(30.0), 0), attempt(2, 0.8, Some(30.0), 0)];
        assert_eq!(retry.select(&attempts, 0.4), Some(1));
    }

    #[test]
    fn test_artificiality_only_breaks_ties() {
        let settings = RetrySettings::default();
        let retry = GraduatedRetry::new(&settings);
        let attempts = vec![attempt(0, 0.525, Some(0.0), 0), attempt(1, 0.5, Some(45.0), 0)];
        assert_eq!(retry.select(&attempts, 0.4), Some(1));

        let tied = vec![attempt(0, 0.6, Some(50.0), 0), attempt(1, 0.6, Some(20.0), 0)];
        assert_eq!(retry.select(&tied, 0.4), Some(1));
    }

    #[test]
    fn test_critical_errors_disqualify() {
        let settings = RetrySettings::default();
        let retry = GraduatedRetry::new(&settings);
        let attempts = vec![attempt(0, 0.2, None, 1), attempt(1, 0.5, None, 2), attempt(2, 0.9, None, 0)];
        assert_eq!(retry.select(&attempts, 0.4), Some(2));

        let all_broken = vec![attempt(0, 0.8, None, 1), attempt(1, 0.6, None, 1)];
        assert_eq!(retry.select(&all_broken, 0.4), Some(1));
    }

    #[test]
    fn test_ties_go_to_earlier_attempt() {
        let settings = RetrySettings::default();
        let retry = GraduatedRetry::new(&settings);
        let attempts = vec![attempt(0, 0.7, None, 0), attempt(1, 0.7, None, 0)];
        assert_eq!(retry.select(&attempts, 0.4), Some(0));
        assert_eq!(retry.select(&[], 0.4), None);
    }
}
