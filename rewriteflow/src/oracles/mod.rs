//! Interfaces of the external collaborators the orchestrator consumes.
//!
//! Scoring, span protection and watermark cleaning are implemented outside
//! this crate. Only the no-op implementations and the metrics cache live
//! here.

mod cache;

pub use cache::CachedMetricsOracle;

use crate::config::PreservationPolicy;
use crate::core::TextMetrics;
use crate::errors::OracleError;
use std::fmt::Debug;

/// Scores text for artificiality.
#[cfg_attr(test, mockall::automock)]
pub trait MetricsOracle: Send + Sync {
    /// Analyzes `text` written in `lang`.
    fn analyze(&self, text: &str, lang: &str) -> Result<TextMetrics, OracleError>;
}

/// Estimates language-model perplexity.
#[cfg_attr(test, mockall::automock)]
pub trait LanguageModelOracle: Send + Sync {
    /// Returns the perplexity of `text`.
    fn perplexity(&self, text: &str) -> Result<f64, OracleError>;
}

/// Text whose literal spans were replaced by placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProtectedText {
    /// Text with placeholders in place of protected spans.
    pub text: String,
    /// `(placeholder, original span)` pairs.
    pub spans: Vec<(String, String)>,
}

impl ProtectedText {
    /// Wraps text that needed no protection.
    #[must_use]
    pub fn unprotected(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            spans: Vec::new(),
        }
    }

    /// Puts the protected spans back into `text`.
    #[must_use]
    pub fn restore(&self, text: &str) -> String {
        self.spans
            .iter()
            .fold(text.to_string(), |acc, (placeholder, original)| {
                acc.replace(placeholder, original)
            })
    }
}

/// Shields literal spans (URLs, code, numbers) from the stages.
pub trait SpanProtector: Send + Sync + Debug {
    /// Replaces the spans selected by `policy` with placeholders.
    fn protect(&self, text: &str, policy: &PreservationPolicy) -> ProtectedText;
}

/// Leaves text untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpSpanProtector;

impl SpanProtector for NoOpSpanProtector {
    fn protect(&self, text: &str, _policy: &PreservationPolicy) -> ProtectedText {
        ProtectedText::unprotected(text)
    }
}

/// Outcome of watermark detection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WatermarkReport {
    /// Whether anything was found.
    pub has_watermarks: bool,
    /// Text with watermarks removed.
    pub cleaned_text: String,
    /// Kinds of watermark found (e.g. "zero_width", "homoglyph").
    pub kinds: Vec<String>,
}

impl WatermarkReport {
    /// A report for clean text.
    #[must_use]
    pub fn clean(text: impl Into<String>) -> Self {
        Self {
            has_watermarks: false,
            cleaned_text: text.into(),
            kinds: Vec::new(),
        }
    }
}

/// Detects and strips statistical or invisible watermarks.
pub trait WatermarkCleaner: Send + Sync + Debug {
    /// Inspects `text` and returns a cleaned copy.
    fn detect(&self, text: &str) -> WatermarkReport;
}

/// Reports every text as clean.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpWatermarkCleaner;

impl WatermarkCleaner for NoOpWatermarkCleaner {
    fn detect(&self, text: &str) -> WatermarkReport {
        WatermarkReport::clean(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protected_text_restore() {
        let protected = ProtectedText {
            text: "see \u{e000}0\u{e001} now".to_string(),
            spans: vec![("\u{e000}0\u{e001}".to_string(), "https://x.io".to_string())],
        };
        assert_eq!(
            protected.restore("look at \u{e000}0\u{e001} now"),
            "look at https://x.io now"
        );
    }

    #[test]
    fn test_noop_protector() {
        let protected = NoOpSpanProtector.protect("plain", &PreservationPolicy::default());
        assert_eq!(protected.text, "plain");
        assert_eq!(protected.restore("changed"), "changed");
    }

    #[test]
    fn test_noop_watermark_cleaner() {
        let report = NoOpWatermarkCleaner.detect("text");
        assert!(!report.has_watermarks);
        assert_eq!(report.cleaned_text, "text");
    }

    #[test]
    fn test_mocked_metrics_oracle() {
        let mut oracle = MockMetricsOracle::new();
        oracle
            .expect_analyze()
            .withf(|text, lang| text == "hello" && lang == "en")
            .times(1)
            .returning(|_, _| Ok(TextMetrics::new(33.0)));

        let metrics = oracle.analyze("hello", "en").unwrap();
        assert!((metrics.artificiality_score - 33.0).abs() < f64::EPSILON);
    }
}
