//! Memoizing wrapper around a metrics oracle.

use super::MetricsOracle;
use crate::core::{text, TextMetrics};
use crate::errors::OracleError;
use dashmap::DashMap;

/// Caches successful `analyze` results per `(lang, sha256(text))`.
///
/// Safe to share between concurrent runs. Failures are never cached.
#[derive(Debug)]
pub struct CachedMetricsOracle<O> {
    inner: O,
    entries: DashMap<(String, String), TextMetrics>,
    capacity: usize,
}

impl<O: MetricsOracle> CachedMetricsOracle<O> {
    /// Default number of cached entries.
    pub const DEFAULT_CAPACITY: usize = 4096;

    /// Wraps `inner` with the default capacity.
    #[must_use]
    pub fn new(inner: O) -> Self {
        Self::with_capacity(inner, Self::DEFAULT_CAPACITY)
    }

    /// Wraps `inner`, keeping at most `capacity` entries.
    #[must_use]
    pub fn with_capacity(inner: O, capacity: usize) -> Self {
        Self {
            inner,
            entries: DashMap::new(),
            capacity,
        }
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops all cached entries.
    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl<O: MetricsOracle> MetricsOracle for CachedMetricsOracle<O> {
    fn analyze(&self, text: &str, lang: &str) -> Result<TextMetrics, OracleError> {
        let key = (lang.to_string(), text::fingerprint(text));
        if let Some(hit) = self.entries.get(&key) {
            return Ok(hit.clone());
        }

        let metrics = self.inner.analyze(text, lang)?;
        // Full cache: start over rather than track recency.
        if self.entries.len() >= self.capacity {
            self.entries.clear();
        }
        self.entries.insert(key, metrics.clone());
        Ok(metrics)
    }
}
