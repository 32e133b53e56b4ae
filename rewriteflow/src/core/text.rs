//! Word-level text helpers shared by the validator and the ledger.

use regex::Regex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::OnceLock;

#[allow(clippy::expect_used)]
fn word_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\w+(?:['’-]\w+)*").expect("word pattern compiles"))
}

#[allow(clippy::expect_used)]
fn number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\d+(?:[.,]\d+)*").expect("number pattern compiles"))
}

/// Splits text into lowercase words.
#[must_use]
pub fn words(text: &str) -> Vec<String> {
    word_pattern()
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

/// Returns true if the words of `phrase` occur contiguously in `text`.
///
/// Matching is whole-word and case-sensitive: "Acme" is not found in
/// "Acmeville" or "ACME".
#[must_use]
pub fn contains_phrase(text: &str, phrase: &str) -> bool {
    let needle: Vec<&str> = word_pattern().find_iter(phrase).map(|m| m.as_str()).collect();
    if needle.is_empty() {
        return false;
    }
    let haystack: Vec<&str> = word_pattern().find_iter(text).map(|m| m.as_str()).collect();
    haystack.windows(needle.len()).any(|window| window == needle.as_slice())
}

/// Extracts numeric literals, sorted, so two texts can be compared as multisets.
#[must_use]
pub fn numbers(text: &str) -> Vec<String> {
    let mut found: Vec<String> = number_pattern()
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect();
    found.sort();
    found
}

/// Largest `|a|·|b|` table the exact LCS is computed over.
pub const LCS_CELL_BUDGET: usize = 1_000_000;

/// Word-level change ratio between two texts, 0.0 (identical) to 1.0 (disjoint).
///
/// Defined as `1 - 2·M / (|a| + |b|)` over lowercase word sequences, where
/// `M` is the number of matched words. Common leading and trailing runs
/// always match. The differing middle is matched by exact LCS when it fits
/// in [`LCS_CELL_BUDGET`], otherwise by multiset overlap, which ignores
/// word order and so never reports more change than LCS would.
#[must_use]
pub fn change_ratio(original: &str, candidate: &str) -> f64 {
    let a = words(original);
    let b = words(candidate);
    let total = a.len() + b.len();
    if total == 0 {
        return 0.0;
    }
    let matched = matched_words(&a, &b);
    1.0 - (2.0 * matched as f64) / total as f64
}

fn matched_words(a: &[String], b: &[String]) -> usize {
    let prefix = a.iter().zip(b).take_while(|(x, y)| x == y).count();
    let (a, b) = (&a[prefix..], &b[prefix..]);
    let suffix = a
        .iter()
        .rev()
        .zip(b.iter().rev())
        .take_while(|(x, y)| x == y)
        .count();
    let (a, b) = (&a[..a.len() - suffix], &b[..b.len() - suffix]);

    let middle = if a.len().saturating_mul(b.len()) <= LCS_CELL_BUDGET {
        lcs_len(a, b)
    } else {
        overlap_len(a, b)
    };
    prefix + suffix + middle
}

fn lcs_len(a: &[String], b: &[String]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for x in a {
        for (j, y) in b.iter().enumerate() {
            curr[j + 1] = if x == y {
                prev[j] + 1
            } else {
                curr[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

fn overlap_len(a: &[String], b: &[String]) -> usize {
    let mut counts: HashMap<&str, usize> = HashMap::with_capacity(a.len());
    for word in a {
        *counts.entry(word.as_str()).or_default() += 1;
    }
    b.iter()
        .filter(|word| match counts.get_mut(word.as_str()) {
            Some(n) if *n > 0 => {
                *n -= 1;
                true
            }
            _ => false,
        })
        .count()
}

/// Hex SHA-256 digest of a text.
#[must_use]
pub fn fingerprint(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}
