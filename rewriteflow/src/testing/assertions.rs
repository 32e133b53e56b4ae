//! Test assertions for pipeline results.

use crate::pipeline::PipelineResult;

/// Asserts that at least one change record has `kind`.
pub fn assert_has_change(result: &PipelineResult, kind: &str) {
    assert!(
        result.changes.iter().any(|c| c.kind == kind),
        "Expected a '{}' change record, got kinds: {:?}",
        kind,
        result.changes.iter().map(|c| c.kind.as_str()).collect::<Vec<_>>()
    );
}

/// Asserts that no change record has `kind`.
pub fn assert_no_change(result: &PipelineResult, kind: &str) {
    let found: Vec<_> = result.changes.iter().filter(|c| c.kind == kind).collect();
    assert!(found.is_empty(), "Expected no '{kind}' change record, found {found:?}");
}

/// Asserts that exactly `expected` change records have `kind`.
pub fn assert_change_count(result: &PipelineResult, kind: &str, expected: usize) {
    let actual = result.changes.iter().filter(|c| c.kind == kind).count();
    assert_eq!(
        actual, expected,
        "Expected {expected} '{kind}' change records, got {actual}"
    );
}

/// Asserts that the returned text equals the input.
pub fn assert_untouched(result: &PipelineResult) {
    assert_eq!(
        result.text, result.original,
        "Expected the input to be returned unchanged"
    );
}
