//! The closed, ordered enumeration of pipeline stages.

use crate::errors::RewriteflowError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identity of a pipeline stage.
///
/// Declaration order is execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageName {
    /// Typography normalization (quotes, dashes, spacing). Not semantic.
    Typography,
    /// Replacing bureaucratic and officialese phrasing.
    Debureaucratize,
    /// Breaking up formulaic sentence structure.
    Structure,
    /// Reducing lexical repetition.
    Repetitions,
    /// Injecting conversational liveliness.
    Liveliness,
    /// Sentence-level paraphrasing.
    Paraphrase,
    /// Harmonizing tone against the profile.
    ToneHarmonize,
    /// Language-independent statistical rewriting.
    Universal,
    /// The broadest rewrite policy; guarded by the perplexity gate.
    Naturalize,
    /// Readability shaping (sentence length variance).
    Readability,
    /// Grammar polish.
    GrammarPolish,
    /// Repairing paragraph coherence.
    CoherenceRepair,
}

impl StageName {
    /// All stages in execution order.
    pub const ALL: [Self; 12] = [
        Self::Typography,
        Self::Debureaucratize,
        Self::Structure,
        Self::Repetitions,
        Self::Liveliness,
        Self::Paraphrase,
        Self::ToneHarmonize,
        Self::Universal,
        Self::Naturalize,
        Self::Readability,
        Self::GrammarPolish,
        Self::CoherenceRepair,
    ];

    /// Returns the canonical snake_case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Typography => "typography",
            Self::Debureaucratize => "debureaucratize",
            Self::Structure => "structure",
            Self::Repetitions => "repetitions",
            Self::Liveliness => "liveliness",
            Self::Paraphrase => "paraphrase",
            Self::ToneHarmonize => "tone_harmonize",
            Self::Universal => "universal",
            Self::Naturalize => "naturalize",
            Self::Readability => "readability",
            Self::GrammarPolish => "grammar_polish",
            Self::CoherenceRepair => "coherence_repair",
        }
    }

    /// Position of the stage in the execution order.
    #[must_use]
    pub fn position(self) -> usize {
        Self::ALL.iter().position(|s| *s == self).unwrap_or(0)
    }

    /// Returns true for stages that need per-language dictionaries.
    ///
    /// These form a single capability group that is skipped as a block.
    #[must_use]
    pub const fn requires_language_resources(self) -> bool {
        matches!(
            self,
            Self::Debureaucratize
                | Self::Structure
                | Self::Repetitions
                | Self::Liveliness
                | Self::Paraphrase
        )
    }

    /// Returns true for stages that rewrite meaning-bearing text.
    ///
    /// The fast path runs only the non-semantic stages.
    #[must_use]
    pub const fn is_semantic(self) -> bool {
        !matches!(self, Self::Typography)
    }

    /// Returns true for the stage guarded by the perplexity gate.
    #[must_use]
    pub const fn is_gated_by_perplexity(self) -> bool {
        matches!(self, Self::Naturalize)
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StageName {
    type Err = RewriteflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        let stage = match normalized.as_str() {
            "typography" => Self::Typography,
            "debureaucratize" | "debureaucratization" => Self::Debureaucratize,
            "structure" => Self::Structure,
            "repetitions" => Self::Repetitions,
            "liveliness" => Self::Liveliness,
            "paraphrase" | "paraphrasing" => Self::Paraphrase,
            "tone_harmonize" | "tone" => Self::ToneHarmonize,
            "universal" => Self::Universal,
            "naturalize" | "naturalization" => Self::Naturalize,
            "readability" => Self::Readability,
            "grammar_polish" | "grammar" => Self::GrammarPolish,
            "coherence_repair" | "coherence" => Self::CoherenceRepair,
            _ => return Err(RewriteflowError::unknown_stage(s)),
        };
        Ok(stage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_is_in_declaration_order() {
        let mut sorted = StageName::ALL;
        sorted.sort();
        assert_eq!(sorted, StageName::ALL);
        assert_eq!(StageName::Typography.position(), 0);
        assert_eq!(StageName::CoherenceRepair.position(), 11);
    }

    #[test]
    fn test_display_roundtrips_through_from_str() {
        for stage in StageName::ALL {
            assert_eq!(stage.to_string().parse::<StageName>().unwrap(), stage);
        }
    }

    #[test]
    fn test_aliases() {
        assert_eq!("grammar".parse::<StageName>().unwrap(), StageName::GrammarPolish);
        assert_eq!("Naturalization".parse::<StageName>().unwrap(), StageName::Naturalize);
        assert_eq!("tone-harmonize".parse::<StageName>().unwrap(), StageName::ToneHarmonize);
    }

    #[test]
    fn test_unknown_name_is_rejected() {
        let err = "spellcheck".parse::<StageName>().unwrap_err();
        assert!(matches!(err, RewriteflowError::UnknownStage { .. }));
    }

    #[test]
    fn test_capability_group() {
        let gated: Vec<_> = StageName::ALL
            .into_iter()
            .filter(|s| s.requires_language_resources())
            .collect();
        assert_eq!(gated.len(), 5);
        assert!(!StageName::ToneHarmonize.requires_language_resources());
        assert!(!StageName::Naturalize.requires_language_resources());
        assert!(!StageName::CoherenceRepair.requires_language_resources());
    }

    #[test]
    fn test_serde_snake_case() {
        let json = serde_json::to_string(&StageName::GrammarPolish).unwrap();
        assert_eq!(json, "\"grammar_polish\"");
    }
}
