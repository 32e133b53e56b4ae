//! Capability predicates for language-dependent stage groups.

use std::collections::BTreeSet;
use std::fmt::Debug;

/// Answers whether a language has the dictionaries the gated stage group needs.
pub trait LanguageCapabilities: Send + Sync + Debug {
    /// Returns true if `lang` has full linguistic resources.
    fn has_resources(&self, lang: &str) -> bool;
}

/// A fixed set of supported languages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticCapabilities {
    languages: BTreeSet<String>,
}

impl StaticCapabilities {
    /// Languages with bundled dictionaries by default.
    pub const DEFAULT_LANGUAGES: [&'static str; 9] =
        ["en", "ru", "uk", "de", "fr", "es", "it", "pl", "pt"];

    /// Creates a capability set from language codes.
    pub fn new<I, S>(languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            languages: languages
                .into_iter()
                .map(|l| l.into().to_ascii_lowercase())
                .collect(),
        }
    }

    /// Adds a language.
    #[must_use]
    pub fn with_language(mut self, lang: impl Into<String>) -> Self {
        self.languages.insert(lang.into().to_ascii_lowercase());
        self
    }
}

impl Default for StaticCapabilities {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LANGUAGES)
    }
}

impl LanguageCapabilities for StaticCapabilities {
    fn has_resources(&self, lang: &str) -> bool {
        let lang = lang.to_ascii_lowercase();
        // "en-US" resolves to "en".
        let primary = lang.split(['-', '_']).next().unwrap_or_default();
        self.languages.contains(&lang) || self.languages.contains(primary)
    }
}

/// Treats every language as fully supported.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllLanguages;

impl LanguageCapabilities for AllLanguages {
    fn has_resources(&self, _lang: &str) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_languages() {
        let caps = StaticCapabilities::default();
        assert!(caps.has_resources("en"));
        assert!(caps.has_resources("RU"));
        assert!(!caps.has_resources("ja"));
    }

    #[test]
    fn test_region_subtag_resolves() {
        let caps = StaticCapabilities::default();
        assert!(caps.has_resources("en-US"));
        assert!(caps.has_resources("pt_BR"));
    }

    #[test]
    fn test_custom_set() {
        let caps = StaticCapabilities::new(["xx"]).with_language("YY");
        assert!(caps.has_resources("xx"));
        assert!(caps.has_resources("yy"));
        assert!(!caps.has_resources("en"));
    }

    #[test]
    fn test_all_languages() {
        assert!(AllLanguages.has_resources("zz"));
    }
}
