//! Style profiles.

use crate::errors::RewriteflowError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The target register of the rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Profile {
    /// Casual chat messages.
    Chat,
    /// General web content.
    #[default]
    Web,
    /// Search-optimized copy.
    Seo,
    /// Technical documentation.
    Docs,
    /// Formal correspondence.
    Formal,
    /// Academic prose.
    Academic,
    /// Marketing copy.
    Marketing,
    /// Social media posts.
    Social,
    /// E-mail.
    Email,
}

impl Profile {
    /// All profiles.
    pub const ALL: [Self; 9] = [
        Self::Chat,
        Self::Web,
        Self::Seo,
        Self::Docs,
        Self::Formal,
        Self::Academic,
        Self::Marketing,
        Self::Social,
        Self::Email,
    ];

    /// Returns the canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Web => "web",
            Self::Seo => "seo",
            Self::Docs => "docs",
            Self::Formal => "formal",
            Self::Academic => "academic",
            Self::Marketing => "marketing",
            Self::Social => "social",
            Self::Email => "email",
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Profile {
    type Err = RewriteflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == lowered)
            .ok_or_else(|| RewriteflowError::invalid_profile(s))
    }
}
