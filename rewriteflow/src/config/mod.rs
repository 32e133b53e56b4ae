//! Per-run pipeline configuration.
//!
//! A [`PipelineConfig`] is created once per invocation and never mutated
//! while a run is in progress. It can be built in code with the `with_*`
//! methods or loaded from JSON.

mod profile;
mod settings;

pub use profile::Profile;
pub use settings::{GateSettings, RetrySettings, ValidatorSettings};

use crate::errors::{Result, RewriteflowError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Which literal spans the span protector must leave untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreservationPolicy {
    /// Fenced and inline code.
    #[serde(default = "default_true")]
    pub code_blocks: bool,
    /// URLs.
    #[serde(default = "default_true")]
    pub urls: bool,
    /// E-mail addresses.
    #[serde(default = "default_true")]
    pub emails: bool,
    /// Hashtags.
    #[serde(default = "default_true")]
    pub hashtags: bool,
    /// @-mentions.
    #[serde(default = "default_true")]
    pub mentions: bool,
    /// Markdown markup.
    #[serde(default = "default_true")]
    pub markdown: bool,
    /// HTML tags.
    #[serde(default = "default_true")]
    pub html: bool,
    /// Numbers.
    #[serde(default)]
    pub numbers: bool,
    /// Additional literal terms (brand names, product names).
    #[serde(default)]
    pub brand_terms: Vec<String>,
}

fn default_true() -> bool {
    true
}

impl Default for PreservationPolicy {
    fn default() -> Self {
        Self {
            code_blocks: true,
            urls: true,
            emails: true,
            hashtags: true,
            mentions: true,
            markdown: true,
            html: true,
            numbers: false,
            brand_terms: Vec::new(),
        }
    }
}

/// Hard and soft output constraints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
    /// Soft bound on the word-level change ratio; exceeding it triggers graduated retry.
    #[serde(default = "default_max_change_ratio")]
    pub max_change_ratio: f64,
    /// Words that must survive the rewrite if present in the input.
    #[serde(default)]
    pub keep_keywords: Vec<String>,
}

fn default_max_change_ratio() -> f64 {
    0.4
}

impl Default for Constraints {
    fn default() -> Self {
        Self {
            max_change_ratio: default_max_change_ratio(),
            keep_keywords: Vec::new(),
        }
    }
}

/// A target style that stages may steer towards.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StyleFingerprint {
    /// Mean sentence length in words.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_sentence_length: Option<f64>,
    /// Type/token ratio.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vocabulary_richness: Option<f64>,
    /// Further style dimensions.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub features: HashMap<String, f64>,
}

/// Immutable configuration of one pipeline invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Language code (e.g. "en").
    pub lang: String,
    /// Style profile.
    #[serde(default)]
    pub profile: Profile,
    /// Requested intensity, 0–100.
    #[serde(default = "default_intensity")]
    pub intensity: u8,
    /// Seed for all randomized stage decisions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Spans to protect from rewriting.
    #[serde(default)]
    pub preservation: PreservationPolicy,
    /// Output constraints.
    #[serde(default)]
    pub constraints: Constraints,
    /// Optional target style.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_style: Option<StyleFingerprint>,
    /// Literal substitutions stages should apply verbatim.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub substitutions: BTreeMap<String, String>,
    /// Perplexity gate tunables.
    #[serde(default)]
    pub gate: GateSettings,
    /// Validator tunables.
    #[serde(default)]
    pub validator: ValidatorSettings,
    /// Graduated retry tunables.
    #[serde(default)]
    pub retry: RetrySettings,
}

fn default_intensity() -> u8 {
    60
}

impl PipelineConfig {
    /// Creates a configuration for `lang` with default settings.
    #[must_use]
    pub fn new(lang: impl Into<String>) -> Self {
        Self {
            lang: lang.into(),
            profile: Profile::default(),
            intensity: default_intensity(),
            seed: None,
            preservation: PreservationPolicy::default(),
            constraints: Constraints::default(),
            target_style: None,
            substitutions: BTreeMap::new(),
            gate: GateSettings::default(),
            validator: ValidatorSettings::default(),
            retry: RetrySettings::default(),
        }
    }

    /// Sets the profile.
    #[must_use]
    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.profile = profile;
        self
    }

    /// Sets the profile by name.
    pub fn with_profile_name(mut self, name: &str) -> Result<Self> {
        self.profile = name.parse()?;
        Ok(self)
    }

    /// Sets the intensity.
    #[must_use]
    pub fn with_intensity(mut self, intensity: u8) -> Self {
        self.intensity = intensity;
        self
    }

    /// Sets the seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets the preservation policy.
    #[must_use]
    pub fn with_preservation(mut self, preservation: PreservationPolicy) -> Self {
        self.preservation = preservation;
        self
    }

    /// Sets the maximum change ratio.
    #[must_use]
    pub fn with_max_change_ratio(mut self, ratio: f64) -> Self {
        self.constraints.max_change_ratio = ratio;
        self
    }

    /// Adds a keyword that must survive the rewrite.
    #[must_use]
    pub fn with_keep_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.constraints.keep_keywords.push(keyword.into());
        self
    }

    /// Sets the target style.
    #[must_use]
    pub fn with_target_style(mut self, style: StyleFingerprint) -> Self {
        self.target_style = Some(style);
        self
    }

    /// Adds a literal substitution.
    #[must_use]
    pub fn with_substitution(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.substitutions.insert(from.into(), to.into());
        self
    }

    /// Sets the gate settings.
    #[must_use]
    pub fn with_gate(mut self, gate: GateSettings) -> Self {
        self.gate = gate;
        self
    }

    /// Sets the validator settings.
    #[must_use]
    pub fn with_validator(mut self, validator: ValidatorSettings) -> Self {
        self.validator = validator;
        self
    }

    /// Sets the retry settings.
    #[must_use]
    pub fn with_retry(mut self, retry: RetrySettings) -> Self {
        self.retry = retry;
        self
    }

    /// Parses and validates a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Checks every field that could only be wrong through programmer error.
    pub fn validate(&self) -> Result<()> {
        if self.intensity > 100 {
            return Err(RewriteflowError::InvalidIntensity {
                value: i64::from(self.intensity),
            });
        }
        if self.lang.trim().is_empty() {
            return Err(RewriteflowError::InvalidConstraint(
                "language code must not be empty".to_string(),
            ));
        }
        let ratio = self.constraints.max_change_ratio;
        if !(ratio > 0.0 && ratio <= 1.0) {
            return Err(RewriteflowError::InvalidConstraint(format!(
                "max_change_ratio must be in (0, 1], got {ratio}"
            )));
        }
        if self.constraints.keep_keywords.iter().any(|k| k.trim().is_empty()) {
            return Err(RewriteflowError::InvalidConstraint(
                "keep_keywords must not contain blank entries".to_string(),
            ));
        }
        if !(self.gate.max_perplexity_drop > 0.0 && self.gate.max_perplexity_drop < 1.0) {
            return Err(RewriteflowError::InvalidConstraint(format!(
                "max_perplexity_drop must be in (0, 1), got {}",
                self.gate.max_perplexity_drop
            )));
        }
        if self.validator.min_length_ratio >= self.validator.max_length_ratio {
            return Err(RewriteflowError::InvalidConstraint(
                "min_length_ratio must be below max_length_ratio".to_string(),
            ));
        }
        if let Some(factor) = self
            .retry
            .factors
            .iter()
            .find(|f| !(**f > 0.0 && **f < 1.0))
        {
            return Err(RewriteflowError::InvalidConstraint(format!(
                "retry factors must be in (0, 1), got {factor}"
            )));
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::new("en")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builder() {
        let config = PipelineConfig::new("de")
            .with_profile(Profile::Formal)
            .with_intensity(80)
            .with_seed(7)
            .with_keep_keyword("Acme")
            .with_substitution("utilize", "use");

        assert_eq!(config.lang, "de");
        assert_eq!(config.profile, Profile::Formal);
        assert_eq!(config.intensity, 80);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.constraints.keep_keywords, vec!["Acme".to_string()]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_out_of_range_intensity() {
        let err = PipelineConfig::new("en").with_intensity(101).validate().unwrap_err();
        assert!(matches!(err, RewriteflowError::InvalidIntensity { value: 101 }));
    }

    #[test]
    fn test_invalid_profile_name() {
        let err = PipelineConfig::new("en").with_profile_name("pirate").unwrap_err();
        assert!(matches!(err, RewriteflowError::InvalidProfile { .. }));
    }

    #[test]
    fn test_invalid_change_ratio() {
        let err = PipelineConfig::new("en").with_max_change_ratio(0.0).validate().unwrap_err();
        assert!(matches!(err, RewriteflowError::InvalidConstraint(_)));
    }

    #[test]
    fn test_invalid_retry_factor() {
        let config = PipelineConfig::new("en")
            .with_retry(RetrySettings::default().with_factors(vec![0.5, 1.5]));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_json_str_defaults() {
        let config = PipelineConfig::from_json_str(r#"{"lang": "en", "profile": "docs"}"#).unwrap();
        assert_eq!(config.profile, Profile::Docs);
        assert_eq!(config.intensity, 60);
        assert!(config.preservation.urls);
        assert!(!config.preservation.numbers);
    }

    #[test]
    fn test_from_json_str_rejects_unknown_profile() {
        let err = PipelineConfig::from_json_str(r#"{"lang": "en", "profile": "pirate"}"#).unwrap_err();
        assert!(matches!(err, RewriteflowError::Config(_)));
    }

    #[test]
    fn test_from_json_str_rejects_intensity() {
        let err = PipelineConfig::from_json_str(r#"{"lang": "en", "intensity": 150}"#).unwrap_err();
        assert!(matches!(err, RewriteflowError::InvalidIntensity { value: 150 }));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"lang": "ru", "intensity": 40, "constraints": {{"max_change_ratio": 0.25, "keep_keywords": ["Acme"]}}}}"#
        )
        .unwrap();

        let config = PipelineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.lang, "ru");
        assert_eq!(config.intensity, 40);
        assert!((config.constraints.max_change_ratio - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_from_missing_file() {
        let err = PipelineConfig::from_file("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, RewriteflowError::Config(_)));
    }

    #[test]
    fn test_serde_roundtrip_preserves_config() {
        let config = PipelineConfig::new("en").with_seed(3).with_intensity(20);
        let json = serde_json::to_string(&config).unwrap();
        let back: PipelineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }
}
