use serde::{Deserialize, Deserializer};
use validator::{ValidationError, Validate};
use validator_derive::Validate;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::Error;

#[derive(Debug, Deserialize, Validate, Clone)]
#[validate(schema(function = "ensure_threshold"))]
pub struct Config {
    #[serde(default, deserialize_with = "deserialize_threshold")]
    pub threshold: f64,

    #[serde(default = "default_debug")]
    pub debug: bool,

    #[serde(default = "default_color")]
    pub color: bool,

    #[serde(default)]
    #[validate(custom = "ensure_lexicon")]
    pub lexicon: Option<String>,

    #[serde(default = "default_examples")]
    #[validate(length(min = 1))]
    pub examples: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            threshold: 0.0,
            debug: default_debug(),
            color: default_color(),
            lexicon: None,
            examples: default_examples(),
        }
    }
}

impl Config {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let config: Config = toml::from_str(&std::fs::read_to_string(path)?)?;
        config.validate()?;
        Ok(config)
    }
}

fn default_debug() -> bool {
    false
}

fn default_color() -> bool {
    true
}

fn default_examples() -> Vec<String> {
    ["I love this!", "This is bad.", "Neutral feelings.", "Amazing!", "Not sure..."]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Thresholds move in steps of 0.01.
pub fn snap_threshold(threshold: f64) -> f64 {
    (threshold * 100.0).round() / 100.0 + 0.0
}

fn deserialize_threshold<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    f64::deserialize(deserializer).map(snap_threshold)
}

/// True when the value lies on the polarity scale [-1, 1]. NaN never does.
pub fn threshold_in_range(threshold: f64) -> bool {
    (-1.0..=1.0).contains(&threshold)
}

fn ensure_threshold(config: &Config) -> Result<(), ValidationError> {
    if threshold_in_range(config.threshold) {
        Ok(())
    } else {
        Err(ValidationError::new("Threshold must be between -1.0 and 1.0"))
    }
}

fn ensure_lexicon(lexicon: &str) -> Result<(), ValidationError> {
    if PathBuf::from(&lexicon).exists() {
        Ok(())
    } else {
        Err(ValidationError::new("Lexicon file missing"))
    }
}

/// Word lists used by the lexicon scorer. The same format serves the built in
/// lexicon and any user lexicon merged on top of it.
#[derive(Debug, Deserialize, Validate, Clone, Default)]
#[validate(schema(function = "ensure_lexicon_values"))]
pub struct LexiconConfig {
    #[serde(default)]
    pub negations: Vec<String>,

    #[serde(default)]
    pub intensifiers: HashMap<String, f64>,

    #[serde(default)]
    pub words: HashMap<String, f64>,
}

impl LexiconConfig {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let lexicon: LexiconConfig = toml::from_str(&std::fs::read_to_string(path)?)?;
        lexicon.validate()?;
        Ok(lexicon)
    }

    /// Entries from `other` win over ours.
    pub fn merge(&mut self, other: LexiconConfig) {
        for negation in other.negations {
            if !self.negations.contains(&negation) {
                self.negations.push(negation);
            }
        }
        self.intensifiers.extend(other.intensifiers);
        self.words.extend(other.words);
    }
}

fn ensure_lexicon_values(lexicon: &LexiconConfig) -> Result<(), ValidationError> {
    if lexicon.words.values().any(|polarity| !threshold_in_range(*polarity)) {
        Err(ValidationError::new("Word polarity must be between -1.0 and 1.0"))
    } else if lexicon
        .intensifiers
        .values()
        .any(|factor| !(factor.is_finite() && *factor > 0.0))
    {
        Err(ValidationError::new("Intensifier factor must be positive"))
    } else {
        Ok(())
    }
}
