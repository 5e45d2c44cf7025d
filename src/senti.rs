use regex::Regex;
use validator::Validate;

use std::collections::{HashMap, HashSet};

use log::*;

use crate::classy::ClassifyError;
use crate::config::LexiconConfig;
use crate::Error;

const DEFAULT_LEXICON: &str = include_str!("lexicon.toml");

// Words, runs of `!`, and clause punctuation.
const TOKEN_PATTERN: &str = r"\p{Alphabetic}+(?:'\p{Alphabetic}+)*|!+|[.,;:?]+";

const NEGATION: f64 = -0.5;
const EXCLAMATION: f64 = 1.25;

/// Anything that can turn text into a polarity in [-1, 1].
pub trait Score: Send + Sync {
    fn score(&self, text: &str) -> Result<f64, ClassifyError>;
}

/// Lexicon based scorer.
///
/// The polarity is the mean over every sentiment word found. A negation flips
/// and halves the next sentiment word, an intensifier scales it, and a run of
/// `!` boosts the one before it. Clause punctuation clears pending modifiers.
pub struct Senti {
    tokens: Regex,
    negations: HashSet<String>,
    intensifiers: HashMap<String, f64>,
    words: HashMap<String, f64>,
}

impl Senti {
    pub fn new() -> Result<Self, Error> {
        Self::from_lexicon(Self::default_lexicon()?)
    }

    /// The built in lexicon with the file at `lexicon_path` merged on top.
    pub fn new_from_path(lexicon_path: &str) -> Result<Self, Error> {
        let mut lexicon = Self::default_lexicon()?;
        lexicon.merge(LexiconConfig::from_path(lexicon_path)?);
        debug!("Senti: Merged lexicon {}", lexicon_path);
        Self::from_lexicon(lexicon)
    }

    pub fn default_lexicon() -> Result<LexiconConfig, Error> {
        let lexicon: LexiconConfig = toml::from_str(DEFAULT_LEXICON)?;
        lexicon.validate()?;
        Ok(lexicon)
    }

    pub fn from_lexicon(lexicon: LexiconConfig) -> Result<Self, Error> {
        let lower = |(word, value): (String, f64)| (word.to_lowercase(), value);
        let senti = Self {
            tokens: Regex::new(TOKEN_PATTERN)?,
            negations: lexicon.negations.iter().map(|i| i.to_lowercase()).collect(),
            intensifiers: lexicon.intensifiers.into_iter().map(lower).collect(),
            words: lexicon.words.into_iter().map(lower).collect(),
        };
        debug!(
            "Senti: {} words, {} intensifiers, {} negations",
            senti.words.len(),
            senti.intensifiers.len(),
            senti.negations.len()
        );
        Ok(senti)
    }
}

impl Score for Senti {
    fn score(&self, text: &str) -> Result<f64, ClassifyError> {
        let text = text.to_lowercase().replace('\u{2019}', "'");

        let mut values: Vec<f64> = vec![];
        let mut negated = false;
        let mut intensity = 1.0;
        for token in self.tokens.find_iter(&text).map(|m| m.as_str()) {
            if token.starts_with('!') {
                if let Some(last) = values.last_mut() {
                    *last *= EXCLAMATION;
                }
                negated = false;
                intensity = 1.0;
            } else if !token.starts_with(char::is_alphabetic) {
                negated = false;
                intensity = 1.0;
            } else if self.negations.contains(token) {
                negated = true;
            } else if let Some(factor) = self.intensifiers.get(token) {
                intensity *= factor;
            } else if let Some(polarity) = self.words.get(token) {
                let mut value = polarity * intensity;
                if negated {
                    value *= NEGATION;
                }
                trace!("Senti: {} -> {}", token, value);
                values.push(value);
                negated = false;
                intensity = 1.0;
            }
        }

        if values.is_empty() {
            return Ok(0.0);
        }
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        Ok(mean.max(-1.0).min(1.0))
    }
}
