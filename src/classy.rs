use err_derive::Error;

use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use log::*;

use crate::senti::Score;

/// Upper bound on threads used by one batch.
pub const MAX_WORKERS: usize = 8;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ClassifyError {
    #[error(display = "Text is not valid UTF-8 after byte {}", valid_up_to)]
    UnsupportedEncoding { valid_up_to: usize },
    #[error(display = "Scorer gave a polarity that is not a number: {}", _0)]
    InvalidPolarity(f64),
    #[error(display = "Scorer failed: {}", _0)]
    Scorer(String),
    #[error(display = "Classification panicked")]
    Panicked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Label {
    Positive,
    Negative,
    Neutral,
}

impl Label {
    /// Positive wins ties at the threshold and is checked first. Below the
    /// threshold only a negative polarity is Negative, which leaves
    /// `[0, threshold)` as Neutral.
    pub fn from_polarity(polarity: f64, threshold: f64) -> Self {
        if polarity >= threshold {
            Label::Positive
        } else if polarity < 0.0 {
            Label::Negative
        } else {
            Label::Neutral
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Label::Positive => "Positive",
            Label::Negative => "Negative",
            Label::Neutral => "Neutral",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Assessment {
    pub polarity: f64,
    pub label: Label,
}

pub struct Classy<S> {
    scorer: S,
}

impl<S: Score> Classy<S> {
    pub fn new(scorer: S) -> Self {
        Self { scorer }
    }

    pub fn classify(&self, input: &str, threshold: f64) -> Result<Assessment, ClassifyError> {
        let polarity = self.scorer.score(input)?;
        if !polarity.is_finite() {
            return Err(ClassifyError::InvalidPolarity(polarity));
        }
        let label = Label::from_polarity(polarity, threshold);
        trace!("Classy: {:.4} @ {:.2} -> {}", polarity, threshold, label);
        Ok(Assessment { polarity, label })
    }

    pub fn classify_bytes(&self, input: &[u8], threshold: f64) -> Result<Assessment, ClassifyError> {
        match std::str::from_utf8(input) {
            Ok(text) => self.classify(text, threshold),
            Err(e) => Err(ClassifyError::UnsupportedEncoding {
                valid_up_to: e.valid_up_to(),
            }),
        }
    }

    /// Like `classify_bytes`, but a panicking scorer becomes `Panicked`.
    pub fn classify_guarded(&self, input: &[u8], threshold: f64) -> Result<Assessment, ClassifyError> {
        panic::catch_unwind(AssertUnwindSafe(|| self.classify_bytes(input, threshold)))
            .unwrap_or_else(|_| {
                error!("Classy: Scorer panicked");
                Err(ClassifyError::Panicked)
            })
    }

    /// Splits the inputs over at most `MAX_WORKERS` scoped threads. Outcomes
    /// come back in input order.
    pub fn classify_all(
        &self,
        inputs: &[Vec<u8>],
        threshold: f64,
    ) -> Vec<Result<Assessment, ClassifyError>> {
        if inputs.len() < 2 {
            return inputs
                .iter()
                .map(|input| self.classify_guarded(input, threshold))
                .collect();
        }

        let chunk_size = (inputs.len() + MAX_WORKERS - 1) / MAX_WORKERS;
        let outcomes = crossbeam::scope(|s| {
            let handles: Vec<_> = inputs
                .chunks(chunk_size)
                .map(|chunk| {
                    let handle = s.spawn(move |_| {
                        chunk
                            .iter()
                            .map(|input| self.classify_guarded(input, threshold))
                            .collect::<Vec<_>>()
                    });
                    (chunk.len(), handle)
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|(len, handle)| {
                    handle
                        .join()
                        .unwrap_or_else(|_| vec![Err(ClassifyError::Panicked); len])
                })
                .collect::<Vec<_>>()
        });
        outcomes.unwrap_or_else(|_| {
            error!("Classy: Batch of {} panicked", inputs.len());
            vec![Err(ClassifyError::Panicked); inputs.len()]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;

    /// Looks the whole text up in a table.
    struct TableScorer(HashMap<&'static str, f64>);

    impl TableScorer {
        fn dashboard() -> Self {
            let mut table = HashMap::new();
            table.insert("I love this!", 0.5);
            table.insert("This is bad.", -0.6);
            table.insert("Neutral feelings.", 0.0);
            table.insert("Not sure...", 0.1);
            table.insert("Broken", f64::NAN);
            Self(table)
        }
    }

    impl Score for TableScorer {
        fn score(&self, text: &str) -> Result<f64, ClassifyError> {
            self.0
                .get(text)
                .copied()
                .ok_or_else(|| ClassifyError::Scorer(format!("unknown text {:?}", text)))
        }
    }

    #[test]
    fn positive_when_at_or_above_threshold() {
        for &(polarity, threshold) in &[(0.5, 0.0), (-0.3, -0.5), (0.2, 0.2), (-1.0, -1.0), (1.0, 0.99)] {
            assert_eq!(Label::from_polarity(polarity, threshold), Label::Positive);
        }
    }

    #[test]
    fn negative_below_zero_and_threshold() {
        for &(polarity, threshold) in &[(-0.1, 0.0), (-0.6, -0.5), (-0.01, 0.8), (-1.0, 1.0)] {
            assert_eq!(Label::from_polarity(polarity, threshold), Label::Negative);
        }
    }

    #[test]
    fn neutral_band_only_for_positive_thresholds() {
        for &(polarity, threshold) in &[(0.0, 0.01), (0.1, 0.2), (0.99, 1.0)] {
            assert_eq!(Label::from_polarity(polarity, threshold), Label::Neutral);
        }
        for &threshold in &[-1.0, -0.5, 0.0] {
            for &polarity in &[-1.0, -0.5, -0.01, 0.0, 0.5, 1.0] {
                assert_ne!(Label::from_polarity(polarity, threshold), Label::Neutral);
            }
        }
    }

    #[test]
    fn dashboard_scenarios() -> anyhow::Result<()> {
        let classy = Classy::new(TableScorer::dashboard());

        let cases = [
            ("I love this!", 0.0, 0.5, Label::Positive),
            ("This is bad.", 0.0, -0.6, Label::Negative),
            ("Neutral feelings.", 0.0, 0.0, Label::Positive),
            ("Not sure...", 0.2, 0.1, Label::Neutral),
        ];
        for &(text, threshold, polarity, label) in &cases {
            let assessment = classy.classify(text, threshold)?;
            assert_eq!(assessment, Assessment { polarity, label }, "{}", text);
        }
        Ok(())
    }

    #[test]
    fn repeated_calls_agree() -> anyhow::Result<()> {
        let classy = Classy::new(TableScorer::dashboard());
        let first = classy.classify("Not sure...", 0.2)?;
        for _ in 0..10 {
            assert_eq!(classy.classify("Not sure...", 0.2)?, first);
        }
        Ok(())
    }

    #[test]
    fn scorer_failure_is_reported() {
        let classy = Classy::new(TableScorer::dashboard());
        assert_eq!(
            classy.classify("Who knows", 0.0),
            Err(ClassifyError::Scorer("unknown text \"Who knows\"".to_string()))
        );
    }

    #[test]
    fn non_finite_polarity_is_rejected() {
        let classy = Classy::new(TableScorer::dashboard());
        match classy.classify("Broken", 0.0) {
            Err(ClassifyError::InvalidPolarity(p)) => assert!(p.is_nan()),
            other => panic!("Expected InvalidPolarity, got {:?}", other),
        }
    }

    #[test]
    fn invalid_utf8_is_unsupported_encoding() {
        let classy = Classy::new(TableScorer::dashboard());
        assert_eq!(
            classy.classify_bytes(b"ok \xff\xfe", 0.0),
            Err(ClassifyError::UnsupportedEncoding { valid_up_to: 3 })
        );
        assert!(classy.classify_bytes(b"I love this!", 0.0).is_ok());
    }

    #[test]
    fn batch_keeps_input_order() {
        let classy = Classy::new(TableScorer::dashboard());
        let inputs: Vec<Vec<u8>> = vec![
            b"This is bad.".to_vec(),
            b"I love this!".to_vec(),
            b"\xc3".to_vec(),
            b"Not sure...".to_vec(),
        ];
        let outcomes = classy.classify_all(&inputs, 0.2);
        assert_eq!(outcomes.len(), 4);
        assert_eq!(outcomes[0].as_ref().map(|a| a.label), Ok(Label::Negative));
        assert_eq!(outcomes[1].as_ref().map(|a| a.label), Ok(Label::Positive));
        assert_eq!(
            outcomes[2],
            Err(ClassifyError::UnsupportedEncoding { valid_up_to: 0 })
        );
        assert_eq!(outcomes[3].as_ref().map(|a| a.label), Ok(Label::Neutral));
    }

    struct Boom;

    impl Score for Boom {
        fn score(&self, text: &str) -> Result<f64, ClassifyError> {
            panic!("cannot score {:?}", text)
        }
    }

    #[test]
    fn panicking_scorer_is_recoverable_for_any_batch_size() {
        let classy = Classy::new(Boom);
        for size in 0..=2 {
            let inputs = vec![b"I love this!".to_vec(); size];
            let outcomes = classy.classify_all(&inputs, 0.0);
            assert_eq!(outcomes, vec![Err(ClassifyError::Panicked); size], "size {}", size);
        }
        assert_eq!(classy.classify_guarded(b"x", 0.0), Err(ClassifyError::Panicked));
    }

    #[test]
    fn large_batch_is_split_over_workers() {
        let classy = Classy::new(TableScorer::dashboard());
        let mut inputs = vec![];
        for _ in 0..(MAX_WORKERS * 3 + 1) {
            inputs.push(b"This is bad.".to_vec());
            inputs.push(b"Not sure...".to_vec());
        }
        let outcomes = classy.classify_all(&inputs, 0.2);
        assert_eq!(outcomes.len(), inputs.len());
        for (i, outcome) in outcomes.iter().enumerate() {
            let expected = if i % 2 == 0 { Label::Negative } else { Label::Neutral };
            assert_eq!(outcome.as_ref().map(|a| a.label), Ok(expected), "input {}", i);
        }
    }

    #[test]
    fn batch_of_one_or_none() {
        let classy = Classy::new(TableScorer::dashboard());
        assert!(classy.classify_all(&[], 0.0).is_empty());
        let outcomes = classy.classify_all(&[b"I love this!".to_vec()], 0.0);
        assert_eq!(outcomes.len(), 1);
    }
}
