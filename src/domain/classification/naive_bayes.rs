//! Second tier: multinomial naive Bayes over normalized tokens.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use super::{tokenize, Intent};

/// One labelled utterance.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TrainingExample {
    pub text: String,
    pub intent: String,
}

impl TrainingExample {
    pub fn new(text: impl Into<String>, intent: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            intent: intent.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct TrainingFile {
    examples: Vec<TrainingExample>,
}

#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("no training examples")]
    Empty,

    #[error("cannot read training data '{path}': {message}")]
    Io { path: String, message: String },

    #[error("invalid training data: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, Default)]
struct ClassStats {
    documents: usize,
    tokens: usize,
    token_counts: HashMap<String, usize>,
}

/// A trained model. Immutable after training.
#[derive(Debug, Clone)]
pub struct NaiveBayesModel {
    classes: BTreeMap<Intent, ClassStats>,
    vocabulary: HashSet<String>,
    total_documents: usize,
}

impl NaiveBayesModel {
    pub fn train(examples: &[TrainingExample]) -> Result<Self, TrainingError> {
        let mut classes: BTreeMap<Intent, ClassStats> = BTreeMap::new();
        let mut vocabulary = HashSet::new();
        let mut total_documents = 0;

        for example in examples {
            let tokens = tokenize(&example.text);
            if tokens.is_empty() {
                continue;
            }
            let stats = classes.entry(Intent::new(&example.intent)).or_default();
            stats.documents += 1;
            stats.tokens += tokens.len();
            for token in tokens {
                *stats.token_counts.entry(token.clone()).or_insert(0) += 1;
                vocabulary.insert(token);
            }
            total_documents += 1;
        }

        if total_documents == 0 {
            return Err(TrainingError::Empty);
        }

        Ok(Self {
            classes,
            vocabulary,
            total_documents,
        })
    }

    /// Trains from a YAML document of the form `examples: [{text, intent}, ...]`.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, TrainingError> {
        let file: TrainingFile =
            serde_yaml::from_str(yaml).map_err(|e| TrainingError::Parse(e.to_string()))?;
        Self::train(&file.examples)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, TrainingError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| TrainingError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_yaml_str(&yaml)
    }

    pub fn labels(&self) -> impl Iterator<Item = &Intent> {
        self.classes.keys()
    }

    /// Most likely intent among `candidates` (all known intents when empty),
    /// with its posterior probability renormalized over those candidates.
    ///
    /// Returns `None` when no token of `text` was seen in training or no
    /// candidate is a trained label.
    pub fn predict(&self, text: &str, candidates: &[Intent]) -> Option<(Intent, f64)> {
        let tokens: Vec<String> = tokenize(text)
            .into_iter()
            .filter(|t| self.vocabulary.contains(t))
            .collect();
        if tokens.is_empty() {
            return None;
        }

        let vocabulary_size = self.vocabulary.len() as f64;
        let scores: Vec<(&Intent, f64)> = self
            .classes
            .iter()
            .filter(|(intent, _)| candidates.is_empty() || candidates.contains(*intent))
            .map(|(intent, stats)| {
                let prior = (stats.documents as f64 / self.total_documents as f64).ln();
                let denominator = stats.tokens as f64 + vocabulary_size;
                let likelihood: f64 = tokens
                    .iter()
                    .map(|t| {
                        let count = stats.token_counts.get(t).copied().unwrap_or(0) as f64;
                        ((count + 1.0) / denominator).ln()
                    })
                    .sum();
                (intent, prior + likelihood)
            })
            .collect();

        let max = scores
            .iter()
            .map(|(_, s)| *s)
            .fold(f64::NEG_INFINITY, f64::max);
        if !max.is_finite() {
            return None;
        }
        let normalizer: f64 = scores.iter().map(|(_, s)| (s - max).exp()).sum();
        scores
            .into_iter()
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(intent, score)| (intent.clone(), (score - max).exp() / normalizer))
    }
}
