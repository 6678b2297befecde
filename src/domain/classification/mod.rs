//! Intent classification: the rule tier, the local model and the cascade
//! that combines them with a remote classifier.

mod cascade;
mod intent;
mod naive_bayes;
mod normalize;
mod rules;

pub use cascade::{
    combine, CascadeTrace, CascadeVerdict, IntentCascade, TierOutcome, DEFAULT_LOCAL_THRESHOLD,
    DEFAULT_REMOTE_DEADLINE,
};
pub use intent::{intents, ClassificationResult, Intent, TierSource};
pub use naive_bayes::{NaiveBayesModel, TrainingError, TrainingExample};
pub use normalize::{fold_compatibility, normalize_text, tokenize};
pub use rules::{find_document_number, RuleTier};
