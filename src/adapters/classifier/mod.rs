//! Intent classifier adapters.

mod mock;
mod openai;

pub use mock::MockIntentClassifier;
pub use openai::{OpenAiClassifierConfig, OpenAiIntentClassifier};
