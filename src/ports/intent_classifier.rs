//! Intent Classifier Port - External text classification services.
//!
//! Implemented by the remote language-model tier and by test doubles. The
//! local tiers (rules, naive Bayes) are pure domain code and do not go
//! through this port.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::domain::classification::{ClassificationResult, Intent};
use crate::domain::conversation::Context;

/// Input for one classification call.
#[derive(Debug, Clone)]
pub struct ClassificationRequest {
    /// The client's message.
    pub text: String,
    /// Conversation variables the classifier may use as background.
    pub context: Context,
    /// Intents the caller can act on. Results outside this set are discarded.
    pub expected: Vec<Intent>,
    /// Upper bound the caller will wait.
    pub deadline: Duration,
}

impl ClassificationRequest {
    pub fn new(text: impl Into<String>, expected: Vec<Intent>, deadline: Duration) -> Self {
        Self {
            text: text.into(),
            context: Context::new(),
            expected,
            deadline,
        }
    }

    pub fn with_context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }

    /// True when `intent` is acceptable for this request.
    pub fn accepts(&self, intent: &Intent) -> bool {
        self.expected.is_empty() || self.expected.contains(intent)
    }
}

/// Why a classification collaborator produced no answer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClassificationError {
    #[error("classification timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    #[error("classifier unavailable: {0}")]
    Unavailable(String),

    #[error("classifier rejected credentials")]
    AuthenticationFailed,

    #[error("classifier rate limited: retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u32 },

    #[error("malformed classifier response: {0}")]
    Malformed(String),

    #[error("network error: {0}")]
    Network(String),
}

impl ClassificationError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }
}

/// A text classifier reachable over some transport.
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    /// Classifies `request.text` into one of `request.expected`.
    ///
    /// `Ok(None)` means the classifier answered but could not pick an
    /// expected intent.
    async fn classify(
        &self,
        request: &ClassificationRequest,
    ) -> Result<Option<ClassificationResult>, ClassificationError>;

    /// Short name used in logs.
    fn name(&self) -> &str;
}
