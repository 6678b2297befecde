//! Mock intent classifier for testing.
//!
//! Stands in for the remote tier so cascade and engine tests run without a
//! network.
//!
//! # Features
//!
//! - Pre-configured results, consumed in order
//! - Simulated latency for deadline tests
//! - Error injection
//! - Call tracking
//!
//! # Example
//!
//! ```ignore
//! let classifier = MockIntentClassifier::new()
//!     .with_result(ClassificationResult::new(Intent::new("CONFIRMATION"), 0.9, TierSource::Remote))
//!     .with_delay(Duration::from_millis(100));
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::sleep;

use crate::domain::classification::ClassificationResult;
use crate::ports::{ClassificationError, ClassificationRequest, IntentClassifier};

type Scripted = Result<Option<ClassificationResult>, ClassificationError>;

/// Scriptable classifier. Answers `Ok(None)` once the script runs out.
#[derive(Debug, Clone, Default)]
pub struct MockIntentClassifier {
    responses: Arc<Mutex<VecDeque<Scripted>>>,
    delay: Duration,
    calls: Arc<Mutex<Vec<ClassificationRequest>>>,
}

impl MockIntentClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful answer.
    pub fn with_result(self, result: ClassificationResult) -> Self {
        self.push(Ok(Some(result)));
        self
    }

    /// Queues an "answered but nothing matched" reply.
    pub fn with_no_match(self) -> Self {
        self.push(Ok(None));
        self
    }

    /// Queues a failure.
    pub fn with_error(self, error: ClassificationError) -> Self {
        self.push(Err(error));
        self
    }

    /// Sets simulated latency per call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn calls(&self) -> Vec<ClassificationRequest> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn push(&self, response: Scripted) {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(response);
    }

    fn next_response(&self) -> Scripted {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or(Ok(None))
    }
}

#[async_trait]
impl IntentClassifier for MockIntentClassifier {
    async fn classify(
        &self,
        request: &ClassificationRequest,
    ) -> Result<Option<ClassificationResult>, ClassificationError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }

        self.next_response()
    }

    fn name(&self) -> &str {
        "mock"
    }
}
