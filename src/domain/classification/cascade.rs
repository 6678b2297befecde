//! Three-tier classification: rules, local model, remote service.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::{ClassificationResult, Intent, NaiveBayesModel, RuleTier, TierSource};
use crate::domain::conversation::Context;
use crate::ports::{ClassificationError, ClassificationRequest, IntentClassifier};

/// Default acceptance threshold for the local model.
pub const DEFAULT_LOCAL_THRESHOLD: f64 = 0.7;

/// Default upper bound on the remote call.
pub const DEFAULT_REMOTE_DEADLINE: Duration = Duration::from_millis(5000);

/// What one tier produced.
#[derive(Debug, Clone, PartialEq)]
pub enum TierOutcome {
    /// Confident enough to stop the cascade.
    Accepted(ClassificationResult),
    /// An answer, but not confident enough to stop on.
    BelowThreshold(ClassificationResult),
    /// The tier ran and had nothing to say.
    Absent,
    /// The tier could not run to completion.
    Failed(ClassificationError),
}

impl TierOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, TierOutcome::Accepted(_))
    }
}

/// Per-tier outcomes of one cascade run. `None` means the tier was not invoked.
#[derive(Debug, Clone, PartialEq)]
pub struct CascadeTrace {
    pub rule: TierOutcome,
    pub local: Option<TierOutcome>,
    pub remote: Option<TierOutcome>,
}

/// Picks the single result of a cascade run.
///
/// The first accepted tier wins, in tier order. Failing that, the most
/// confident below-threshold answer is used. `None` only when no tier
/// produced anything.
pub fn combine(trace: &CascadeTrace) -> Option<ClassificationResult> {
    let tiers = [Some(&trace.rule), trace.local.as_ref(), trace.remote.as_ref()];

    if let Some(TierOutcome::Accepted(result)) = tiers
        .iter()
        .flatten()
        .find(|outcome| outcome.is_accepted())
    {
        return Some(result.clone());
    }

    tiers
        .iter()
        .flatten()
        .filter_map(|outcome| match outcome {
            TierOutcome::BelowThreshold(result) => Some(result),
            _ => None,
        })
        .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
        .cloned()
}

/// The result of a cascade run plus how each tier behaved.
#[derive(Debug, Clone, PartialEq)]
pub struct CascadeVerdict {
    pub result: Option<ClassificationResult>,
    pub trace: CascadeTrace,
}

/// Runs the tiers in order and stops at the first confident answer.
#[derive(Clone)]
pub struct IntentCascade {
    rules: RuleTier,
    local: Option<NaiveBayesModel>,
    threshold: f64,
    remote: Option<Arc<dyn IntentClassifier>>,
    remote_deadline: Duration,
}

impl Default for IntentCascade {
    fn default() -> Self {
        Self::new(RuleTier::default())
    }
}

impl IntentCascade {
    pub fn new(rules: RuleTier) -> Self {
        Self {
            rules,
            local: None,
            threshold: DEFAULT_LOCAL_THRESHOLD,
            remote: None,
            remote_deadline: DEFAULT_REMOTE_DEADLINE,
        }
    }

    pub fn with_local_model(mut self, model: NaiveBayesModel, threshold: f64) -> Self {
        self.local = Some(model);
        self.threshold = threshold;
        self
    }

    pub fn with_remote(mut self, classifier: Arc<dyn IntentClassifier>, deadline: Duration) -> Self {
        self.remote = Some(classifier);
        self.remote_deadline = deadline;
        self
    }

    pub async fn classify(&self, text: &str, context: &Context, expected: &[Intent]) -> CascadeVerdict {
        let accepts = |intent: &Intent| expected.is_empty() || expected.contains(intent);

        let rule = match self.rules.classify(text) {
            Some(result) if accepts(&result.intent) => TierOutcome::Accepted(result),
            _ => TierOutcome::Absent,
        };
        if rule.is_accepted() {
            return self.finish(CascadeTrace {
                rule,
                local: None,
                remote: None,
            });
        }

        let local = self.local.as_ref().map(|model| match model.predict(text, expected) {
            Some((intent, confidence)) => {
                let result = ClassificationResult::new(intent, confidence, TierSource::LocalModel);
                if confidence >= self.threshold {
                    TierOutcome::Accepted(result)
                } else {
                    TierOutcome::BelowThreshold(result)
                }
            }
            None => TierOutcome::Absent,
        });
        if local.as_ref().is_some_and(TierOutcome::is_accepted) {
            return self.finish(CascadeTrace {
                rule,
                local,
                remote: None,
            });
        }

        let remote = match &self.remote {
            Some(classifier) => Some(self.call_remote(classifier.as_ref(), text, context, expected).await),
            None => None,
        };

        self.finish(CascadeTrace { rule, local, remote })
    }

    async fn call_remote(
        &self,
        classifier: &dyn IntentClassifier,
        text: &str,
        context: &Context,
        expected: &[Intent],
    ) -> TierOutcome {
        let request = ClassificationRequest::new(text, expected.to_vec(), self.remote_deadline)
            .with_context(context.clone());

        // Dropping the future on expiry cancels the in-flight request.
        let outcome = match tokio::time::timeout(self.remote_deadline, classifier.classify(&request)).await {
            Err(_) => Err(ClassificationError::Timeout {
                after_ms: self.remote_deadline.as_millis() as u64,
            }),
            Ok(result) => result,
        };

        match outcome {
            Ok(Some(result)) if request.accepts(&result.intent) => TierOutcome::Accepted(result),
            Ok(_) => TierOutcome::Absent,
            Err(err) => {
                warn!(
                    classifier = classifier.name(),
                    error = %err,
                    "Remote classification failed, degrading to local result"
                );
                TierOutcome::Failed(err)
            }
        }
    }

    fn finish(&self, trace: CascadeTrace) -> CascadeVerdict {
        let result = combine(&trace);
        debug!(
            intent = result.as_ref().map(|r| r.intent.as_str()).unwrap_or("none"),
            source = %result.as_ref().map(|r| r.source.to_string()).unwrap_or_default(),
            "Classification finished"
        );
        CascadeVerdict { result, trace }
    }
}
