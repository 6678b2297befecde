//! Intent labels and classification results.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Well-known intents used by the built-in conditions and rules.
pub mod intents {
    pub const IDENTIFICATION: &str = "IDENTIFICATION";
    pub const CONFIRMATION: &str = "CONFIRMATION";
    pub const REJECTION: &str = "REJECTION";
    pub const PAYMENT_INTENT: &str = "PAYMENT_INTENT";
    pub const PLAN_REQUEST: &str = "PLAN_REQUEST";
    pub const DEBT_INQUIRY: &str = "DEBT_INQUIRY";
}

/// A classification label, stored upper-case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Intent(String);

impl Intent {
    pub fn new(label: impl AsRef<str>) -> Self {
        Self(label.as_ref().trim().to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which cascade tier produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierSource {
    Rule,
    LocalModel,
    Remote,
}

impl fmt::Display for TierSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TierSource::Rule => "rule",
            TierSource::LocalModel => "local_model",
            TierSource::Remote => "remote",
        })
    }
}

/// The verdict of one classification call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub intent: Intent,
    /// In `[0, 1]`.
    pub confidence: f64,
    pub source: TierSource,
}

impl ClassificationResult {
    pub fn new(intent: Intent, confidence: f64, source: TierSource) -> Self {
        Self {
            intent,
            confidence: confidence.clamp(0.0, 1.0),
            source,
        }
    }

    pub fn is(&self, label: &str) -> bool {
        self.intent.as_str() == label
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intent_is_normalized_to_upper_case() {
        assert_eq!(Intent::new(" confirmation "), Intent::new(intents::CONFIRMATION));
    }

    #[test]
    fn confidence_is_clamped() {
        let result = ClassificationResult::new(Intent::new("X"), 1.7, TierSource::Remote);
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn source_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&TierSource::LocalModel).unwrap(),
            "\"local_model\""
        );
    }
}
