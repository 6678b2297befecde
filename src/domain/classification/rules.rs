//! Deterministic first tier: document numbers and exact yes/no replies.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use super::{fold_compatibility, intents, normalize_text, ClassificationResult, Intent, TierSource};

static DOCUMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:(?:cc|cedula|documento|doc|id)\s*)?([0-9]{8,10})$")
        .expect("document pattern is valid")
});

static DOCUMENT_IN_TEXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([0-9]{7,10})\b").expect("document search pattern is valid"));

const CONFIRMATIONS: &[&str] = &[
    "si", "yes", "ok", "okay", "acepto", "de acuerdo", "confirmo", "dale", "claro", "correcto",
    "esta bien", "si acepto", "si claro", "por supuesto", "listo",
];

const REJECTIONS: &[&str] = &[
    "no", "nop", "negativo", "no gracias", "no acepto", "no me interesa", "rechazo", "no puedo",
    "no quiero", "nope",
];

/// Extracts a plausible document number from free text.
///
/// Accepts 7 to 10 digits so lookups still work for older ids that the
/// rule tier itself does not classify. Fullwidth digits are folded to ASCII
/// first, so the returned number always matches directory records.
pub fn find_document_number(text: &str) -> Option<String> {
    let compact = fold_compatibility(text).replace(['.', ','], "");
    DOCUMENT_IN_TEXT
        .captures_iter(&compact)
        .map(|caps| caps[1].to_string())
        .find(|digits| !is_repeated_digit(digits))
}

fn is_repeated_digit(digits: &str) -> bool {
    let mut chars = digits.chars();
    match chars.next() {
        Some(first) => chars.all(|c| c == first),
        None => true,
    }
}

/// Pattern matchers that short-circuit the cascade with confidence 1.0.
#[derive(Debug, Clone)]
pub struct RuleTier {
    confirmations: HashSet<String>,
    rejections: HashSet<String>,
}

impl Default for RuleTier {
    fn default() -> Self {
        Self {
            confirmations: CONFIRMATIONS.iter().map(|s| s.to_string()).collect(),
            rejections: REJECTIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl RuleTier {
    /// Adds extra whole-message confirmations (normalized before matching).
    pub fn with_confirmations<I, S>(mut self, phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.confirmations
            .extend(phrases.into_iter().map(|p| normalize_text(p.as_ref())));
        self
    }

    pub fn with_rejections<I, S>(mut self, phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.rejections
            .extend(phrases.into_iter().map(|p| normalize_text(p.as_ref())));
        self
    }

    pub fn classify(&self, text: &str) -> Option<ClassificationResult> {
        let compact = text.replace('.', "");
        let normalized = normalize_text(&compact);
        if normalized.is_empty() {
            return None;
        }

        let label = if self.is_document(&normalized) {
            intents::IDENTIFICATION
        } else if self.confirmations.contains(&normalized) {
            intents::CONFIRMATION
        } else if self.rejections.contains(&normalized) {
            intents::REJECTION
        } else {
            return None;
        };

        Some(ClassificationResult::new(
            Intent::new(label),
            1.0,
            TierSource::Rule,
        ))
    }

    fn is_document(&self, normalized: &str) -> bool {
        DOCUMENT
            .captures(normalized)
            .map(|caps| !is_repeated_digit(&caps[1]))
            .unwrap_or(false)
    }
}
