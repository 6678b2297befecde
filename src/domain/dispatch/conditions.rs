//! Built-in negotiation conditions.

use once_cell::sync::Lazy;

use super::condition::{Condition, ConditionInput, ConditionRegistry, ContextFlagCondition};
use crate::domain::classification::{find_document_number, intents, normalize_text, Intent};

/// Flags written by the built-in actions, each exposed as a condition.
pub const ACTION_FLAGS: [&str; 5] = [
    "lookup_success",
    "offers_ready",
    "contact_verified",
    "plan_registered",
    "escalated",
];

pub const DEFAULT_BALANCE_THRESHOLD: f64 = 1000.0;

static CONFIRMS_INTENTS: Lazy<Vec<Intent>> = Lazy::new(|| {
    vec![
        Intent::new(intents::CONFIRMATION),
        Intent::new(intents::REJECTION),
    ]
});

const PLAN_KEYWORDS: [&str; 9] = [
    "1", "2", "3", "uno", "dos", "tres", "plan", "cuotas", "pago unico",
];

const FRUSTRATION_PHRASES: [&str; 10] = [
    "no puedo",
    "imposible",
    "no tengo",
    "dificil",
    "problema",
    "no entiendo",
    "complicado",
    "ayuda",
    "perdido",
    "confundido",
];

/// True if `phrase` appears in `normalized` on word boundaries.
fn contains_phrase(normalized: &str, phrase: &str) -> bool {
    format!(" {normalized} ").contains(&format!(" {phrase} "))
}

/// The client accepted what was proposed.
#[derive(Debug, Clone, Default)]
pub struct ClientConfirms;

impl Condition for ClientConfirms {
    fn name(&self) -> &str {
        "client_confirms"
    }

    fn expected_intents(&self) -> Option<&[Intent]> {
        Some(CONFIRMS_INTENTS.as_slice())
    }

    fn evaluate(&self, input: &ConditionInput<'_>) -> bool {
        input
            .classification
            .is_some_and(|result| result.is(intents::CONFIRMATION))
    }
}

/// The client picked, or is talking about, a payment plan.
#[derive(Debug, Clone, Default)]
pub struct ClientSelectsPlan;

impl Condition for ClientSelectsPlan {
    fn name(&self) -> &str {
        "client_selects_plan"
    }

    fn evaluate(&self, input: &ConditionInput<'_>) -> bool {
        if input.context.contains("selected_plan") || input.context.contains("selected_option") {
            return true;
        }
        let normalized = normalize_text(input.user_input);
        PLAN_KEYWORDS
            .iter()
            .any(|keyword| contains_phrase(&normalized, keyword))
    }
}

#[derive(Debug, Clone, Default)]
pub struct ClientShowsFrustration;

impl Condition for ClientShowsFrustration {
    fn name(&self) -> &str {
        "client_shows_frustration"
    }

    fn evaluate(&self, input: &ConditionInput<'_>) -> bool {
        let normalized = normalize_text(input.user_input);
        FRUSTRATION_PHRASES
            .iter()
            .any(|phrase| contains_phrase(&normalized, phrase))
    }
}

/// A plausible document number is known or was just typed.
#[derive(Debug, Clone, Default)]
pub struct HasValidDocument;

impl Condition for HasValidDocument {
    fn name(&self) -> &str {
        "has_valid_document"
    }

    fn evaluate(&self, input: &ConditionInput<'_>) -> bool {
        let known = input
            .context
            .get_str("document_number")
            .is_some_and(|doc| doc.trim().len() >= 7);
        known || find_document_number(input.user_input).is_some()
    }
}

/// Outstanding `balance` strictly above a threshold.
#[derive(Debug, Clone)]
pub struct BalanceAboveThreshold {
    threshold: f64,
}

impl BalanceAboveThreshold {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl Default for BalanceAboveThreshold {
    fn default() -> Self {
        Self::new(DEFAULT_BALANCE_THRESHOLD)
    }
}

impl Condition for BalanceAboveThreshold {
    fn name(&self) -> &str {
        "balance_above_threshold"
    }

    fn evaluate(&self, input: &ConditionInput<'_>) -> bool {
        input
            .context
            .get_f64("balance")
            .is_some_and(|balance| balance > self.threshold)
    }
}

#[derive(Debug, Clone, Default)]
pub struct FirstConversation;

impl Condition for FirstConversation {
    fn name(&self) -> &str {
        "first_conversation"
    }

    fn evaluate(&self, input: &ConditionInput<'_>) -> bool {
        input
            .context
            .get_f64("previous_conversations")
            .map_or(true, |count| count <= 0.0)
    }
}

impl ConditionRegistry {
    /// A registry holding every built-in condition.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(ClientConfirms);
        registry.register(ClientSelectsPlan);
        registry.register(ClientShowsFrustration);
        registry.register(HasValidDocument);
        registry.register(BalanceAboveThreshold::default());
        registry.register(FirstConversation);
        for flag in ACTION_FLAGS {
            registry.register(ContextFlagCondition::for_flag(flag));
        }
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::classification::{ClassificationResult, TierSource};
    use crate::domain::conversation::Context;
    use crate::domain::foundation::ConversationId;

    fn check(condition: &dyn Condition, context: &Context, text: &str) -> bool {
        condition.evaluate(&ConditionInput {
            conversation_id: ConversationId::new(),
            context,
            user_input: text,
            classification: None,
        })
    }

    mod client_confirms {
        use super::*;

        fn with(intent: &str) -> bool {
            let context = Context::new();
            let result = ClassificationResult::new(Intent::new(intent), 0.9, TierSource::LocalModel);
            ClientConfirms.evaluate(&ConditionInput {
                conversation_id: ConversationId::new(),
                context: &context,
                user_input: "dale",
                classification: Some(&result),
            })
        }

        #[test]
        fn true_on_confirmation() {
            assert!(with(intents::CONFIRMATION));
        }

        #[test]
        fn false_on_rejection() {
            assert!(!with(intents::REJECTION));
        }

        #[test]
        fn declares_expected_intents() {
            let expected = ClientConfirms.expected_intents().unwrap();
            assert!(expected.contains(&Intent::new("confirmation")));
            assert!(!ClientConfirms.default_outcome());
        }
    }

    mod keyword_conditions {
        use super::*;

        #[test]
        fn plan_selected_by_keyword() {
            let context = Context::new();
            assert!(check(&ClientSelectsPlan, &context, "Quiero el pago único"));
            assert!(check(&ClientSelectsPlan, &context, "la opcion 2"));
            assert!(!check(&ClientSelectsPlan, &context, "no se"));
        }

        #[test]
        fn plan_selected_from_context() {
            let mut context = Context::new();
            context.insert("selected_option", "3");
            assert!(check(&ClientSelectsPlan, &context, "ok"));
        }

        #[test]
        fn frustration_detected() {
            let context = Context::new();
            assert!(check(&ClientShowsFrustration, &context, "No puedo pagar eso"));
            assert!(check(&ClientShowsFrustration, &context, "es muy difícil"));
            assert!(!check(&ClientShowsFrustration, &context, "perfecto, gracias"));
        }

        #[test]
        fn phrases_match_whole_words() {
            let context = Context::new();
            assert!(!check(&ClientShowsFrustration, &context, "ayudante"));
        }
    }

    mod context_conditions {
        use super::*;

        #[test]
        fn document_from_context_or_input() {
            let mut context = Context::new();
            assert!(!check(&HasValidDocument, &context, "hola"));
            assert!(check(&HasValidDocument, &context, "mi cedula es 93388915"));

            context.insert("document_number", "1234567");
            assert!(check(&HasValidDocument, &context, "hola"));
        }

        #[test]
        fn balance_threshold_is_strict() {
            let mut context = Context::new();
            context.insert("balance", 1000.0);
            assert!(!check(&BalanceAboveThreshold::default(), &context, ""));
            assert!(check(&BalanceAboveThreshold::new(999.0), &context, ""));
        }

        #[test]
        fn first_conversation_when_absent_or_zero() {
            let mut context = Context::new();
            assert!(check(&FirstConversation, &context, ""));
            context.insert("previous_conversations", 0);
            assert!(check(&FirstConversation, &context, ""));
            context.insert("previous_conversations", 2);
            assert!(!check(&FirstConversation, &context, ""));
        }
    }

    #[test]
    fn builtin_registry_has_all_names() {
        let registry = ConditionRegistry::builtin();
        for name in [
            "client_confirms",
            "client_selects_plan",
            "client_shows_frustration",
            "has_valid_document",
            "balance_above_threshold",
            "first_conversation",
        ]
        .into_iter()
        .chain(ACTION_FLAGS)
        {
            assert!(registry.contains(name), "missing {name}");
        }
    }
}
