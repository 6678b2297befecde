//! Built-in negotiation actions.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use super::action::{Action, ActionError, ActionInput, ActionRegistry};
use crate::domain::classification::{find_document_number, normalize_text};
use crate::domain::conversation::Context;
use crate::ports::{ClientDirectory, PlanSelection};

/// Share of the balance paid under the single-payment offer.
pub const SINGLE_PAYMENT_RATIO: f64 = 0.7;

/// One payment plan offered to every client.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanTemplate {
    pub key: &'static str,
    pub label: &'static str,
    pub installments: u32,
}

pub const PLAN_CATALOG: [PlanTemplate; 3] = [
    PlanTemplate {
        key: "1",
        label: "Pago único con 30% de descuento",
        installments: 1,
    },
    PlanTemplate {
        key: "2",
        label: "Dos cuotas",
        installments: 2,
    },
    PlanTemplate {
        key: "3",
        label: "Seis cuotas",
        installments: 6,
    },
];

impl PlanTemplate {
    /// Amount of each installment for `balance`, rounded to whole units.
    pub fn installment_amount(&self, balance: f64) -> f64 {
        if self.installments == 1 {
            (balance * SINGLE_PAYMENT_RATIO).round()
        } else {
            (balance / f64::from(self.installments)).round()
        }
    }

    pub fn by_key(key: &str) -> Option<&'static PlanTemplate> {
        PLAN_CATALOG.iter().find(|plan| plan.key == key.trim())
    }
}

/// Maps free text like "la dos" or "pago unico" to a catalog key.
fn detect_plan_key(text: &str) -> Option<&'static str> {
    let normalized = normalize_text(text);
    let words: Vec<&str> = normalized.split(' ').collect();
    let has = |w: &str| words.contains(&w);

    if has("1") || has("uno") || normalized.contains("pago unico") {
        Some("1")
    } else if has("2") || has("dos") {
        Some("2")
    } else if has("3") || has("tres") || has("seis") {
        Some("3")
    } else {
        None
    }
}

/// Finds the client by the document number typed or already known.
pub struct LookupClient {
    directory: Arc<dyn ClientDirectory>,
}

impl LookupClient {
    pub fn new(directory: Arc<dyn ClientDirectory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl Action for LookupClient {
    fn name(&self) -> &str {
        "lookup_client"
    }

    fn success_flag(&self) -> &str {
        "lookup_success"
    }

    async fn execute(&self, context: &mut Context, input: &ActionInput<'_>) -> Result<(), ActionError> {
        let document = find_document_number(input.user_input)
            .or_else(|| context.get_str("document_number").map(str::to_string))
            .ok_or_else(|| ActionError::MissingInput("document_number".into()))?;

        let client = self
            .directory
            .find_by_document(&document)
            .await
            .map_err(|err| ActionError::Collaborator(err.to_string()))?
            .ok_or_else(|| ActionError::NotFound(format!("client with document {document}")))?;

        context.insert("document_number", client.document_number);
        context.insert("client_name", client.name);
        context.insert("balance", client.balance);
        context.insert("previous_conversations", client.previous_conversations);
        if let Some(phone) = client.phone {
            context.insert("phone", phone);
        }
        if let Some(email) = client.email {
            context.insert("email", email);
        }
        Ok(())
    }
}

/// Computes the plan amounts for the known balance.
#[derive(Debug, Clone, Default)]
pub struct ComputeOffers;

#[async_trait]
impl Action for ComputeOffers {
    fn name(&self) -> &str {
        "compute_offers"
    }

    fn success_flag(&self) -> &str {
        "offers_ready"
    }

    async fn execute(&self, context: &mut Context, _input: &ActionInput<'_>) -> Result<(), ActionError> {
        let balance = context
            .get_f64("balance")
            .ok_or_else(|| ActionError::MissingInput("balance".into()))?;
        if !balance.is_finite() || balance <= 0.0 {
            return Err(ActionError::Invalid(format!("balance must be positive, got {balance}")));
        }

        let mut offers = Map::new();
        for plan in &PLAN_CATALOG {
            offers.insert(
                plan.key.to_string(),
                json!({
                    "label": plan.label,
                    "installments": plan.installments,
                    "amount": plan.installment_amount(balance),
                }),
            );
        }

        let single = PLAN_CATALOG[0].installment_amount(balance);
        context.insert("offers", Value::Object(offers));
        context.insert("single_payment_amount", single);
        context.insert("discount_amount", (balance - single).round());
        context.insert("two_installments_amount", PLAN_CATALOG[1].installment_amount(balance));
        context.insert("six_installments_amount", PLAN_CATALOG[2].installment_amount(balance));
        Ok(())
    }
}

/// Checks the phone and e-mail on file look usable.
#[derive(Debug, Clone, Default)]
pub struct VerifyContact;

#[async_trait]
impl Action for VerifyContact {
    fn name(&self) -> &str {
        "verify_contact"
    }

    fn success_flag(&self) -> &str {
        "contact_verified"
    }

    async fn execute(&self, context: &mut Context, _input: &ActionInput<'_>) -> Result<(), ActionError> {
        let phone = context
            .get_str("phone")
            .ok_or_else(|| ActionError::MissingInput("phone".into()))?;
        let email = context
            .get_str("email")
            .ok_or_else(|| ActionError::MissingInput("email".into()))?;

        let digits = phone.chars().filter(char::is_ascii_digit).count();
        if digits < 10 {
            return Err(ActionError::Invalid(format!("phone has {digits} digits, need 10")));
        }
        if !email.contains('@') {
            return Err(ActionError::Invalid("email has no '@'".into()));
        }
        Ok(())
    }
}

/// Records the plan the client chose with the client directory.
pub struct RegisterPlanSelection {
    directory: Arc<dyn ClientDirectory>,
}

impl RegisterPlanSelection {
    pub fn new(directory: Arc<dyn ClientDirectory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl Action for RegisterPlanSelection {
    fn name(&self) -> &str {
        "register_plan_selection"
    }

    fn success_flag(&self) -> &str {
        "plan_registered"
    }

    async fn execute(&self, context: &mut Context, input: &ActionInput<'_>) -> Result<(), ActionError> {
        let key = detect_plan_key(input.user_input)
            .map(str::to_string)
            .or_else(|| context.get_str("selected_option").map(str::to_string))
            .ok_or_else(|| ActionError::MissingInput("selected_option".into()))?;

        let plan = PlanTemplate::by_key(&key)
            .ok_or_else(|| ActionError::Invalid(format!("unknown plan '{key}'")))?;
        let amount = context
            .get_f64("balance")
            .map(|balance| plan.installment_amount(balance));

        let selection = PlanSelection {
            conversation_id: input.conversation_id,
            document_number: context.get_str("document_number").map(str::to_string),
            option_key: plan.key.to_string(),
            installments: plan.installments,
            amount,
        };
        self.directory
            .record_plan_selection(&selection)
            .await
            .map_err(|err| ActionError::Collaborator(err.to_string()))?;

        context.insert("selected_plan", plan.key);
        context.insert("selected_plan_label", plan.label);
        context.insert("selected_plan_installments", plan.installments);
        if let Some(amount) = amount {
            context.insert("selected_plan_amount", amount);
        }
        Ok(())
    }
}

/// Hands the conversation over to a human supervisor.
#[derive(Debug, Clone)]
pub struct EscalateToSupervisor {
    supervisor: String,
}

impl EscalateToSupervisor {
    pub fn new(supervisor: impl Into<String>) -> Self {
        Self {
            supervisor: supervisor.into(),
        }
    }
}

#[async_trait]
impl Action for EscalateToSupervisor {
    fn name(&self) -> &str {
        "escalate_to_supervisor"
    }

    fn success_flag(&self) -> &str {
        "escalated"
    }

    async fn execute(&self, context: &mut Context, input: &ActionInput<'_>) -> Result<(), ActionError> {
        context.insert("supervisor", self.supervisor.clone());
        let note = input.user_input.trim();
        if !note.is_empty() {
            context.insert("escalation_note", note);
        }
        Ok(())
    }
}

impl ActionRegistry {
    /// A registry holding every built-in action.
    pub fn builtin(directory: Arc<dyn ClientDirectory>, supervisor: impl Into<String>) -> Self {
        let mut registry = Self::new();
        registry.register(LookupClient::new(directory.clone()));
        registry.register(ComputeOffers);
        registry.register(VerifyContact);
        registry.register(RegisterPlanSelection::new(directory));
        registry.register(EscalateToSupervisor::new(supervisor));
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::directory::InMemoryClientDirectory;
    use crate::domain::foundation::ConversationId;
    use crate::ports::ClientRecord;

    fn input(text: &str) -> ActionInput<'_> {
        ActionInput {
            conversation_id: ConversationId::new(),
            user_input: text,
        }
    }

    fn directory() -> Arc<InMemoryClientDirectory> {
        Arc::new(InMemoryClientDirectory::with_clients(vec![ClientRecord {
            document_number: "93388915".into(),
            name: "Ana Torres".into(),
            balance: 1_200_000.0,
            phone: Some("3001234567".into()),
            email: Some("ana@example.com".into()),
            previous_conversations: 1,
        }]))
    }

    mod lookup_client {
        use super::*;

        #[tokio::test]
        async fn fills_context_from_typed_document() {
            let action = LookupClient::new(directory());
            let mut context = Context::new();

            action
                .execute(&mut context, &input("mi cedula es 93.388.915"))
                .await
                .unwrap();

            assert_eq!(context.get_str("client_name"), Some("Ana Torres"));
            assert_eq!(context.get_f64("balance"), Some(1_200_000.0));
            assert_eq!(context.get_str("phone"), Some("3001234567"));
        }

        #[tokio::test]
        async fn unknown_document_is_not_found() {
            let action = LookupClient::new(directory());
            let err = action
                .execute(&mut Context::new(), &input("11223344"))
                .await
                .unwrap_err();
            assert!(matches!(err, ActionError::NotFound(_)));
        }

        #[tokio::test]
        async fn no_document_is_missing_input() {
            let action = LookupClient::new(directory());
            let err = action
                .execute(&mut Context::new(), &input("hola"))
                .await
                .unwrap_err();
            assert_eq!(err, ActionError::MissingInput("document_number".into()));
        }
    }

    mod compute_offers {
        use super::*;

        #[tokio::test]
        async fn computes_three_plans() {
            let mut context = Context::new();
            context.insert("balance", 1_200_000.0);

            ComputeOffers.execute(&mut context, &input("")).await.unwrap();

            assert_eq!(context.get_f64("single_payment_amount"), Some(840_000.0));
            assert_eq!(context.get_f64("discount_amount"), Some(360_000.0));
            assert_eq!(context.get_f64("two_installments_amount"), Some(600_000.0));
            assert_eq!(context.get_f64("six_installments_amount"), Some(200_000.0));
            assert_eq!(context.get("offers").unwrap()["3"]["installments"], 6);
        }

        #[tokio::test]
        async fn rejects_missing_or_zero_balance() {
            let err = ComputeOffers
                .execute(&mut Context::new(), &input(""))
                .await
                .unwrap_err();
            assert!(matches!(err, ActionError::MissingInput(_)));

            let mut context = Context::new();
            context.insert("balance", 0);
            let err = ComputeOffers.execute(&mut context, &input("")).await.unwrap_err();
            assert!(matches!(err, ActionError::Invalid(_)));
        }
    }

    mod verify_contact {
        use super::*;

        fn context(phone: &str, email: &str) -> Context {
            let mut context = Context::new();
            context.insert("phone", phone);
            context.insert("email", email);
            context
        }

        #[tokio::test]
        async fn accepts_valid_contact() {
            let mut ctx = context("+57 300 123 4567", "a@b.co");
            assert!(VerifyContact.execute(&mut ctx, &input("")).await.is_ok());
        }

        #[tokio::test]
        async fn rejects_short_phone_or_bad_email() {
            let mut ctx = context("300123", "a@b.co");
            assert!(VerifyContact.execute(&mut ctx, &input("")).await.is_err());

            let mut ctx = context("3001234567", "nope");
            assert!(VerifyContact.execute(&mut ctx, &input("")).await.is_err());
        }
    }

    mod register_plan_selection {
        use super::*;

        #[tokio::test]
        async fn records_selected_option() {
            let directory = directory();
            let action = RegisterPlanSelection::new(directory.clone());
            let mut context = Context::new();
            context.insert("selected_option", "2");
            context.insert("balance", 1000.0);
            context.insert("document_number", "93388915");

            action.execute(&mut context, &input("2")).await.unwrap();

            assert_eq!(context.get_str("selected_plan"), Some("2"));
            assert_eq!(context.get_f64("selected_plan_amount"), Some(500.0));
            let recorded = directory.selections();
            assert_eq!(recorded.len(), 1);
            assert_eq!(recorded[0].installments, 2);
        }

        #[tokio::test]
        async fn detects_plan_from_text() {
            let action = RegisterPlanSelection::new(directory());
            let mut context = Context::new();

            action
                .execute(&mut context, &input("prefiero el pago único"))
                .await
                .unwrap();

            assert_eq!(context.get_str("selected_plan"), Some("1"));
            assert!(!context.contains("selected_plan_amount"));
        }

        #[tokio::test]
        async fn text_wins_over_earlier_menu_choice() {
            let action = RegisterPlanSelection::new(directory());
            let mut context = Context::new();
            context.insert("selected_option", "1");

            action.execute(&mut context, &input("la de seis")).await.unwrap();

            assert_eq!(context.get_str("selected_plan"), Some("3"));
        }

        #[test]
        fn detection_covers_words() {
            assert_eq!(detect_plan_key("la tres"), Some("3"));
            assert_eq!(detect_plan_key("seis cuotas"), Some("3"));
            assert_eq!(detect_plan_key("no se"), None);
        }
    }

    #[tokio::test]
    async fn escalation_stores_supervisor_and_note() {
        let mut context = Context::new();
        EscalateToSupervisor::new("Laura")
            .execute(&mut context, &input("  no puedo pagar "))
            .await
            .unwrap();
        assert_eq!(context.get_str("supervisor"), Some("Laura"));
        assert_eq!(context.get_str("escalation_note"), Some("no puedo pagar"));
    }

    #[test]
    fn builtin_registry_has_all_names() {
        let registry = ActionRegistry::builtin(directory(), "Laura");
        assert_eq!(
            registry.names(),
            vec![
                "compute_offers",
                "escalate_to_supervisor",
                "lookup_client",
                "register_plan_selection",
                "verify_contact",
            ]
        );
    }
}
