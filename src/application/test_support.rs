//! Shared wiring for application-layer tests.

use std::sync::Arc;

use crate::adapters::{InMemoryClientDirectory, InMemoryConversationRepository, ManualClock};
use crate::application::{ConversationLocks, LifecycleActions};
use crate::domain::classification::IntentCascade;
use crate::domain::dispatch::Registries;
use crate::domain::engine::StateMachineEngine;
use crate::domain::flow::load_flow;
use crate::domain::foundation::{SubjectId, Timestamp};
use crate::domain::lifecycle::{LifecycleEvaluator, TierPolicies, TimeoutPolicy};
use crate::ports::ClientRecord;

pub const FLOW: &str = r#"
initial_state: welcome
lifecycle:
  completed_states: [done]
  messages:
    warning: "{{greeting}}{{hours_remaining}}h left"
    extension: "{{greeting}}+{{extension_hours}}h ({{extension_reason}})"
    expired: "{{greeting}}expired"
    message_limit: "{{greeting}}too many messages"
    negotiation_completed: "{{greeting}}deal closed"
    generic: "{{greeting}}closed"
states:
  welcome:
    action: lookup_client
    condition: lookup_success
    true_next: confirm
    false_next: ask_document
  ask_document:
    message: "Send your document"
    action: lookup_client
    condition: lookup_success
    true_next: confirm
    false_next: ask_document
  confirm:
    message: "Hi {{client_name}}, you owe {{balance|currency}}. Agree?"
    condition: client_confirms
    true_next: done
    false_next: confirm
  done:
    message: "Thanks"
    next: conversation_closed
"#;

pub const START: u64 = 1_700_000_000;

pub fn client() -> ClientRecord {
    ClientRecord {
        document_number: "93388915".into(),
        name: "Ana".into(),
        balance: 20_000_000.0,
        phone: None,
        email: None,
        previous_conversations: 0,
    }
}

pub fn subject() -> SubjectId {
    SubjectId::new("+573001112233").unwrap()
}

pub struct Harness {
    pub lifecycle: LifecycleActions,
    pub repository: Arc<InMemoryConversationRepository>,
    pub clock: ManualClock,
    pub locks: ConversationLocks,
}

impl Harness {
    /// 12h timeout, 10h warning, 30 messages for every tier.
    pub fn new() -> Self {
        Self::with_policies(TierPolicies::uniform(TimeoutPolicy::new(12, 10, 30)))
    }

    pub fn with_policies(policies: TierPolicies) -> Self {
        let directory = Arc::new(InMemoryClientDirectory::with_clients(vec![client()]));
        let registries = Registries::builtin(directory, "Laura");
        let flow = load_flow(FLOW, &registries).unwrap();
        let engine = Arc::new(StateMachineEngine::new(
            Arc::new(flow),
            Arc::new(registries),
            IntentCascade::default(),
        ));
        let repository = Arc::new(InMemoryConversationRepository::new());
        let lifecycle = LifecycleActions::new(
            engine,
            repository.clone(),
            LifecycleEvaluator::new(policies),
        );
        Self {
            lifecycle,
            repository,
            clock: ManualClock::new(Timestamp::from_unix_secs(START)),
            locks: ConversationLocks::new(),
        }
    }
}
