use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;

use super::*;
use crate::adapters::classifier::MockIntentClassifier;
use crate::adapters::directory::InMemoryClientDirectory;
use crate::domain::classification::{intents, ClassificationResult, Intent, IntentCascade, RuleTier, TierSource};
use crate::domain::conversation::{CloseReason, Context, Conversation};
use crate::domain::dispatch::{ActionRegistry, ConditionRegistry, ContextFlagCondition, Registries};
use crate::domain::flow::load_flow;
use crate::domain::foundation::{ConversationId, SubjectId, Timestamp};
use crate::domain::lifecycle::TimeoutPolicy;
use crate::ports::ClientRecord;

fn registries() -> Registries {
    let directory = Arc::new(InMemoryClientDirectory::with_clients(vec![ClientRecord {
        document_number: "93388915".into(),
        name: "Ana Torres".into(),
        balance: 1_500_000.0,
        phone: Some("3001234567".into()),
        email: Some("ana@example.com".into()),
        previous_conversations: 0,
    }]));
    let mut conditions = ConditionRegistry::builtin();
    conditions.register(ContextFlagCondition::for_flag("x"));
    Registries::new(conditions, ActionRegistry::builtin(directory, "Laura"))
}

fn engine_with(yaml: &str, cascade: IntentCascade) -> StateMachineEngine {
    let registries = registries();
    let flow = load_flow(yaml, &registries).unwrap();
    StateMachineEngine::new(Arc::new(flow), Arc::new(registries), cascade)
}

fn engine(yaml: &str) -> StateMachineEngine {
    engine_with(yaml, IntentCascade::default())
}

async fn turn(engine: &StateMachineEngine, state: &str, input: &str, context: &Context) -> TransitionOutcome {
    engine
        .transition_from(ConversationId::new(), state, input, context)
        .await
        .unwrap()
}

const BRANCHING: &str = r#"
initial_state: a
states:
  a: { message: "A", next: b }
  b: { message: "B", condition: x, true_next: c, false_next: d }
  c: { message: "C for {{client_name}}" }
  d: { message: "D" }
"#;

mod direct_and_conditional {
    use super::*;

    #[tokio::test]
    async fn direct_moves_to_next_and_renders_it() {
        let outcome = turn(&engine(BRANCHING), "a", "anything", &Context::new()).await;
        assert_eq!(outcome.previous_state, "a");
        assert_eq!(outcome.next_state, "b");
        assert_eq!(outcome.message, "B");
    }

    #[tokio::test]
    async fn true_flag_takes_true_branch() {
        let mut context = Context::new();
        context.set_flag("x", true);
        context.insert("client_name", "Ana");

        let outcome = turn(&engine(BRANCHING), "b", "", &context).await;

        assert_eq!(outcome.next_state, "c");
        assert_eq!(outcome.message, "C for Ana");
        assert_eq!(outcome.classification, None);
    }

    #[tokio::test]
    async fn false_or_missing_flag_takes_false_branch() {
        let engine = engine(BRANCHING);

        let mut context = Context::new();
        context.set_flag("x", false);
        assert_eq!(turn(&engine, "b", "", &context).await.next_state, "d");

        assert_eq!(turn(&engine, "b", "", &Context::new()).await.next_state, "d");
    }

    #[tokio::test]
    async fn unknown_state_is_an_error() {
        let err = engine(BRANCHING)
            .transition_from(ConversationId::new(), "gone", "", &Context::new())
            .await
            .unwrap_err();
        assert_eq!(err.code, crate::domain::foundation::ErrorCode::StateNotFound);
    }

    #[tokio::test]
    async fn render_from_current_uses_handling_node() {
        let yaml = format!("settings: {{ render_from: current }}\n{BRANCHING}");
        let outcome = turn(&engine(&yaml), "a", "", &Context::new()).await;
        assert_eq!(outcome.next_state, "b");
        assert_eq!(outcome.message, "A");
    }
}

mod actions {
    use super::*;

    const LOOKUP: &str = r#"
initial_state: welcome
states:
  welcome:
    action: lookup_client
    condition: lookup_success
    true_next: found
    false_next: ask_again
  found: { message: "Hola {{client_name}}, debes {{balance|currency}}" }
  ask_again: { message: "No encontramos tu documento" }
"#;

    #[tokio::test]
    async fn action_result_feeds_condition() {
        let outcome = turn(&engine(LOOKUP), "welcome", "cc 93388915", &Context::new()).await;

        assert_eq!(outcome.next_state, "found");
        assert_eq!(outcome.message, "Hola Ana Torres, debes $1.500.000");
        assert_eq!(outcome.context.flag("lookup_success"), Some(true));
        assert_eq!(outcome.side_effects, vec!["lookup_client: ok".to_string()]);
    }

    #[tokio::test]
    async fn failed_action_takes_false_branch() {
        let outcome = turn(&engine(LOOKUP), "welcome", "11223344", &Context::new()).await;

        assert_eq!(outcome.next_state, "ask_again");
        assert_eq!(outcome.context.flag("lookup_success"), Some(false));
        assert!(!outcome.context.contains("client_name"));
        assert!(outcome.side_effects[0].starts_with("lookup_client: failed"));
    }

    #[tokio::test]
    async fn input_context_is_not_mutated() {
        let context = Context::new();
        let _ = turn(&engine(LOOKUP), "welcome", "93388915", &context).await;
        assert!(context.is_empty());
    }
}

mod classified_conditions {
    use super::*;

    const CONFIRM: &str = r#"
initial_state: ask
states:
  ask: { message: "¿Aceptas?", condition: client_confirms, true_next: yes_node, false_next: no_node }
  yes_node: { message: "Listo" }
  no_node: { message: "Entendido" }
"#;

    #[tokio::test]
    async fn rule_tier_confirmation() {
        let outcome = turn(&engine(CONFIRM), "ask", "Sí", &Context::new()).await;
        assert_eq!(outcome.next_state, "yes_node");
        assert_eq!(outcome.classification.unwrap().source, TierSource::Rule);
    }

    #[tokio::test]
    async fn no_classification_uses_condition_default() {
        let outcome = turn(&engine(CONFIRM), "ask", "mmm tal vez otro dia", &Context::new()).await;
        assert_eq!(outcome.next_state, "no_node");
        assert!(outcome.classification.is_none());
    }

    #[tokio::test]
    async fn remote_tier_answers_when_rules_do_not() {
        let remote = MockIntentClassifier::new().with_result(ClassificationResult::new(
            Intent::new(intents::CONFIRMATION),
            0.92,
            TierSource::Remote,
        ));
        let cascade = IntentCascade::new(RuleTier::default())
            .with_remote(Arc::new(remote.clone()), Duration::from_millis(200));

        let outcome = turn(&engine_with(CONFIRM, cascade), "ask", "bueno, hagamoslo", &Context::new()).await;

        assert_eq!(outcome.next_state, "yes_node");
        assert_eq!(remote.call_count(), 1);
    }

    #[tokio::test]
    async fn remote_timeout_falls_back_to_default() {
        let remote = MockIntentClassifier::new()
            .with_result(ClassificationResult::new(
                Intent::new(intents::CONFIRMATION),
                0.99,
                TierSource::Remote,
            ))
            .with_delay(Duration::from_millis(500));
        let cascade = IntentCascade::new(RuleTier::default())
            .with_remote(Arc::new(remote), Duration::from_millis(20));

        let outcome = turn(&engine_with(CONFIRM, cascade), "ask", "bueno, hagamoslo", &Context::new()).await;

        assert_eq!(outcome.next_state, "no_node");
    }
}

mod menus {
    use super::*;

    const MENU: &str = r#"
initial_state: plans
states:
  plans:
    message: "Elige un plan"
    options:
      1: { message: "Pago único", next: single }
      2: { message: "Dos cuotas", next: split, intents: [PLAN_REQUEST] }
  single: { message: "Elegiste pago único" }
  split: { message: "Elegiste cuotas" }
  help: { message: "Responde 1 o 2" }
"#;

    #[tokio::test]
    async fn matches_key() {
        let outcome = turn(&engine(MENU), "plans", " 1 ", &Context::new()).await;
        assert_eq!(outcome.next_state, "single");
        assert_eq!(outcome.context.get_str("selected_option"), Some("1"));
    }

    #[tokio::test]
    async fn matches_label_ignoring_accents_and_case() {
        let outcome = turn(&engine(MENU), "plans", "PAGO UNICO", &Context::new()).await;
        assert_eq!(outcome.next_state, "single");
    }

    #[tokio::test]
    async fn matches_option_intent_through_cascade() {
        let remote = MockIntentClassifier::new().with_result(ClassificationResult::new(
            Intent::new(intents::PLAN_REQUEST),
            0.8,
            TierSource::Remote,
        ));
        let cascade = IntentCascade::new(RuleTier::default())
            .with_remote(Arc::new(remote.clone()), Duration::from_millis(200));

        let outcome = turn(&engine_with(MENU, cascade), "plans", "quiero pagar por partes", &Context::new()).await;

        assert_eq!(outcome.next_state, "split");
        assert_eq!(outcome.context.get_str("selected_option"), Some("2"));
        let expected = &remote.calls()[0].expected;
        assert!(expected.contains(&Intent::new("PLAN_REQUEST")));
        assert!(expected.contains(&Intent::new("1")));
    }

    #[tokio::test]
    async fn unmatched_re_presents_the_menu() {
        let outcome = turn(&engine(MENU), "plans", "no se", &Context::new()).await;
        assert_eq!(outcome.next_state, "plans");
        assert_eq!(outcome.message, "Elige un plan");
        assert_eq!(outcome.quick_replies, vec!["Pago único", "Dos cuotas"]);
        assert!(!outcome.context.contains("selected_option"));
    }

    #[tokio::test]
    async fn unmatched_follows_on_unmatched() {
        let yaml = MENU.replace("    message: \"Elige un plan\"", "    message: \"Elige un plan\"\n    on_unmatched: help");
        let outcome = turn(&engine(&yaml), "plans", "no se", &Context::new()).await;
        assert_eq!(outcome.next_state, "help");
        assert_eq!(outcome.message, "Responde 1 o 2");
    }
}

mod rendering {
    use super::*;

    #[tokio::test]
    async fn terminal_re_renders_itself() {
        let outcome = turn(&engine(BRANCHING), "d", "hola?", &Context::new()).await;
        assert_eq!(outcome.next_state, "d");
        assert_eq!(outcome.message, "D");
    }

    #[tokio::test]
    async fn node_variables_layer_over_context() {
        let yaml = r#"
initial_state: a
variables: { company: "Cobranzas SA" }
states:
  a: { next: b }
  b:
    message: "{{company}} / {{agent}}"
    variables: { agent: "Laura" }
"#;
        let engine = engine(yaml);
        let context = engine.initial_context();

        let outcome = turn(&engine, "a", "", &context).await;

        assert_eq!(outcome.message, "Cobranzas SA / Laura");
        assert!(!outcome.context.contains("agent"));
    }
}

mod notices {
    use super::*;

    const FLOW: &str = r#"
initial_state: a
lifecycle:
  close_action: escalate_to_supervisor
  messages:
    greeting: "Estimado/a {{client_name}}, "
    anonymous_greeting: "Hola, "
    expired: "{{greeting}}tu sesión expiró tras {{idle_hours}} horas."
    warning: "Quedan {{hours_remaining}} horas."
    extension: "Extendimos {{extension_hours}} horas: {{extension_reason}}"
states:
  a: { message: "A" }
"#;

    fn t0() -> Timestamp {
        Timestamp::from_unix_secs(1_700_000_000)
    }

    fn conversation(name: Option<&str>) -> Conversation {
        let mut context = Context::new();
        if let Some(name) = name {
            context.insert("client_name", name);
        }
        Conversation::start(SubjectId::new("s").unwrap(), "a", context, t0())
    }

    #[tokio::test]
    async fn farewell_runs_close_action_and_greets_by_name() {
        let engine = engine(FLOW);
        let conv = conversation(Some("Ana"));

        let farewell = engine
            .farewell(&conv, CloseReason::Expired, &TimeoutPolicy::new(12, 10, 30), t0().plus_minutes(721))
            .await;

        assert_eq!(farewell.text, "Estimado/a Ana, tu sesión expiró tras 12 horas.");
        assert_eq!(farewell.context.flag("escalated"), Some(true));
        assert_eq!(farewell.side_effects, vec!["escalate_to_supervisor: ok".to_string()]);
    }

    #[tokio::test]
    async fn anonymous_farewell() {
        let farewell = engine(FLOW)
            .farewell(
                &conversation(None),
                CloseReason::Expired,
                &TimeoutPolicy::new(12, 10, 30),
                t0().plus_minutes(721),
            )
            .await;
        assert!(farewell.text.starts_with("Hola, "));
    }

    #[test]
    fn warning_and_extension_texts() {
        let engine = engine(FLOW);
        let mut conv = conversation(None);
        let policy = TimeoutPolicy::new(12, 10, 30);

        assert_eq!(engine.warning_notice(&conv, &policy, t0().plus_minutes(601)), "Quedan 2 horas.");

        conv.extend(6).unwrap();
        assert_eq!(
            engine.extension_notice(&conv, &policy, 6, "pago en proceso", t0()),
            "Extendimos 6 horas: pago en proceso"
        );
    }
}

proptest! {
    #[test]
    fn direct_next_state_ignores_input(input in ".{0,64}") {
        let engine = engine(BRANCHING);
        let outcome = futures::executor::block_on(turn(&engine, "a", &input, &Context::new()));
        prop_assert_eq!(outcome.next_state, "b");
        prop_assert_eq!(outcome.message, "B");
    }

    #[test]
    fn conditional_follows_flag(flag in any::<bool>(), input in "[a-z ]{0,20}") {
        let engine = engine(BRANCHING);
        let mut context = Context::new();
        context.set_flag("x", flag);
        let outcome = futures::executor::block_on(turn(&engine, "b", &input, &context));
        prop_assert_eq!(outcome.next_state, if flag { "c" } else { "d" });
    }
}
