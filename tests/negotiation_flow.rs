//! Integration tests for the request path over the shipped negotiation flow.
//!
//! Each test drives a conversation through `ProcessMessageHandler` exactly
//! as a transport would, then inspects what was stored.

mod common;

use common::TestApp;
use parley::domain::conversation::{CloseReason, Sender};
use parley::domain::lifecycle::Tier;
use parley::ports::ConversationRepository;

const ANA: &str = "+573001112233";

// =============================================================================
// Happy path
// =============================================================================

#[tokio::test]
async fn full_negotiation_reaches_agreement_and_closes() {
    let app = TestApp::new();

    let reply = app.say(ANA, "hola").await;
    assert_eq!(reply.state, "ask_document");
    assert!(reply.text.contains("número de cédula"));

    let reply = app.say(ANA, "mi cédula es 93388915").await;
    assert_eq!(reply.state, "present_debt");
    assert!(reply.text.starts_with("Hola Ana Torres, tienes un saldo pendiente de $1.500.000"));

    let reply = app.say(ANA, "sí").await;
    assert_eq!(reply.state, "show_offers");
    assert!(reply.text.contains("$1.050.000"));
    assert!(reply.text.contains("Dos cuotas de $750.000"));
    assert!(reply.text.contains("Seis cuotas de $250.000"));

    let reply = app.say(ANA, "la dos").await;
    assert_eq!(reply.state, "confirm_plan");
    assert!(reply.text.contains("\"Dos cuotas\""));
    assert!(reply.text.contains("$750.000"));

    let reply = app.say(ANA, "confirmo").await;
    assert_eq!(reply.state, "agreement_reached");
    assert!(!reply.closed);

    // The sweep closes completed negotiations on its next pass
    let report = app.parley.sweeper.sweep_once().await.unwrap();
    assert_eq!(report.closed, 1);

    let conversation = app.repository.load(&reply.conversation_id).await.unwrap().unwrap();
    assert_eq!(conversation.close_reason(), Some(CloseReason::NegotiationCompleted));
    assert_eq!(conversation.tier(), Tier::Default);

    let messages = app.repository.messages(&reply.conversation_id).await.unwrap();
    assert_eq!(messages.len(), 11);
    let farewell = messages.last().unwrap();
    assert_eq!(farewell.sender, Sender::System);
    assert!(farewell.text.starts_with("Hola Ana Torres, damos por finalizada esta negociación"));
}

#[tokio::test]
async fn document_in_first_message_skips_the_question() {
    let app = TestApp::new();

    let reply = app.say(ANA, "Buenas, mi cc es 93388915").await;

    assert_eq!(reply.state, "present_debt");
}

// =============================================================================
// Alternative paths
// =============================================================================

#[tokio::test]
async fn unknown_document_asks_again() {
    let app = TestApp::new();
    app.say(ANA, "hola").await;

    let reply = app.say(ANA, "12345678").await;

    assert_eq!(reply.state, "ask_document");
    let messages = app.repository.messages(&reply.conversation_id).await.unwrap();
    let last = messages.last().unwrap();
    assert!(last.metadata.side_effects[0].starts_with("lookup_client: failed"));
}

#[tokio::test]
async fn unclear_plan_choice_gets_help_then_recovers() {
    let app = TestApp::new();
    app.say(ANA, "93388915").await;
    app.say(ANA, "si").await;

    let reply = app.say(ANA, "mmm no se").await;
    assert_eq!(reply.state, "offers_help");

    let reply = app.say(ANA, "1").await;
    assert_eq!(reply.state, "confirm_plan");
    assert!(reply.text.contains("Pago único con 30% de descuento"));
}

#[tokio::test]
async fn objection_menu_hands_off_to_supervisor() {
    let app = TestApp::new();
    app.say(ANA, "93388915").await;

    let reply = app.say(ANA, "no").await;
    assert_eq!(reply.state, "handle_objection");
    assert_eq!(reply.quick_replies.len(), 2);

    let reply = app.say(ANA, "2").await;
    assert_eq!(reply.state, "advisor_handoff");

    let reply = app.say(ANA, "llámenme en la tarde").await;
    assert_eq!(reply.state, "handoff_done");
    assert_eq!(reply.text, "Gracias. Laura revisará tu caso y te contactará pronto.");

    // A handed-off negotiation is finished from the bot's side
    let report = app.parley.sweeper.sweep_once().await.unwrap();
    assert_eq!(report.closed, 1);
    let conversation = app.repository.load(&reply.conversation_id).await.unwrap().unwrap();
    assert_eq!(conversation.close_reason(), Some(CloseReason::NegotiationCompleted));
    assert!(app.repository.find_active_by_subject(conversation.subject()).await.unwrap().is_none());
}

#[tokio::test]
async fn objection_menu_accepts_option_label() {
    let app = TestApp::new();
    app.say(ANA, "93388915").await;
    app.say(ANA, "no").await;

    let reply = app.say(ANA, "ver opciones de pago").await;

    assert_eq!(reply.state, "show_offers");
    assert!(reply.text.contains("$1.050.000"));
}

// =============================================================================
// Tiers and isolation
// =============================================================================

#[tokio::test]
async fn large_balance_moves_conversation_to_premium() {
    let app = TestApp::new();

    let reply = app.say("+573105550000", "1020304050").await;

    let conversation = app.repository.load(&reply.conversation_id).await.unwrap().unwrap();
    assert_eq!(conversation.tier(), Tier::Premium);
}

#[tokio::test]
async fn subjects_have_independent_conversations() {
    let app = TestApp::new();

    let ana = app.say(ANA, "93388915").await;
    let other = app.say("+573105550000", "hola").await;

    assert_ne!(ana.conversation_id, other.conversation_id);
    assert_eq!(ana.state, "present_debt");
    assert_eq!(other.state, "ask_document");
}
