//! Shared setup for the integration tests: the shipped flow, intents and
//! client seed, wired over in-memory storage and a manual clock.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use parley::adapters::{InMemoryConversationRepository, ManualClock};
use parley::application::{InboundMessage, OutboundMessage};
use parley::config::{AppConfig, ClassifierConfig, FlowConfig};
use parley::domain::foundation::{SubjectId, Timestamp};
use parley::domain::lifecycle::TierPolicies;
use parley::Parley;

pub const START: u64 = 1_700_000_000;

pub struct TestApp {
    pub parley: Parley,
    pub repository: Arc<InMemoryConversationRepository>,
    pub clock: ManualClock,
}

fn flows_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("flows")
}

pub fn config() -> AppConfig {
    AppConfig {
        flow: FlowConfig {
            path: flows_dir().join("negotiation.yaml"),
            clients_path: Some(flows_dir().join("clients.yaml")),
            supervisor: "Laura".to_string(),
        },
        classifier: ClassifierConfig {
            training_path: Some(flows_dir().join("intents.yaml")),
            ..ClassifierConfig::default()
        },
        ..AppConfig::default()
    }
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(config())
    }

    pub fn with_policies(policies: TierPolicies) -> Self {
        let mut config = config();
        config.lifecycle.policies = policies;
        Self::with_config(config)
    }

    pub fn with_config(config: AppConfig) -> Self {
        let repository = Arc::new(InMemoryConversationRepository::new());
        let clock = ManualClock::new(Timestamp::from_unix_secs(START));
        let parley = Parley::build(&config, repository.clone(), Arc::new(clock.clone()))
            .expect("shipped flow and seed data must load");
        Self {
            parley,
            repository,
            clock,
        }
    }

    pub async fn say(&self, subject: &str, text: &str) -> OutboundMessage {
        self.parley
            .process_message
            .handle(InboundMessage::new(SubjectId::new(subject).unwrap(), text))
            .await
            .unwrap()
    }
}
