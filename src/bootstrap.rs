//! Wires configuration, adapters and handlers into a running service.
//!
//! Everything that can be wrong in configuration or data files fails here,
//! before the first message is accepted.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::adapters::directory::SeedError;
use crate::adapters::{InMemoryClientDirectory, OpenAiClassifierConfig, OpenAiIntentClassifier};
use crate::application::{
    CloseConversationHandler, ConversationLocks, ExtendDeadlineHandler, LifecycleActions,
    LifecycleSweeper, LifecycleSweeperConfig, ProcessMessageHandler,
};
use crate::config::{AppConfig, ConfigError, ValidationError};
use crate::domain::classification::{IntentCascade, NaiveBayesModel, RuleTier, TrainingError};
use crate::domain::dispatch::Registries;
use crate::domain::engine::StateMachineEngine;
use crate::domain::flow::{load_flow_file, FlowConfigError};
use crate::domain::lifecycle::LifecycleEvaluator;
use crate::ports::{ClassificationError, ClientDirectory, Clock, ConversationRepository};

/// Reasons the service refuses to start.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(#[from] ValidationError),

    #[error("invalid flow definition: {0}")]
    Flow(#[from] FlowConfigError),

    #[error("cannot train local classifier: {0}")]
    Training(#[from] TrainingError),

    #[error("cannot seed client directory: {0}")]
    Seed(#[from] SeedError),

    #[error("cannot build remote classifier: {0}")]
    Classifier(#[from] ClassificationError),
}

/// The assembled service.
pub struct Parley {
    pub engine: Arc<StateMachineEngine>,
    pub process_message: ProcessMessageHandler,
    pub extend_deadline: ExtendDeadlineHandler,
    pub close_conversation: CloseConversationHandler,
    pub sweeper: LifecycleSweeper,
}

impl Parley {
    /// Builds the service from validated configuration.
    ///
    /// The client directory comes from `flow.clients_path` when set, and is
    /// empty otherwise. Storage and time are supplied by the caller.
    pub fn build(
        config: &AppConfig,
        repository: Arc<dyn ConversationRepository>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, StartupError> {
        config.validate()?;

        let directory = match &config.flow.clients_path {
            Some(path) => InMemoryClientDirectory::from_yaml_file(path)?,
            None => InMemoryClientDirectory::new(),
        };
        info!(clients = directory.len(), "Client directory ready");
        let directory: Arc<dyn ClientDirectory> = Arc::new(directory);

        let registries = Registries::builtin(directory, config.flow.supervisor.clone());
        let flow = load_flow_file(&config.flow.path, &registries)?;
        let cascade = build_cascade(config)?;

        let engine = Arc::new(StateMachineEngine::new(
            Arc::new(flow),
            Arc::new(registries),
            cascade,
        ));
        let lifecycle = LifecycleActions::new(
            engine.clone(),
            repository,
            LifecycleEvaluator::new(config.lifecycle.policies),
        );
        let locks = ConversationLocks::new();

        let sweeper = LifecycleSweeper::with_config(
            lifecycle.clone(),
            locks.clone(),
            clock.clone(),
            LifecycleSweeperConfig::default()
                .with_interval(config.lifecycle.sweep_interval())
                .with_lease(config.lifecycle.lease())
                .with_concurrency(config.lifecycle.concurrency),
        );

        Ok(Self {
            engine,
            process_message: ProcessMessageHandler::new(
                lifecycle.clone(),
                locks.clone(),
                clock.clone(),
                config.lifecycle.tiers,
            ),
            extend_deadline: ExtendDeadlineHandler::new(lifecycle.clone(), locks.clone(), clock.clone()),
            close_conversation: CloseConversationHandler::new(lifecycle, locks, clock),
            sweeper,
        })
    }
}

fn build_cascade(config: &AppConfig) -> Result<IntentCascade, StartupError> {
    let settings = &config.classifier;
    let mut cascade = IntentCascade::new(RuleTier::default());

    if let Some(path) = &settings.training_path {
        let model = NaiveBayesModel::from_yaml_file(path)?;
        info!(
            path = %path.display(),
            labels = model.labels().count(),
            threshold = settings.local_threshold,
            "Local classifier trained"
        );
        cascade = cascade.with_local_model(model, settings.local_threshold);
    }

    if let Some(api_key) = settings.remote_api_key.clone().filter(|_| settings.has_remote()) {
        let remote = OpenAiIntentClassifier::new(
            OpenAiClassifierConfig::from_secret(api_key)
                .with_model(settings.remote_model.clone())
                .with_base_url(settings.remote_base_url.clone()),
        )?;
        info!(
            model = %settings.remote_model,
            deadline_ms = settings.remote_deadline_ms,
            "Remote classifier enabled"
        );
        cascade = cascade.with_remote(Arc::new(remote), settings.remote_deadline());
    }

    Ok(cascade)
}
