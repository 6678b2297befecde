//! Lifecycle steps shared by the request path, the sweep and manual commands.
//!
//! Each step renders its system message through the engine, applies the
//! matching conversation mutation and commits both as one unit. The caller
//! holds the conversation's lock.

use std::sync::Arc;

use tracing::info;

use crate::domain::conversation::{CloseReason, Conversation, LifecycleEvent, Message, MessageMetadata};
use crate::domain::engine::StateMachineEngine;
use crate::domain::foundation::{DomainError, Timestamp};
use crate::domain::lifecycle::{LifecycleDecision, LifecycleEvaluator};
use crate::ports::ConversationRepository;

/// Applies lifecycle decisions to conversations.
#[derive(Clone)]
pub struct LifecycleActions {
    engine: Arc<StateMachineEngine>,
    repository: Arc<dyn ConversationRepository>,
    evaluator: LifecycleEvaluator,
}

impl LifecycleActions {
    pub fn new(
        engine: Arc<StateMachineEngine>,
        repository: Arc<dyn ConversationRepository>,
        evaluator: LifecycleEvaluator,
    ) -> Self {
        Self {
            engine,
            repository,
            evaluator,
        }
    }

    pub fn engine(&self) -> &StateMachineEngine {
        &self.engine
    }

    pub fn evaluator(&self) -> &LifecycleEvaluator {
        &self.evaluator
    }

    pub fn repository(&self) -> &Arc<dyn ConversationRepository> {
        &self.repository
    }

    /// What is due for `conversation` at `now`.
    pub fn decide(&self, conversation: &Conversation, now: Timestamp) -> LifecycleDecision {
        self.evaluator.evaluate(conversation, self.engine.flow(), now)
    }

    /// Why `conversation` must close before it may take another turn.
    pub fn due_closure(&self, conversation: &Conversation, now: Timestamp) -> Option<CloseReason> {
        self.evaluator
            .close_reason(conversation, self.engine.flow(), now)
    }

    /// Applies `decision`. Returns the system message it produced, if any.
    pub async fn apply(
        &self,
        conversation: &mut Conversation,
        decision: &LifecycleDecision,
        now: Timestamp,
    ) -> Result<Option<Message>, DomainError> {
        match decision {
            LifecycleDecision::Keep => Ok(None),
            LifecycleDecision::Warn { .. } => self.warn(conversation, now).await.map(Some),
            LifecycleDecision::Close(reason) => self.close(conversation, *reason, now).await.map(Some),
            LifecycleDecision::NodeTimeout { target } => {
                self.node_timeout(conversation, target, now).await.map(Some)
            }
        }
    }

    /// Sends the inactivity warning and marks the conversation `Warned`.
    pub async fn warn(&self, conversation: &mut Conversation, now: Timestamp) -> Result<Message, DomainError> {
        let policy = *self.evaluator.policy_for(conversation);
        let text = self.engine.warning_notice(conversation, &policy, now);

        let mut updated = conversation.clone();
        updated.mark_warned(now)?;
        updated.record_system_message();

        let state = updated.current_state().to_string();
        let message = Message::system(updated.id(), text, now)
            .with_states(state.clone(), state)
            .with_metadata(MessageMetadata::event(LifecycleEvent::Warning));

        self.repository.commit_turn(&updated, &[message.clone()]).await?;
        info!(
            conversation_id = %updated.id(),
            tier = %updated.tier(),
            "Inactivity warning sent"
        );
        *conversation = updated;
        Ok(message)
    }

    /// Renders the farewell for `reason` and closes the conversation.
    pub async fn close(
        &self,
        conversation: &mut Conversation,
        reason: CloseReason,
        now: Timestamp,
    ) -> Result<Message, DomainError> {
        let policy = *self.evaluator.policy_for(conversation);
        let farewell = self.engine.farewell(conversation, reason, &policy, now).await;

        let mut updated = conversation.clone();
        let state = updated.current_state().to_string();
        updated.apply_transition(state.clone(), farewell.context, now)?;
        updated.record_system_message();
        updated.close(reason, now)?;

        let metadata = MessageMetadata {
            side_effects: farewell.side_effects,
            ..MessageMetadata::closure(reason)
        };
        let message = Message::system(updated.id(), farewell.text, now)
            .with_states(state.clone(), state)
            .with_metadata(metadata);

        self.repository.commit_turn(&updated, &[message.clone()]).await?;
        info!(
            conversation_id = %updated.id(),
            reason = %reason,
            message_count = updated.message_count(),
            "Conversation closed"
        );
        *conversation = updated;
        Ok(message)
    }

    /// Moves the conversation to `target` and sends that node's message.
    pub async fn node_timeout(
        &self,
        conversation: &mut Conversation,
        target: &str,
        now: Timestamp,
    ) -> Result<Message, DomainError> {
        let rendered = self.engine.render_node(target, conversation.context());

        let mut updated = conversation.clone();
        let previous = updated.current_state().to_string();
        let context = updated.context().clone();
        updated.apply_transition(target, context, now)?;
        updated.record_system_message();

        let message = Message::system(updated.id(), rendered.text, now)
            .with_states(previous.clone(), target)
            .with_metadata(MessageMetadata::event(LifecycleEvent::NodeTimeout));

        self.repository.commit_turn(&updated, &[message.clone()]).await?;
        info!(
            conversation_id = %updated.id(),
            from = %previous,
            to = target,
            "Node timed out"
        );
        *conversation = updated;
        Ok(message)
    }
}
