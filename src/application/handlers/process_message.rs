//! ProcessMessage command handler.
//!
//! The request path: one inbound client message in, one outbound reply out.
//! Finds or opens the subject's conversation, closes it first if it is
//! already due, otherwise runs one engine turn and commits the new state
//! with both messages.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::application::{ConversationLocks, LifecycleActions};
use crate::domain::conversation::{Conversation, Message, MessageMetadata};
use crate::domain::foundation::{ConversationId, DomainError, SubjectId};
use crate::domain::lifecycle::TierResolver;
use crate::ports::Clock;

/// A message received from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub subject: SubjectId,
    pub text: String,
}

impl InboundMessage {
    pub fn new(subject: SubjectId, text: impl Into<String>) -> Self {
        Self {
            subject,
            text: text.into(),
        }
    }
}

/// The reply handed back to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub conversation_id: ConversationId,
    pub text: String,
    pub quick_replies: Vec<String>,
    /// Flow state the conversation is on after this message.
    pub state: String,
    /// True when this reply is the conversation's farewell.
    pub closed: bool,
}

/// Errors that can occur when processing a message.
#[derive(Debug, Clone, Error)]
pub enum ProcessMessageError {
    /// Message text is empty or whitespace only.
    #[error("Validation error: message text cannot be empty")]
    EmptyMessage,

    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl ProcessMessageError {
    /// True if retrying the same message may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, ProcessMessageError::Domain(err) if err.is_transient())
    }
}

/// Handler for inbound client messages.
#[derive(Clone)]
pub struct ProcessMessageHandler {
    lifecycle: LifecycleActions,
    locks: ConversationLocks,
    clock: Arc<dyn Clock>,
    tiers: TierResolver,
}

impl ProcessMessageHandler {
    pub fn new(
        lifecycle: LifecycleActions,
        locks: ConversationLocks,
        clock: Arc<dyn Clock>,
        tiers: TierResolver,
    ) -> Self {
        Self {
            lifecycle,
            locks,
            clock,
            tiers,
        }
    }

    pub async fn handle(&self, inbound: InboundMessage) -> Result<OutboundMessage, ProcessMessageError> {
        let text = inbound.text.trim();
        if text.is_empty() {
            return Err(ProcessMessageError::EmptyMessage);
        }

        let _guard = self.locks.lock(&inbound.subject).await;
        let now = self.clock.now();
        let engine = self.lifecycle.engine();
        let repository = self.lifecycle.repository();

        let mut conversation = match repository.find_active_by_subject(&inbound.subject).await? {
            Some(existing) => existing,
            None => {
                let started = Conversation::start(
                    inbound.subject.clone(),
                    engine.flow().initial_state(),
                    engine.initial_context(),
                    now,
                );
                info!(
                    conversation_id = %started.id(),
                    subject = %inbound.subject,
                    "Conversation started"
                );
                started
            }
        };

        // 1. A conversation already due for closure gets its farewell instead of a turn
        if let Some(reason) = self.lifecycle.due_closure(&conversation, now) {
            debug!(
                conversation_id = %conversation.id(),
                reason = %reason,
                "Closing on arrival"
            );
            let farewell = self.lifecycle.close(&mut conversation, reason, now).await?;
            return Ok(OutboundMessage {
                conversation_id: conversation.id(),
                text: farewell.text,
                quick_replies: Vec::new(),
                state: conversation.current_state().to_string(),
                closed: true,
            });
        }

        // 2. Run the turn
        conversation.record_user_message(now)?;
        let outcome = engine
            .transition_from(conversation.id(), conversation.current_state(), text, conversation.context())
            .await?;

        conversation.apply_transition(&outcome.next_state, outcome.context, now)?;
        let tier = self.tiers.resolve(conversation.context(), conversation.tier());
        conversation.set_tier(tier);

        // 3. Record both sides of the exchange
        let user_message = Message::user(conversation.id(), text, now)
            .with_states(&outcome.previous_state, &outcome.next_state)
            .with_metadata(MessageMetadata {
                classification: outcome.classification,
                ..MessageMetadata::default()
            });
        let mut messages = vec![user_message];

        if !outcome.message.is_empty() {
            conversation.record_system_message();
            messages.push(
                Message::system(conversation.id(), &outcome.message, now)
                    .with_states(&outcome.previous_state, &outcome.next_state)
                    .with_metadata(MessageMetadata {
                        side_effects: outcome.side_effects,
                        ..MessageMetadata::default()
                    }),
            );
        }

        // 4. Persist state and messages as one unit
        repository.commit_turn(&conversation, &messages).await?;

        info!(
            conversation_id = %conversation.id(),
            from = %outcome.previous_state,
            to = %outcome.next_state,
            tier = %conversation.tier(),
            "Message processed"
        );

        Ok(OutboundMessage {
            conversation_id: conversation.id(),
            text: outcome.message,
            quick_replies: outcome.quick_replies,
            state: outcome.next_state,
            closed: false,
        })
    }
}
