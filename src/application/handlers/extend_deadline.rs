//! ExtendDeadline command handler.
//!
//! Grants an open conversation extra hours before the inactivity warning and
//! expiry, announces it to the client and keeps an audit record.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::{ConversationLocks, LifecycleActions};
use crate::domain::conversation::{LifecycleEvent, Message, MessageMetadata};
use crate::domain::foundation::{ConversationId, DomainError};
use crate::ports::{Clock, ExtensionRecord};

/// Command to extend a conversation's deadline.
#[derive(Debug, Clone)]
pub struct ExtendDeadlineCommand {
    pub conversation_id: ConversationId,
    pub hours: u32,
    pub reason: String,
    /// Operator or system that asked for the extension.
    pub requested_by: String,
}

/// Result of a granted extension.
#[derive(Debug, Clone)]
pub struct ExtendDeadlineResult {
    pub record: ExtensionRecord,
    pub message: Message,
}

#[derive(Debug, Clone, Error)]
pub enum ExtendDeadlineError {
    #[error("Validation error: extension hours must be positive")]
    InvalidHours,

    #[error("Validation error: extension reason cannot be empty")]
    EmptyReason,

    #[error("Conversation not found: {0}")]
    NotFound(ConversationId),

    #[error("Conversation already closed: {0}")]
    Closed(ConversationId),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

pub struct ExtendDeadlineHandler {
    lifecycle: LifecycleActions,
    locks: ConversationLocks,
    clock: Arc<dyn Clock>,
}

impl ExtendDeadlineHandler {
    pub fn new(lifecycle: LifecycleActions, locks: ConversationLocks, clock: Arc<dyn Clock>) -> Self {
        Self {
            lifecycle,
            locks,
            clock,
        }
    }

    pub async fn handle(&self, cmd: ExtendDeadlineCommand) -> Result<ExtendDeadlineResult, ExtendDeadlineError> {
        if cmd.hours == 0 {
            return Err(ExtendDeadlineError::InvalidHours);
        }
        let reason = cmd.reason.trim();
        if reason.is_empty() {
            return Err(ExtendDeadlineError::EmptyReason);
        }

        let repository = self.lifecycle.repository();
        let id = cmd.conversation_id;

        let subject = repository
            .load(&id)
            .await?
            .ok_or(ExtendDeadlineError::NotFound(id))?
            .subject()
            .clone();
        let _guard = self.locks.lock(&subject).await;

        let mut conversation = repository
            .load(&id)
            .await?
            .ok_or(ExtendDeadlineError::NotFound(id))?;
        if !conversation.is_active() {
            return Err(ExtendDeadlineError::Closed(id));
        }

        let now = self.clock.now();
        conversation.extend(cmd.hours)?;
        conversation.record_system_message();

        let policy = *self.lifecycle.evaluator().policy_for(&conversation);
        let text = self
            .lifecycle
            .engine()
            .extension_notice(&conversation, &policy, cmd.hours, reason, now);

        let state = conversation.current_state().to_string();
        let message = Message::system(id, text, now)
            .with_states(state.clone(), state)
            .with_metadata(MessageMetadata {
                extension_hours: Some(cmd.hours),
                extension_reason: Some(reason.to_string()),
                ..MessageMetadata::event(LifecycleEvent::Extension)
            });

        let record = ExtensionRecord {
            conversation_id: id,
            hours: cmd.hours,
            reason: reason.to_string(),
            requested_by: cmd.requested_by,
            total_extension_hours: conversation.extension_hours(),
            recorded_at: now,
        };
        repository.commit_extension(&conversation, &message, &record).await?;

        info!(
            conversation_id = %id,
            hours = cmd.hours,
            total = record.total_extension_hours,
            requested_by = %record.requested_by,
            "Deadline extended"
        );

        Ok(ExtendDeadlineResult { record, message })
    }
}
