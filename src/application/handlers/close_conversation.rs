//! CloseConversationHandler - Operator-initiated closure

use std::sync::Arc;

use crate::application::{ConversationLocks, LifecycleActions};
use crate::domain::conversation::{CloseReason, Message};
use crate::domain::foundation::{ConversationId, DomainError};
use crate::ports::Clock;

/// Command to close a conversation now.
#[derive(Debug, Clone)]
pub struct CloseConversationCommand {
    pub conversation_id: ConversationId,
    pub reason: CloseReason,
}

impl CloseConversationCommand {
    pub fn new(conversation_id: ConversationId) -> Self {
        Self {
            conversation_id,
            reason: CloseReason::Generic,
        }
    }
}

/// Error type for closing conversations
#[derive(Debug, Clone)]
pub enum CloseConversationError {
    /// Conversation not found
    NotFound(ConversationId),
    /// Conversation was closed before this command ran
    AlreadyClosed(ConversationId),
    /// Domain error
    Domain(DomainError),
}

impl std::fmt::Display for CloseConversationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CloseConversationError::NotFound(id) => write!(f, "Conversation not found: {}", id),
            CloseConversationError::AlreadyClosed(id) => {
                write!(f, "Conversation already closed: {}", id)
            }
            CloseConversationError::Domain(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for CloseConversationError {}

impl From<DomainError> for CloseConversationError {
    fn from(err: DomainError) -> Self {
        CloseConversationError::Domain(err)
    }
}

/// Handler for closing conversations
pub struct CloseConversationHandler {
    lifecycle: LifecycleActions,
    locks: ConversationLocks,
    clock: Arc<dyn Clock>,
}

impl CloseConversationHandler {
    pub fn new(lifecycle: LifecycleActions, locks: ConversationLocks, clock: Arc<dyn Clock>) -> Self {
        Self {
            lifecycle,
            locks,
            clock,
        }
    }

    /// Closes the conversation and returns its farewell message.
    pub async fn handle(&self, cmd: CloseConversationCommand) -> Result<Message, CloseConversationError> {
        let repository = self.lifecycle.repository();
        let id = cmd.conversation_id;

        // 1. Find the subject to lock on
        let subject = repository
            .load(&id)
            .await?
            .ok_or(CloseConversationError::NotFound(id))?
            .subject()
            .clone();
        let _guard = self.locks.lock(&subject).await;

        // 2. Reload under the lock; a turn may have landed meanwhile
        let mut conversation = repository
            .load(&id)
            .await?
            .ok_or(CloseConversationError::NotFound(id))?;
        if !conversation.is_active() {
            return Err(CloseConversationError::AlreadyClosed(id));
        }

        // 3. Farewell and close
        let message = self
            .lifecycle
            .close(&mut conversation, cmd.reason, self.clock.now())
            .await?;
        Ok(message)
    }
}
