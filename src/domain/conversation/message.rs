//! Append-only message records.

use serde::{Deserialize, Serialize};

use super::CloseReason;
use crate::domain::classification::ClassificationResult;
use crate::domain::foundation::{ConversationId, MessageId, Timestamp};

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    System,
}

/// Lifecycle events that produce system messages outside a normal turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEvent {
    Warning,
    Closure,
    Extension,
    NodeTimeout,
}

/// Structured annotations stored with a message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<ClassificationResult>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close_reason: Option<CloseReason>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifecycle_event: Option<LifecycleEvent>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension_hours: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension_reason: Option<String>,

    /// Actions executed while producing this message, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub side_effects: Vec<String>,
}

impl MessageMetadata {
    pub fn closure(reason: CloseReason) -> Self {
        Self {
            close_reason: Some(reason),
            lifecycle_event: Some(LifecycleEvent::Closure),
            ..Self::default()
        }
    }

    pub fn event(event: LifecycleEvent) -> Self {
        Self {
            lifecycle_event: Some(event),
            ..Self::default()
        }
    }
}

/// An immutable message within a conversation.
///
/// # Invariants
///
/// - `id` is globally unique
/// - `created_at` never changes; per-conversation order follows it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender: Sender,
    pub text: String,
    pub created_at: Timestamp,
    pub previous_state: Option<String>,
    pub next_state: Option<String>,
    #[serde(default)]
    pub metadata: MessageMetadata,
}

impl Message {
    /// A message sent by the client.
    pub fn user(conversation_id: ConversationId, text: impl Into<String>, at: Timestamp) -> Self {
        Self::new(conversation_id, Sender::User, text.into(), at)
    }

    /// A message produced by the engine or the lifecycle sweep.
    pub fn system(conversation_id: ConversationId, text: impl Into<String>, at: Timestamp) -> Self {
        Self::new(conversation_id, Sender::System, text.into(), at)
    }

    fn new(conversation_id: ConversationId, sender: Sender, text: String, at: Timestamp) -> Self {
        Self {
            id: MessageId::new(),
            conversation_id,
            sender,
            text,
            created_at: at,
            previous_state: None,
            next_state: None,
            metadata: MessageMetadata::default(),
        }
    }

    pub fn with_states(mut self, previous: impl Into<String>, next: impl Into<String>) -> Self {
        self.previous_state = Some(previous.into());
        self.next_state = Some(next.into());
        self
    }

    pub fn with_metadata(mut self, metadata: MessageMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn is_from_user(&self) -> bool {
        self.sender == Sender::User
    }
}
