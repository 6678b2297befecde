//! Conversation repository port.
//!
//! Defines the contract for persisting conversations, their message log,
//! sweep leases and deadline extensions. The store is the source of truth;
//! callers always work on copies they loaded.
//!
//! # Design
//!
//! - **Turn atomicity**: `commit_turn` stores the new conversation snapshot
//!   and every message of the turn as one unit; `commit_extension` does the
//!   same for an extension and its audit record
//! - **Append-only log**: messages are never updated or deleted
//! - **Leases**: `try_claim` lets several sweep workers share one store
//!   without processing a conversation twice

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::conversation::{Conversation, Message};
use crate::domain::foundation::{ConversationId, DomainError, SubjectId, Timestamp, WorkerId};

/// Audit entry for a deadline extension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtensionRecord {
    pub conversation_id: ConversationId,
    pub hours: u32,
    pub reason: String,
    pub requested_by: String,
    /// Total extension hours after this one was applied.
    pub total_extension_hours: u32,
    pub recorded_at: Timestamp,
}

/// Repository port for conversations.
#[async_trait]
pub trait ConversationRepository: Send + Sync {
    /// Find a conversation by its ID.
    ///
    /// Returns `None` if not found.
    async fn load(&self, id: &ConversationId) -> Result<Option<Conversation>, DomainError>;

    /// Insert or replace a conversation snapshot.
    ///
    /// # Errors
    ///
    /// - `DatabaseError` on persistence failure
    async fn save(&self, conversation: &Conversation) -> Result<(), DomainError>;

    /// Append one message to a conversation's log.
    ///
    /// # Errors
    ///
    /// - `ConversationNotFound` if the conversation was never saved
    /// - `DatabaseError` on persistence failure
    async fn append_message(&self, message: &Message) -> Result<(), DomainError>;

    /// Store a conversation snapshot and its new messages as one unit.
    ///
    /// Either everything is visible afterwards or nothing is.
    async fn commit_turn(
        &self,
        conversation: &Conversation,
        messages: &[Message],
    ) -> Result<(), DomainError>;

    /// IDs of every conversation that is not closed.
    async fn list_active(&self) -> Result<Vec<ConversationId>, DomainError>;

    /// The open conversation for a subject, if any.
    async fn find_active_by_subject(
        &self,
        subject: &SubjectId,
    ) -> Result<Option<Conversation>, DomainError>;

    /// The message log of a conversation, oldest first.
    async fn messages(&self, id: &ConversationId) -> Result<Vec<Message>, DomainError>;

    /// Claims a conversation for `worker` until `now + lease`.
    ///
    /// Returns `false` if another worker holds an unexpired claim. A worker
    /// may renew its own claim.
    async fn try_claim(
        &self,
        id: &ConversationId,
        worker: WorkerId,
        now: Timestamp,
        lease: Duration,
    ) -> Result<bool, DomainError>;

    /// Drops `worker`'s claim. Releasing a claim held by someone else is a no-op.
    async fn release_claim(&self, id: &ConversationId, worker: WorkerId) -> Result<(), DomainError>;

    /// Store an extended conversation, its announcement and the audit record
    /// as one unit.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` if the message or record belongs elsewhere
    /// - `DatabaseError` on persistence failure; nothing is stored
    async fn commit_extension(
        &self,
        conversation: &Conversation,
        message: &Message,
        record: &ExtensionRecord,
    ) -> Result<(), DomainError>;

    /// Extension history of a conversation, oldest first.
    async fn extensions(&self, id: &ConversationId) -> Result<Vec<ExtensionRecord>, DomainError>;
}
