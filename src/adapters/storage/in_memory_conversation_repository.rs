//! In-Memory Conversation Repository
//!
//! Stores conversations, message logs, sweep claims and extension records
//! in memory. Useful for testing and development.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::domain::conversation::{Conversation, Message};
use crate::domain::foundation::{
    ConversationId, DomainError, ErrorCode, SubjectId, Timestamp, WorkerId,
};
use crate::ports::{ConversationRepository, ExtensionRecord};

#[derive(Debug, Clone, Copy)]
struct Claim {
    worker: WorkerId,
    until: Timestamp,
}

#[derive(Debug, Default)]
struct Tables {
    conversations: HashMap<ConversationId, Conversation>,
    messages: HashMap<ConversationId, Vec<Message>>,
    claims: HashMap<ConversationId, Claim>,
    extensions: HashMap<ConversationId, Vec<ExtensionRecord>>,
}

/// In-memory storage for conversations.
///
/// All tables sit behind one lock, so `commit_turn` and `commit_extension`
/// are atomic with respect to every other call.
#[derive(Debug, Clone, Default)]
pub struct InMemoryConversationRepository {
    tables: Arc<RwLock<Tables>>,
    failing: Arc<RwLock<HashSet<ConversationId>>>,
}

impl InMemoryConversationRepository {
    /// Create a new in-memory repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every write touching `id` fail with `DatabaseError` (for tests).
    pub async fn fail_writes_for(&self, id: ConversationId) {
        self.failing.write().await.insert(id);
    }

    /// Number of stored conversations, open or closed.
    pub async fn conversation_count(&self) -> usize {
        self.tables.read().await.conversations.len()
    }

    /// Current claim holder, if the claim has not expired at `now`.
    pub async fn claim_holder(&self, id: &ConversationId, now: Timestamp) -> Option<WorkerId> {
        self.tables
            .read()
            .await
            .claims
            .get(id)
            .filter(|claim| claim.until.is_after(&now))
            .map(|claim| claim.worker)
    }

    async fn check_writable(&self, id: &ConversationId) -> Result<(), DomainError> {
        if self.failing.read().await.contains(id) {
            return Err(DomainError::database(format!("Write rejected for conversation {id}")));
        }
        Ok(())
    }
}

fn not_found(id: &ConversationId) -> DomainError {
    DomainError::new(ErrorCode::ConversationNotFound, format!("Conversation {id} not found"))
}

fn ensure_owned(conversation: &Conversation, messages: &[Message]) -> Result<(), DomainError> {
    match messages.iter().find(|m| m.conversation_id != conversation.id()) {
        Some(stray) => Err(DomainError::validation(
            "messages",
            format!("Message {} belongs to another conversation", stray.id),
        )),
        None => Ok(()),
    }
}

#[async_trait]
impl ConversationRepository for InMemoryConversationRepository {
    async fn load(&self, id: &ConversationId) -> Result<Option<Conversation>, DomainError> {
        Ok(self.tables.read().await.conversations.get(id).cloned())
    }

    async fn save(&self, conversation: &Conversation) -> Result<(), DomainError> {
        self.check_writable(&conversation.id()).await?;
        self.tables
            .write()
            .await
            .conversations
            .insert(conversation.id(), conversation.clone());
        Ok(())
    }

    async fn append_message(&self, message: &Message) -> Result<(), DomainError> {
        self.check_writable(&message.conversation_id).await?;
        let mut tables = self.tables.write().await;
        if !tables.conversations.contains_key(&message.conversation_id) {
            return Err(not_found(&message.conversation_id));
        }
        tables
            .messages
            .entry(message.conversation_id)
            .or_default()
            .push(message.clone());
        Ok(())
    }

    async fn commit_turn(
        &self,
        conversation: &Conversation,
        messages: &[Message],
    ) -> Result<(), DomainError> {
        self.check_writable(&conversation.id()).await?;
        ensure_owned(conversation, messages)?;

        let mut tables = self.tables.write().await;
        tables
            .conversations
            .insert(conversation.id(), conversation.clone());
        tables
            .messages
            .entry(conversation.id())
            .or_default()
            .extend(messages.iter().cloned());
        Ok(())
    }

    async fn list_active(&self) -> Result<Vec<ConversationId>, DomainError> {
        let tables = self.tables.read().await;
        let mut active: Vec<&Conversation> = tables
            .conversations
            .values()
            .filter(|c| c.is_active())
            .collect();
        active.sort_by_key(|c| c.created_at());
        Ok(active.into_iter().map(|c| c.id()).collect())
    }

    async fn find_active_by_subject(
        &self,
        subject: &SubjectId,
    ) -> Result<Option<Conversation>, DomainError> {
        let tables = self.tables.read().await;
        Ok(tables
            .conversations
            .values()
            .filter(|c| c.is_active() && c.subject() == subject)
            .max_by_key(|c| c.created_at())
            .cloned())
    }

    async fn messages(&self, id: &ConversationId) -> Result<Vec<Message>, DomainError> {
        Ok(self
            .tables
            .read()
            .await
            .messages
            .get(id)
            .cloned()
            .unwrap_or_default())
    }

    async fn try_claim(
        &self,
        id: &ConversationId,
        worker: WorkerId,
        now: Timestamp,
        lease: Duration,
    ) -> Result<bool, DomainError> {
        let mut tables = self.tables.write().await;
        if !tables.conversations.contains_key(id) {
            return Err(not_found(id));
        }
        if let Some(claim) = tables.claims.get(id) {
            if claim.worker != worker && claim.until.is_after(&now) {
                return Ok(false);
            }
        }
        tables.claims.insert(
            *id,
            Claim {
                worker,
                until: now.plus_secs(lease.as_secs().max(1)),
            },
        );
        Ok(true)
    }

    async fn release_claim(&self, id: &ConversationId, worker: WorkerId) -> Result<(), DomainError> {
        let mut tables = self.tables.write().await;
        if tables.claims.get(id).is_some_and(|claim| claim.worker == worker) {
            tables.claims.remove(id);
        }
        Ok(())
    }

    async fn commit_extension(
        &self,
        conversation: &Conversation,
        message: &Message,
        record: &ExtensionRecord,
    ) -> Result<(), DomainError> {
        self.check_writable(&conversation.id()).await?;
        ensure_owned(conversation, std::slice::from_ref(message))?;
        if record.conversation_id != conversation.id() {
            return Err(DomainError::validation(
                "record",
                "Extension record belongs to another conversation",
            ));
        }

        let id = conversation.id();
        let mut tables = self.tables.write().await;
        tables.conversations.insert(id, conversation.clone());
        tables.messages.entry(id).or_default().push(message.clone());
        tables.extensions.entry(id).or_default().push(record.clone());
        Ok(())
    }

    async fn extensions(&self, id: &ConversationId) -> Result<Vec<ExtensionRecord>, DomainError> {
        Ok(self
            .tables
            .read()
            .await
            .extensions
            .get(id)
            .cloned()
            .unwrap_or_default())
    }
}
