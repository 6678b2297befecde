//! Per-conversation serialization.
//!
//! A subject has at most one open conversation, so locks are keyed by
//! subject. That serializes every turn and lifecycle step of a
//! conversation and also the creation of a subject's first conversation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::domain::foundation::SubjectId;

/// Async mutexes handed out by subject. Different subjects never contend.
#[derive(Debug, Clone, Default)]
pub struct ConversationLocks {
    locks: Arc<Mutex<HashMap<SubjectId, Arc<AsyncMutex<()>>>>>,
}

impl ConversationLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `subject`. Released when the guard drops.
    pub async fn lock(&self, subject: &SubjectId) -> OwnedMutexGuard<()> {
        let mutex = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            // Entries only this map references have no holder or waiter.
            locks.retain(|key, lock| key == subject || Arc::strong_count(lock) > 1);
            locks.entry(subject.clone()).or_default().clone()
        };
        mutex.lock_owned().await
    }

    /// Number of subjects currently tracked.
    pub fn tracked(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
