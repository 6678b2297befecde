//! Conversation entity - one negotiation session with one subject.

use serde::{Deserialize, Serialize};

use super::{CloseReason, Context, LifecycleStatus};
use crate::domain::foundation::{
    ConversationId, DomainError, ErrorCode, StateMachine, SubjectId, Timestamp, ValidationError,
};
use crate::domain::lifecycle::Tier;

/// A negotiation session.
///
/// Created on the first inbound message for a subject, mutated by every
/// turn and lifecycle transition, never deleted. A closed conversation
/// stays in the store with its reason and timestamp.
///
/// # Invariants
///
/// - `is_active()` is false exactly when the status is `Closed`
/// - `closed_at` and `close_reason` are set together, only when closed
/// - `warning_sent_at` is set once, by the first warning, and never cleared
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    id: ConversationId,
    subject: SubjectId,
    current_state: String,
    context: Context,
    message_count: u32,
    created_at: Timestamp,
    last_activity_at: Timestamp,
    state_entered_at: Timestamp,
    tier: Tier,
    status: LifecycleStatus,
    warning_sent_at: Option<Timestamp>,
    extension_hours: u32,
    close_reason: Option<CloseReason>,
    closed_at: Option<Timestamp>,
}

impl Conversation {
    /// Opens a conversation positioned on the flow's initial state.
    pub fn start(
        subject: SubjectId,
        initial_state: impl Into<String>,
        context: Context,
        now: Timestamp,
    ) -> Self {
        Self {
            id: ConversationId::new(),
            subject,
            current_state: initial_state.into(),
            context,
            message_count: 0,
            created_at: now,
            last_activity_at: now,
            state_entered_at: now,
            tier: Tier::default(),
            status: LifecycleStatus::Active,
            warning_sent_at: None,
            extension_hours: 0,
            close_reason: None,
            closed_at: None,
        }
    }

    // === Accessors ===

    pub fn id(&self) -> ConversationId {
        self.id
    }

    pub fn subject(&self) -> &SubjectId {
        &self.subject
    }

    pub fn current_state(&self) -> &str {
        &self.current_state
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn message_count(&self) -> u32 {
        self.message_count
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn last_activity_at(&self) -> Timestamp {
        self.last_activity_at
    }

    pub fn state_entered_at(&self) -> Timestamp {
        self.state_entered_at
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn status(&self) -> LifecycleStatus {
        self.status
    }

    pub fn warning_sent_at(&self) -> Option<Timestamp> {
        self.warning_sent_at
    }

    pub fn extension_hours(&self) -> u32 {
        self.extension_hours
    }

    pub fn close_reason(&self) -> Option<CloseReason> {
        self.close_reason
    }

    pub fn closed_at(&self) -> Option<Timestamp> {
        self.closed_at
    }

    pub fn is_active(&self) -> bool {
        self.status.is_open()
    }

    /// Hours since the client last wrote.
    pub fn idle_hours(&self, now: Timestamp) -> f64 {
        now.hours_since(&self.last_activity_at)
    }

    // === Mutations ===

    /// Records an inbound client message.
    ///
    /// Resets the inactivity clock and, if a warning was outstanding,
    /// returns the conversation to `Active`. The warning marker stays, so a
    /// later idle spell does not warn again.
    pub fn record_user_message(&mut self, now: Timestamp) -> Result<(), DomainError> {
        self.ensure_open()?;
        self.message_count += 1;
        self.last_activity_at = now;
        if self.status == LifecycleStatus::Warned {
            self.status = self.status.transition_to(LifecycleStatus::Active)?;
        }
        Ok(())
    }

    /// Records an outbound system message. Does not touch the inactivity clock.
    pub fn record_system_message(&mut self) {
        self.message_count += 1;
    }

    /// Moves the conversation to `next_state` with the context produced by a turn.
    pub fn apply_transition(
        &mut self,
        next_state: impl Into<String>,
        context: Context,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        self.ensure_open()?;
        let next_state = next_state.into();
        if next_state != self.current_state {
            self.state_entered_at = now;
            self.current_state = next_state;
        }
        self.context = context;
        Ok(())
    }

    pub fn set_tier(&mut self, tier: Tier) {
        self.tier = tier;
    }

    /// Marks the inactivity warning as sent.
    pub fn mark_warned(&mut self, now: Timestamp) -> Result<(), ValidationError> {
        self.status = self.status.transition_to(LifecycleStatus::Warned)?;
        self.warning_sent_at = Some(now);
        Ok(())
    }

    /// Closes the conversation for good.
    pub fn close(&mut self, reason: CloseReason, now: Timestamp) -> Result<(), ValidationError> {
        self.status = self.status.transition_to(LifecycleStatus::Closed)?;
        self.close_reason = Some(reason);
        self.closed_at = Some(now);
        Ok(())
    }

    /// Pushes the effective deadline back by `hours`.
    pub fn extend(&mut self, hours: u32) -> Result<(), DomainError> {
        self.ensure_open()?;
        if hours == 0 {
            return Err(ValidationError::out_of_range("hours", 1, i64::from(u32::MAX), 0).into());
        }
        self.extension_hours = self.extension_hours.saturating_add(hours);
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), DomainError> {
        if self.is_active() {
            Ok(())
        } else {
            Err(DomainError::new(
                ErrorCode::ConversationClosed,
                format!("Conversation {} is closed", self.id),
            ))
        }
    }
}
