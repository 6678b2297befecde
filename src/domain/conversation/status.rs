//! Lifecycle status of a conversation and the reasons it can close.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::StateMachine;

/// Where a conversation stands in its session lifecycle.
///
/// Runs alongside the flow state: the flow says *what* is being discussed,
/// the lifecycle says whether the session is still open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStatus {
    /// Open, no inactivity warning outstanding.
    #[default]
    Active,

    /// An inactivity warning was sent and not yet answered.
    Warned,

    /// Closed for good. Accepts no further input.
    Closed,
}

impl LifecycleStatus {
    pub fn is_open(&self) -> bool {
        !matches!(self, Self::Closed)
    }
}

impl StateMachine for LifecycleStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use LifecycleStatus::*;
        matches!(
            (self, target),
            (Active, Warned) | (Active, Closed) | (Warned, Closed) |
            // The client answered the warning
            (Warned, Active)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use LifecycleStatus::*;
        match self {
            Active => vec![Warned, Closed],
            Warned => vec![Active, Closed],
            Closed => vec![],
        }
    }
}

/// Why a conversation was closed. Selects the farewell template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    /// Idle past the tier's timeout.
    Expired,
    /// Reached the tier's message cap.
    MessageLimit,
    /// Reached a configured completed state.
    NegotiationCompleted,
    /// Closed on request.
    Generic,
}

impl CloseReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Expired => "expired",
            Self::MessageLimit => "message_limit",
            Self::NegotiationCompleted => "negotiation_completed",
            Self::Generic => "generic",
        }
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
