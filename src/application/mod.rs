//! Application layer - Commands, Handlers and background services.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Every mutation of a conversation happens under its subject lock.

pub mod handlers;
mod lifecycle;
mod locks;
pub mod sweeper;

#[cfg(test)]
pub(crate) mod test_support;

pub use handlers::{
    CloseConversationCommand, CloseConversationError, CloseConversationHandler,
    ExtendDeadlineCommand, ExtendDeadlineError, ExtendDeadlineHandler, ExtendDeadlineResult,
    InboundMessage, OutboundMessage, ProcessMessageError, ProcessMessageHandler,
};
pub use lifecycle::LifecycleActions;
pub use locks::ConversationLocks;
pub use sweeper::{LifecycleSweeper, LifecycleSweeperConfig, SweepReport};
