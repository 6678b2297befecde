//! Application handlers.
//!
//! Command handlers that orchestrate domain operations.

pub mod close_conversation;
pub mod extend_deadline;
pub mod process_message;

pub use close_conversation::{CloseConversationCommand, CloseConversationError, CloseConversationHandler};
pub use extend_deadline::{
    ExtendDeadlineCommand, ExtendDeadlineError, ExtendDeadlineHandler, ExtendDeadlineResult,
};
pub use process_message::{InboundMessage, OutboundMessage, ProcessMessageError, ProcessMessageHandler};
