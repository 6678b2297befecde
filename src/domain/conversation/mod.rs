//! Conversation domain module.
//!
//! The per-subject session record, its variable context, its lifecycle
//! status and the append-only message log.

mod context;
#[allow(clippy::module_inception)]
mod conversation;
mod message;
mod status;

pub use context::Context;
pub use conversation::Conversation;
pub use message::{LifecycleEvent, Message, MessageMetadata, Sender};
pub use status::{CloseReason, LifecycleStatus};
