//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors, state machine trait)
//! - `conversation` - Conversation entity, context and message log records
//! - `flow` - Flow documents, the compiled graph and its loader
//! - `rendering` - Template variables and currency formatting
//! - `dispatch` - Named conditions and actions
//! - `classification` - Intent classification tiers and the cascade
//! - `engine` - One dialogue turn over the graph
//! - `lifecycle` - Tiers, timeout policies, warning and closing rules

pub mod classification;
pub mod conversation;
pub mod dispatch;
pub mod engine;
pub mod flow;
pub mod foundation;
pub mod lifecycle;
pub mod rendering;
