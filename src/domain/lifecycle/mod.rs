//! Conversation lifecycle: tiers, timeout policies and the rules that warn,
//! time out and close conversations.
//!
//! The lifecycle runs beside the dialogue state machine. A conversation
//! moves `Active -> Warned -> Closed` on elapsed time, message count or
//! reaching a completed business state.

mod evaluator;
mod notice;
mod policy;
mod tier;

pub use evaluator::{LifecycleDecision, LifecycleEvaluator};
pub use notice::notice_context;
pub use policy::{TierPolicies, TimeoutPolicy};
pub use tier::{Tier, TierResolver};
