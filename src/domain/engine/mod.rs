//! The dialogue state machine: turns over the flow graph and the system
//! notices the lifecycle renders through the same pipeline.

mod notices;
mod transition;

pub use notices::Farewell;
pub use transition::{RenderedNode, StateMachineEngine, TransitionOutcome};

#[cfg(test)]
mod tests;
