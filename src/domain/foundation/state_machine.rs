//! Shared interface for status enums with a fixed transition table.

use super::ValidationError;

/// A status enum whose legal moves are declared up front.
///
/// Implementors list the allowed edges; `transition_to` rejects everything
/// else so a status can never be assigned directly from an arbitrary value.
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// Returns true if moving from self to target is allowed.
    fn can_transition_to(&self, target: &Self) -> bool;

    /// Every status reachable in one step from self.
    fn valid_transitions(&self) -> Vec<Self>;

    /// Performs the move, or returns an error naming both ends.
    fn transition_to(&self, target: Self) -> Result<Self, ValidationError> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(ValidationError::invalid_format(
                "state_transition",
                format!("Cannot transition from {:?} to {:?}", self, target),
            ))
        }
    }

    /// A status with no outgoing edges.
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}
