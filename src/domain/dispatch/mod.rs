//! Pluggable conditions and actions, looked up by the names flows use.

mod action;
mod actions;
mod condition;
mod conditions;

use std::sync::Arc;

pub use action::{Action, ActionError, ActionInput, ActionOutcome, ActionRegistry};
pub use actions::{
    ComputeOffers, EscalateToSupervisor, LookupClient, PlanTemplate, RegisterPlanSelection,
    VerifyContact, PLAN_CATALOG, SINGLE_PAYMENT_RATIO,
};
pub use condition::{Condition, ConditionInput, ConditionRegistry, ContextFlagCondition};
pub use conditions::{
    BalanceAboveThreshold, ClientConfirms, ClientSelectsPlan, ClientShowsFrustration,
    FirstConversation, HasValidDocument, ACTION_FLAGS, DEFAULT_BALANCE_THRESHOLD,
};

use crate::ports::ClientDirectory;

/// Both registries, as the loader and the engine see them.
#[derive(Debug, Clone, Default)]
pub struct Registries {
    pub conditions: ConditionRegistry,
    pub actions: ActionRegistry,
}

impl Registries {
    pub fn new(conditions: ConditionRegistry, actions: ActionRegistry) -> Self {
        Self { conditions, actions }
    }

    /// Every built-in condition and action.
    pub fn builtin(directory: Arc<dyn ClientDirectory>, supervisor: impl Into<String>) -> Self {
        Self::new(
            ConditionRegistry::builtin(),
            ActionRegistry::builtin(directory, supervisor),
        )
    }
}
