//! Named actions and their registry.
//!
//! Actions are side effects run before a node picks its edge. They never
//! fail a turn: the registry runs each one against a copy of the context,
//! keeps the copy only on success, and always records the outcome in the
//! action's success flag so the flow can branch on it.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::conversation::Context;
use crate::domain::foundation::ConversationId;

/// Why an action could not complete.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ActionError {
    #[error("missing input: {0}")]
    MissingInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("collaborator failed: {0}")]
    Collaborator(String),

    #[error("invalid data: {0}")]
    Invalid(String),

    #[error("action '{0}' is not registered")]
    Unregistered(String),
}

/// Per-call data handed to an action.
#[derive(Debug, Clone, Copy)]
pub struct ActionInput<'a> {
    pub conversation_id: ConversationId,
    pub user_input: &'a str,
}

/// A named side effect over the conversation context.
#[async_trait]
pub trait Action: Send + Sync {
    fn name(&self) -> &str;

    /// Context flag set to `true` on success and `false` on failure.
    fn success_flag(&self) -> &str;

    async fn execute(
        &self,
        context: &mut Context,
        input: &ActionInput<'_>,
    ) -> Result<(), ActionError>;
}

/// Result of running one action through the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionOutcome {
    pub action: String,
    /// Context after the action, with the success flag written.
    pub context: Context,
    pub error: Option<ActionError>,
}

impl ActionOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }

    /// One line for the turn's side-effect log.
    pub fn summary(&self) -> String {
        match &self.error {
            None => format!("{}: ok", self.action),
            Some(err) => format!("{}: failed ({err})", self.action),
        }
    }
}

/// Name to implementation map for actions.
#[derive(Clone, Default)]
pub struct ActionRegistry {
    actions: HashMap<String, Arc<dyn Action>>,
}

impl ActionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an action under its own name, replacing any previous one.
    pub fn register(&mut self, action: impl Action + 'static) {
        self.actions
            .insert(action.name().to_string(), Arc::new(action));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.actions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Runs `name` against a copy of `context`.
    ///
    /// On failure the copy is discarded, the failure is logged with the
    /// action name and conversation id, and the returned context is the
    /// original with the success flag set to `false`.
    pub async fn run(&self, name: &str, context: &Context, input: &ActionInput<'_>) -> ActionOutcome {
        let Some(action) = self.actions.get(name) else {
            warn!(
                conversation_id = %input.conversation_id,
                action = name,
                "Action not registered"
            );
            return ActionOutcome {
                action: name.to_string(),
                context: context.clone(),
                error: Some(ActionError::Unregistered(name.to_string())),
            };
        };

        let mut working = context.clone();
        match action.execute(&mut working, input).await {
            Ok(()) => {
                working.set_flag(action.success_flag(), true);
                debug!(
                    conversation_id = %input.conversation_id,
                    action = name,
                    "Action succeeded"
                );
                ActionOutcome {
                    action: name.to_string(),
                    context: working,
                    error: None,
                }
            }
            Err(err) => {
                warn!(
                    conversation_id = %input.conversation_id,
                    action = name,
                    error = %err,
                    "Action failed, continuing with success flag unset"
                );
                let mut restored = context.clone();
                restored.set_flag(action.success_flag(), false);
                ActionOutcome {
                    action: name.to_string(),
                    context: restored,
                    error: Some(err),
                }
            }
        }
    }
}

impl fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("actions", &self.names())
            .finish()
    }
}
