//! Builds a [`FlowDefinition`] from YAML and rejects anything malformed.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::time::Duration;

use thiserror::Error;
use tracing::info;

use super::definition::{FlowDefinition, MenuOption, NodeKind, NodeTimeout, StateNode};
use super::document::{FlowDocument, NodeSpec, OptionList};
use crate::domain::classification::{normalize_text, Intent};
use crate::domain::dispatch::Registries;

/// Why a flow document was refused. Every variant is fatal at startup.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FlowConfigError {
    #[error("cannot read flow file '{path}': {message}")]
    Io { path: String, message: String },

    #[error("flow document is not valid YAML for a flow: {0}")]
    Parse(String),

    #[error("flow declares no states")]
    NoStates,

    #[error("initial state '{0}' is not declared")]
    UnknownInitialState(String),

    #[error("state '{state}': {field} points to unknown state '{target}'")]
    DanglingEdge {
        state: String,
        field: &'static str,
        target: String,
    },

    #[error("state '{state}': unknown condition '{name}'")]
    UnknownCondition { state: String, name: String },

    #[error("state '{state}': unknown action '{name}'")]
    UnknownAction { state: String, name: String },

    #[error("state '{state}': duplicate menu option '{key}'")]
    DuplicateOptionKey { state: String, key: String },

    #[error("state '{state}': {reason}")]
    InvalidEdges { state: String, reason: String },

    #[error("state '{state}': terminal states cannot declare an action")]
    TerminalWithAction { state: String },

    #[error("terminal state '{0}' must not declare outgoing edges")]
    TerminalStateHasEdges(String),

    #[error("lifecycle.completed_states names unknown state '{0}'")]
    UnknownCompletedState(String),

    #[error("lifecycle.close_action names unknown action '{0}'")]
    UnknownCloseAction(String),

    #[error("invalid setting {field}: {reason}")]
    InvalidSetting { field: &'static str, reason: String },
}

const MAX_CURRENCY_DECIMALS: u8 = 6;

/// Reads and validates a flow file.
pub fn load_flow_file(
    path: impl AsRef<Path>,
    registries: &Registries,
) -> Result<FlowDefinition, FlowConfigError> {
    let path = path.as_ref();
    let yaml = std::fs::read_to_string(path).map_err(|e| FlowConfigError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    let flow = load_flow(&yaml, registries)?;
    info!(
        path = %path.display(),
        states = flow.state_count(),
        initial_state = %flow.initial_state(),
        "Flow definition loaded"
    );
    Ok(flow)
}

/// Parses and validates a flow document.
pub fn load_flow(yaml: &str, registries: &Registries) -> Result<FlowDefinition, FlowConfigError> {
    let document: FlowDocument =
        serde_yaml::from_str(yaml).map_err(|e| FlowConfigError::Parse(e.to_string()))?;
    build(document, registries)
}

fn build(document: FlowDocument, registries: &Registries) -> Result<FlowDefinition, FlowConfigError> {
    if document.states.is_empty() {
        return Err(FlowConfigError::NoStates);
    }
    if document.settings.currency.decimals > MAX_CURRENCY_DECIMALS {
        return Err(FlowConfigError::InvalidSetting {
            field: "settings.currency.decimals",
            reason: format!("at most {} decimals are supported", MAX_CURRENCY_DECIMALS),
        });
    }

    let mut states = HashMap::with_capacity(document.states.len() + 1);
    for (id, spec) in document.states {
        let node = build_node(id.clone(), spec, registries)?;
        states.insert(id, node);
    }

    match states.get(&document.terminal_state) {
        Some(node) if !node.is_terminal() => {
            return Err(FlowConfigError::TerminalStateHasEdges(
                document.terminal_state.clone(),
            ))
        }
        Some(_) => {}
        None => {
            states.insert(
                document.terminal_state.clone(),
                StateNode {
                    id: document.terminal_state.clone(),
                    message: None,
                    action: None,
                    timeout: None,
                    variables: BTreeMap::new(),
                    kind: NodeKind::Terminal,
                },
            );
        }
    }

    if !states.contains_key(&document.initial_state) {
        return Err(FlowConfigError::UnknownInitialState(document.initial_state));
    }

    // Sorted so the first reported error is stable across runs.
    let mut ids: Vec<&String> = states.keys().collect();
    ids.sort();
    for id in ids {
        let node = &states[id];
        for (field, target) in node.edges() {
            if !states.contains_key(target) {
                return Err(FlowConfigError::DanglingEdge {
                    state: id.clone(),
                    field,
                    target: target.to_string(),
                });
            }
        }
    }

    for state in &document.lifecycle.completed_states {
        if !states.contains_key(state) {
            return Err(FlowConfigError::UnknownCompletedState(state.clone()));
        }
    }
    if let Some(action) = &document.lifecycle.close_action {
        if !registries.actions.contains(action) {
            return Err(FlowConfigError::UnknownCloseAction(action.clone()));
        }
    }

    Ok(FlowDefinition {
        initial_state: document.initial_state,
        terminal_state: document.terminal_state,
        settings: document.settings,
        variables: document.variables,
        lifecycle: document.lifecycle,
        states,
    })
}

fn build_node(
    id: String,
    spec: NodeSpec,
    registries: &Registries,
) -> Result<StateNode, FlowConfigError> {
    let invalid = |reason: &str| FlowConfigError::InvalidEdges {
        state: id.clone(),
        reason: reason.to_string(),
    };

    let has_direct = spec.next.is_some();
    let has_conditional =
        spec.condition.is_some() || spec.true_next.is_some() || spec.false_next.is_some();
    let has_menu = spec.options.is_some();
    let shapes = [has_direct, has_conditional, has_menu]
        .iter()
        .filter(|present| **present)
        .count();
    if shapes > 1 {
        return Err(invalid(
            "a state declares exactly one of next, condition/true_next/false_next or options",
        ));
    }
    if spec.on_unmatched.is_some() && !has_menu {
        return Err(invalid("on_unmatched only applies to states with options"));
    }

    let kind = if let Some(next) = spec.next {
        NodeKind::Direct { next }
    } else if has_conditional {
        match (spec.condition, spec.true_next, spec.false_next) {
            (Some(condition), Some(true_next), Some(false_next)) => {
                if !registries.conditions.contains(&condition) {
                    return Err(FlowConfigError::UnknownCondition {
                        state: id,
                        name: condition,
                    });
                }
                NodeKind::Conditional {
                    condition,
                    true_next,
                    false_next,
                }
            }
            _ => {
                return Err(invalid(
                    "conditional states need condition, true_next and false_next",
                ))
            }
        }
    } else if let Some(options) = spec.options {
        NodeKind::Menu {
            options: build_options(&id, options)?,
            on_unmatched: spec.on_unmatched,
        }
    } else {
        NodeKind::Terminal
    };

    let timeout = match (spec.timeout, spec.on_timeout) {
        (None, None) => None,
        (Some(0), _) => return Err(invalid("timeout must be greater than zero")),
        (Some(seconds), Some(target)) => Some(NodeTimeout {
            after: Duration::from_secs(seconds),
            target,
        }),
        _ => return Err(invalid("timeout and on_timeout must be declared together")),
    };

    if matches!(kind, NodeKind::Terminal) {
        if spec.action.is_some() {
            return Err(FlowConfigError::TerminalWithAction { state: id });
        }
        if timeout.is_some() {
            return Err(invalid("terminal states cannot declare a timeout"));
        }
    }

    if let Some(action) = &spec.action {
        if !registries.actions.contains(action) {
            return Err(FlowConfigError::UnknownAction {
                state: id,
                name: action.clone(),
            });
        }
    }

    Ok(StateNode {
        id,
        message: spec.message,
        action: spec.action,
        timeout,
        variables: spec.variables,
        kind,
    })
}

fn build_options(state: &str, options: OptionList) -> Result<Vec<MenuOption>, FlowConfigError> {
    if options.0.is_empty() {
        return Err(FlowConfigError::InvalidEdges {
            state: state.to_string(),
            reason: "options must not be empty".to_string(),
        });
    }

    let mut seen = HashSet::new();
    let mut built = Vec::with_capacity(options.0.len());
    for (key, spec) in options.0 {
        let normalized = normalize_text(&key);
        if normalized.is_empty() || !seen.insert(normalized) {
            return Err(FlowConfigError::DuplicateOptionKey {
                state: state.to_string(),
                key,
            });
        }
        built.push(MenuOption {
            label: spec.message.unwrap_or_else(|| key.clone()),
            key,
            next: spec.next,
            intents: spec.intents.iter().map(Intent::new).collect(),
        });
    }
    Ok(built)
}
