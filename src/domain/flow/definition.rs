//! The validated, immutable flow graph.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use serde_json::Value;

use super::settings::{FlowSettings, LifecycleSettings};
use crate::domain::classification::{normalize_text, Intent};

/// One vertex of the graph.
#[derive(Debug, Clone, PartialEq)]
pub struct StateNode {
    pub id: String,
    /// Template rendered when this node supplies the outbound text.
    pub message: Option<String>,
    /// Action run before the node picks its edge.
    pub action: Option<String>,
    pub timeout: Option<NodeTimeout>,
    /// Values layered over the context when this node's template is rendered.
    pub variables: BTreeMap<String, Value>,
    pub kind: NodeKind,
}

/// Edge shape of a node. Exactly one per node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Direct {
        next: String,
    },
    Conditional {
        condition: String,
        true_next: String,
        false_next: String,
    },
    Menu {
        options: Vec<MenuOption>,
        /// Where unmatched input goes; `None` re-presents the same node.
        on_unmatched: Option<String>,
    },
    Terminal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MenuOption {
    pub key: String,
    pub label: String,
    pub next: String,
    pub intents: Vec<Intent>,
}

impl MenuOption {
    /// True if `normalized` input names this option by key or by label.
    pub fn matches_text(&self, normalized: &str) -> bool {
        normalize_text(&self.key) == normalized || normalize_text(&self.label) == normalized
    }

    /// True if a classified intent selects this option.
    pub fn matches_intent(&self, intent: &Intent) -> bool {
        self.intents.contains(intent) || Intent::new(&self.key) == *intent
    }
}

/// Moves an idle conversation off a node after `after` has elapsed.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeTimeout {
    pub after: Duration,
    pub target: String,
}

impl StateNode {
    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, NodeKind::Terminal)
    }

    /// Every edge target this node declares, labelled by the field it came from.
    pub fn edges(&self) -> Vec<(&'static str, &str)> {
        let mut edges = Vec::new();
        match &self.kind {
            NodeKind::Direct { next } => edges.push(("next", next.as_str())),
            NodeKind::Conditional {
                true_next,
                false_next,
                ..
            } => {
                edges.push(("true_next", true_next.as_str()));
                edges.push(("false_next", false_next.as_str()));
            }
            NodeKind::Menu {
                options,
                on_unmatched,
            } => {
                for option in options {
                    edges.push(("options.next", option.next.as_str()));
                }
                if let Some(target) = on_unmatched {
                    edges.push(("on_unmatched", target.as_str()));
                }
            }
            NodeKind::Terminal => {}
        }
        if let Some(timeout) = &self.timeout {
            edges.push(("on_timeout", timeout.target.as_str()));
        }
        edges
    }

    /// Labels offered as quick replies when this node is presented.
    pub fn quick_replies(&self) -> Vec<String> {
        match &self.kind {
            NodeKind::Menu { options, .. } => options.iter().map(|o| o.label.clone()).collect(),
            _ => Vec::new(),
        }
    }
}

/// Immutable graph keyed by state id, built once by the loader.
///
/// # Invariants
///
/// - every edge target names a node in `states`
/// - `initial_state` and `terminal_state` name nodes in `states`
/// - the terminal state's node is `NodeKind::Terminal`
#[derive(Debug, Clone)]
pub struct FlowDefinition {
    pub(super) initial_state: String,
    pub(super) terminal_state: String,
    pub(super) settings: FlowSettings,
    pub(super) variables: BTreeMap<String, Value>,
    pub(super) lifecycle: LifecycleSettings,
    pub(super) states: HashMap<String, StateNode>,
}

impl FlowDefinition {
    pub fn initial_state(&self) -> &str {
        &self.initial_state
    }

    pub fn terminal_state(&self) -> &str {
        &self.terminal_state
    }

    pub fn settings(&self) -> &FlowSettings {
        &self.settings
    }

    pub fn variables(&self) -> &BTreeMap<String, Value> {
        &self.variables
    }

    pub fn lifecycle(&self) -> &LifecycleSettings {
        &self.lifecycle
    }

    pub fn node(&self, id: &str) -> Option<&StateNode> {
        self.states.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.states.contains_key(id)
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn is_completed_state(&self, id: &str) -> bool {
        self.lifecycle.completed_states.iter().any(|s| s == id)
    }
}
