//! Flow graph: the declarative conversation definition, compiled once.

mod definition;
mod document;
mod loader;
mod settings;

pub use definition::{FlowDefinition, MenuOption, NodeKind, NodeTimeout, StateNode};
pub use loader::{load_flow, load_flow_file, FlowConfigError};
pub use settings::{FlowSettings, LifecycleMessages, LifecycleSettings, RenderFrom};
