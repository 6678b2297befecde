//! Flow definition and collaborator data sources

use serde::Deserialize;
use std::path::PathBuf;

use super::error::ValidationError;

/// Where the dialogue flow and its seed data live
#[derive(Debug, Clone, Deserialize)]
pub struct FlowConfig {
    /// YAML flow definition, loaded once at startup
    #[serde(default = "default_path")]
    pub path: PathBuf,

    /// Optional YAML seed for the in-memory client directory
    pub clients_path: Option<PathBuf>,

    /// Name given to clients when a conversation is escalated
    #[serde(default = "default_supervisor")]
    pub supervisor: String,
}

impl FlowConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.path.as_os_str().is_empty() {
            return Err(ValidationError::MissingRequired("FLOW__PATH"));
        }
        if self.supervisor.trim().is_empty() {
            return Err(ValidationError::MissingRequired("FLOW__SUPERVISOR"));
        }
        Ok(())
    }
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            clients_path: None,
            supervisor: default_supervisor(),
        }
    }
}

fn default_path() -> PathBuf {
    PathBuf::from("flows/negotiation.yaml")
}

fn default_supervisor() -> String {
    "Laura".to_string()
}
