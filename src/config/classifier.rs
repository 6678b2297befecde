//! Intent classifier configuration

use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use super::error::ValidationError;
use crate::domain::classification::{DEFAULT_LOCAL_THRESHOLD, DEFAULT_REMOTE_DEADLINE};

/// Settings for the local and remote classifier tiers
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierConfig {
    /// Minimum confidence for a local-model prediction to be accepted
    #[serde(default = "default_threshold")]
    pub local_threshold: f64,

    /// YAML training examples for the local model; no local tier when unset
    pub training_path: Option<PathBuf>,

    /// Enable the remote tier
    #[serde(default)]
    pub remote_enabled: bool,

    /// OpenAI-compatible API base URL
    #[serde(default = "default_base_url")]
    pub remote_base_url: String,

    #[serde(default = "default_model")]
    pub remote_model: String,

    /// API key for the remote tier
    pub remote_api_key: Option<Secret<String>>,

    /// Upper bound on one remote call, in milliseconds
    #[serde(default = "default_deadline_ms")]
    pub remote_deadline_ms: u64,
}

impl ClassifierConfig {
    /// Get the remote deadline as Duration
    pub fn remote_deadline(&self) -> Duration {
        Duration::from_millis(self.remote_deadline_ms)
    }

    /// Check if the remote tier can be built
    pub fn has_remote(&self) -> bool {
        self.remote_enabled
            && self
                .remote_api_key
                .as_ref()
                .is_some_and(|k| !k.expose_secret().is_empty())
    }

    /// Validate classifier configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(self.local_threshold > 0.0 && self.local_threshold <= 1.0) {
            return Err(ValidationError::InvalidThreshold);
        }
        if self.remote_enabled {
            if !self.has_remote() {
                return Err(ValidationError::MissingRequired("CLASSIFIER__REMOTE_API_KEY"));
            }
            if !(self.remote_base_url.starts_with("http://")
                || self.remote_base_url.starts_with("https://"))
            {
                return Err(ValidationError::InvalidEndpoint);
            }
            if self.remote_deadline_ms == 0 || self.remote_deadline_ms > 60_000 {
                return Err(ValidationError::InvalidDeadline);
            }
        }
        Ok(())
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            local_threshold: default_threshold(),
            training_path: None,
            remote_enabled: false,
            remote_base_url: default_base_url(),
            remote_model: default_model(),
            remote_api_key: None,
            remote_deadline_ms: default_deadline_ms(),
        }
    }
}

fn default_threshold() -> f64 {
    DEFAULT_LOCAL_THRESHOLD
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_deadline_ms() -> u64 {
    DEFAULT_REMOTE_DEADLINE.as_millis() as u64
}
