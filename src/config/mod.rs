//! Application configuration module
//!
//! Type-safe configuration loading using the `config` and `dotenvy` crates.
//! Values come from an optional `parley.yaml` file, overridden by
//! environment variables with the `PARLEY` prefix; nested values use double
//! underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use parley::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Flow definition at {}", config.flow.path.display());
//! ```

mod classifier;
mod error;
mod flow;
mod lifecycle;
mod runtime;

pub use classifier::ClassifierConfig;
pub use error::{ConfigError, ValidationError};
pub use flow::FlowConfig;
pub use lifecycle::LifecycleConfig;
pub use runtime::{Environment, RuntimeConfig};

use serde::Deserialize;
use std::path::Path;

use crate::domain::lifecycle::{Tier, TierPolicies};

/// Default configuration file name, looked up in the working directory.
const DEFAULT_CONFIG_FILE: &str = "parley";

/// Root application configuration
///
/// Every section has defaults, so an empty environment yields a runnable
/// configuration. Load using [`AppConfig::load()`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Environment and logging
    #[serde(default)]
    pub runtime: RuntimeConfig,

    /// Flow definition and seed data
    #[serde(default)]
    pub flow: FlowConfig,

    /// Intent classifier tiers
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Lifecycle sweep and timeout policies
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
}

impl AppConfig {
    /// Load configuration from `parley.yaml` (if present) and the environment
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads `parley.yaml` from the working directory if it exists
    /// 3. Reads environment variables with `PARLEY` prefix
    /// 4. Uses `__` (double underscore) to separate nested values
    ///
    /// # Environment Variable Format
    ///
    /// - `PARLEY__FLOW__PATH=flows/negotiation.yaml` -> `flow.path`
    /// - `PARLEY__LIFECYCLE__POLICIES__VIP__TIMEOUT_HOURS=72` -> `lifecycle.policies.vip.timeout_hours`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::build(config::File::with_name(DEFAULT_CONFIG_FILE).required(false))
    }

    /// Load configuration from an explicit file, still overridable by the environment
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::build(config::File::from(path.as_ref()).required(true))
    }

    fn build(file: impl config::Source + Send + Sync + 'static) -> Result<Self, ConfigError> {
        let config = with_policy_defaults(config::Config::builder())?
            .add_source(file)
            .add_source(config::Environment::default().prefix("PARLEY").separator("__"))
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.runtime.validate()?;
        self.flow.validate()?;
        self.classifier.validate()?;
        self.lifecycle.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.runtime.is_production()
    }
}

/// Seeds every tier policy field so a source can override one field alone.
fn with_policy_defaults(
    mut builder: config::ConfigBuilder<config::builder::DefaultState>,
) -> Result<config::ConfigBuilder<config::builder::DefaultState>, config::ConfigError> {
    let defaults = TierPolicies::default();
    for tier in [Tier::Default, Tier::Premium, Tier::Vip, Tier::Express] {
        let policy = defaults.for_tier(tier);
        let prefix = format!("lifecycle.policies.{tier}");
        builder = builder
            .set_default(format!("{prefix}.timeout_hours"), i64::from(policy.timeout_hours))?
            .set_default(format!("{prefix}.warning_hours"), i64::from(policy.warning_hours))?
            .set_default(format!("{prefix}.max_messages"), i64::from(policy.max_messages))?
            .set_default(format!("{prefix}.auto_close_enabled"), policy.auto_close_enabled)?;
    }
    Ok(builder)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::io::Write;
    use std::sync::{Mutex, MutexGuard, PoisonError};

    // Mutex to ensure tests don't run in parallel (env vars are global)
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: &[&str] = &[
        "PARLEY__RUNTIME__ENVIRONMENT",
        "PARLEY__FLOW__PATH",
        "PARLEY__CLASSIFIER__LOCAL_THRESHOLD",
        "PARLEY__LIFECYCLE__SWEEP_INTERVAL_SECS",
        "PARLEY__LIFECYCLE__POLICIES__VIP__TIMEOUT_HOURS",
    ];

    fn env_lock() -> MutexGuard<'static, ()> {
        ENV_MUTEX.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_load_with_empty_environment() {
        let _guard = env_lock();
        clear_env();
        let config = AppConfig::load().unwrap();

        assert_eq!(config.runtime.environment, Environment::Development);
        assert_eq!(config.lifecycle.policies.default.timeout_hours, 12);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_environment_overrides() {
        let _guard = env_lock();
        env::set_var("PARLEY__RUNTIME__ENVIRONMENT", "production");
        env::set_var("PARLEY__FLOW__PATH", "/etc/parley/flow.yaml");
        env::set_var("PARLEY__LIFECYCLE__SWEEP_INTERVAL_SECS", "60");
        env::set_var("PARLEY__LIFECYCLE__POLICIES__VIP__TIMEOUT_HOURS", "72");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(config.is_production());
        assert_eq!(config.flow.path.to_str(), Some("/etc/parley/flow.yaml"));
        assert_eq!(config.lifecycle.sweep_interval_secs, 60);
        assert_eq!(config.lifecycle.policies.vip.timeout_hours, 72);
        assert_eq!(config.lifecycle.policies.vip.warning_hours, 40);
    }

    #[test]
    fn test_file_source_with_env_override() {
        let _guard = env_lock();
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "flow:\n  supervisor: Marta\nclassifier:\n  local_threshold: 0.8\n"
        )
        .unwrap();
        env::set_var("PARLEY__CLASSIFIER__LOCAL_THRESHOLD", "0.9");
        let result = AppConfig::load_from(file.path());
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.flow.supervisor, "Marta");
        assert_eq!(config.classifier.local_threshold, 0.9);
    }

    #[test]
    fn test_partial_tier_policy_in_file_keeps_other_fields() {
        let _guard = env_lock();
        clear_env();
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "lifecycle:\n  policies:\n    premium:\n      max_messages: 80\n").unwrap();
        let result = AppConfig::load_from(file.path());

        let config = result.unwrap();
        let premium = config.lifecycle.policies.premium;
        assert_eq!(premium.max_messages, 80);
        assert_eq!(premium.timeout_hours, 24);
        assert_eq!(premium.warning_hours, 20);
        assert!(premium.auto_close_enabled);
        assert!(!config.lifecycle.policies.vip.auto_close_enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_threshold_fails_validation() {
        let _guard = env_lock();
        env::set_var("PARLEY__CLASSIFIER__LOCAL_THRESHOLD", "1.5");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(matches!(config.validate(), Err(ValidationError::InvalidThreshold)));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let _guard = env_lock();
        let result = AppConfig::load_from("/nonexistent/parley.yaml");
        assert!(matches!(result, Err(ConfigError::LoadError(_))));
    }
}
