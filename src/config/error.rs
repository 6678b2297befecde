//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid log level directive: {0}")]
    InvalidLogLevel(String),

    #[error("Local classifier threshold must be within (0, 1]")]
    InvalidThreshold,

    #[error("Remote classifier deadline must be between 1ms and 60s")]
    InvalidDeadline,

    #[error("Remote classifier base URL must use http or https")]
    InvalidEndpoint,

    #[error("Sweep interval must be at least one second")]
    InvalidSweepInterval,

    #[error("Claim lease must be at least one second")]
    InvalidLease,

    #[error("Sweep concurrency must be at least 1")]
    InvalidConcurrency,

    #[error("Premium balance threshold must be below the VIP threshold")]
    InvalidTierThresholds,

    #[error("Invalid tier policy: {0}")]
    InvalidPolicy(#[from] crate::domain::foundation::ValidationError),
}
