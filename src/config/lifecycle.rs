//! Lifecycle sweep configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::domain::lifecycle::{TierPolicies, TierResolver};

/// Sweep cadence, claim lease and per-tier timeout policies
#[derive(Debug, Clone, Deserialize)]
pub struct LifecycleConfig {
    /// Seconds between sweeps
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Seconds a sweep claim keeps other workers away
    #[serde(default = "default_lease")]
    pub lease_secs: u64,

    /// Conversations processed concurrently by one sweep
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default)]
    pub policies: TierPolicies,

    #[serde(default)]
    pub tiers: TierResolver,
}

impl LifecycleConfig {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn lease(&self) -> Duration {
        Duration::from_secs(self.lease_secs)
    }

    /// Validate lifecycle configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.sweep_interval_secs == 0 {
            return Err(ValidationError::InvalidSweepInterval);
        }
        if self.lease_secs == 0 {
            return Err(ValidationError::InvalidLease);
        }
        if self.concurrency == 0 {
            return Err(ValidationError::InvalidConcurrency);
        }
        if !(self.tiers.premium_above >= 0.0 && self.tiers.premium_above < self.tiers.vip_above) {
            return Err(ValidationError::InvalidTierThresholds);
        }
        self.policies.validate()?;
        Ok(())
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: default_sweep_interval(),
            lease_secs: default_lease(),
            concurrency: default_concurrency(),
            policies: TierPolicies::default(),
            tiers: TierResolver::default(),
        }
    }
}

fn default_sweep_interval() -> u64 {
    3600
}

fn default_lease() -> u64 {
    300
}

fn default_concurrency() -> usize {
    8
}
