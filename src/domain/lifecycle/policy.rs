//! Timeout policies per tier.

use serde::{Deserialize, Serialize};

use super::Tier;
use crate::domain::foundation::ValidationError;

/// Inactivity and size limits for one tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutPolicy {
    /// Idle hours before the conversation is closed as expired.
    pub timeout_hours: u32,
    /// Idle hours before the single inactivity warning. Below `timeout_hours`.
    pub warning_hours: u32,
    /// Messages (user and system) after which the conversation is closed.
    pub max_messages: u32,
    /// When false, neither warnings nor expiry apply.
    #[serde(default = "default_true")]
    pub auto_close_enabled: bool,
}

fn default_true() -> bool {
    true
}

impl TimeoutPolicy {
    pub const fn new(timeout_hours: u32, warning_hours: u32, max_messages: u32) -> Self {
        Self {
            timeout_hours,
            warning_hours,
            max_messages,
            auto_close_enabled: true,
        }
    }

    pub const fn without_auto_close(mut self) -> Self {
        self.auto_close_enabled = false;
        self
    }

    /// Idle hours before expiry once `extension_hours` are added.
    pub fn effective_timeout(&self, extension_hours: u32) -> f64 {
        f64::from(self.timeout_hours) + f64::from(extension_hours)
    }

    /// Idle hours before the warning once `extension_hours` are added.
    pub fn effective_warning(&self, extension_hours: u32) -> f64 {
        f64::from(self.warning_hours) + f64::from(extension_hours)
    }

    pub fn message_limit_reached(&self, message_count: u32) -> bool {
        message_count >= self.max_messages
    }

    /// Checks the policy is internally consistent.
    ///
    /// # Errors
    ///
    /// - `OutOfRange` if `timeout_hours` or `max_messages` is zero, or if
    ///   `warning_hours` is not below `timeout_hours`
    pub fn validate(&self, field: &str) -> Result<(), ValidationError> {
        if self.timeout_hours == 0 {
            return Err(ValidationError::out_of_range(
                format!("{field}.timeout_hours"),
                1,
                i64::from(u32::MAX),
                0,
            ));
        }
        if self.warning_hours >= self.timeout_hours {
            return Err(ValidationError::out_of_range(
                format!("{field}.warning_hours"),
                0,
                i64::from(self.timeout_hours) - 1,
                i64::from(self.warning_hours),
            ));
        }
        if self.max_messages == 0 {
            return Err(ValidationError::out_of_range(
                format!("{field}.max_messages"),
                1,
                i64::from(u32::MAX),
                0,
            ));
        }
        Ok(())
    }
}

/// One policy per tier.
///
/// | Tier | Timeout | Warning | Max messages | Auto close |
/// |------|---------|---------|--------------|------------|
/// | default | 12h | 10h | 30 | yes |
/// | premium | 24h | 20h | 50 | yes |
/// | vip | 48h | 40h | 100 | no |
/// | express | 6h | 5h | 20 | yes |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierPolicies {
    pub default: TimeoutPolicy,
    pub premium: TimeoutPolicy,
    pub vip: TimeoutPolicy,
    pub express: TimeoutPolicy,
}

impl Default for TierPolicies {
    fn default() -> Self {
        Self {
            default: TimeoutPolicy::new(12, 10, 30),
            premium: TimeoutPolicy::new(24, 20, 50),
            vip: TimeoutPolicy::new(48, 40, 100).without_auto_close(),
            express: TimeoutPolicy::new(6, 5, 20),
        }
    }
}

impl TierPolicies {
    /// Same policy for every tier.
    pub fn uniform(policy: TimeoutPolicy) -> Self {
        Self {
            default: policy,
            premium: policy,
            vip: policy,
            express: policy,
        }
    }

    pub fn for_tier(&self, tier: Tier) -> &TimeoutPolicy {
        match tier {
            Tier::Default => &self.default,
            Tier::Premium => &self.premium,
            Tier::Vip => &self.vip,
            Tier::Express => &self.express,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.default.validate("default")?;
        self.premium.validate("premium")?;
        self.vip.validate("vip")?;
        self.express.validate("express")
    }
}
