//! Service tiers and how a conversation gets one.

use serde::{Deserialize, Serialize};

use crate::domain::conversation::Context;

/// Service tier of a conversation.
///
/// Selects the timeout policy applied by the lifecycle sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    #[default]
    Default,
    Premium,
    /// Large balances. Never auto-closed for inactivity.
    Vip,
    /// Short-lived campaigns.
    Express,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Default => "default",
            Tier::Premium => "premium",
            Tier::Vip => "vip",
            Tier::Express => "express",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Picks a tier from the `balance` context variable.
///
/// | Balance | Tier |
/// |---------|------|
/// | > `vip_above` | Vip |
/// | > `premium_above` | Premium |
/// | otherwise | Default |
///
/// `Express` is never derived from the balance; it is assigned explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierResolver {
    pub premium_above: f64,
    pub vip_above: f64,
}

impl Default for TierResolver {
    fn default() -> Self {
        Self {
            premium_above: 10_000_000.0,
            vip_above: 100_000_000.0,
        }
    }
}

impl TierResolver {
    /// Tier for `context`, or `current` when no balance is known yet.
    pub fn resolve(&self, context: &Context, current: Tier) -> Tier {
        if current == Tier::Express {
            return current;
        }
        match context.get_f64("balance") {
            Some(balance) if balance > self.vip_above => Tier::Vip,
            Some(balance) if balance > self.premium_above => Tier::Premium,
            Some(_) => Tier::Default,
            None => current,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_balance(balance: f64) -> Context {
        let mut context = Context::new();
        context.insert("balance", balance);
        context
    }

    #[test]
    fn resolves_by_balance() {
        let resolver = TierResolver::default();
        assert_eq!(resolver.resolve(&with_balance(500.0), Tier::Default), Tier::Default);
        assert_eq!(resolver.resolve(&with_balance(10_000_001.0), Tier::Default), Tier::Premium);
        assert_eq!(resolver.resolve(&with_balance(150_000_000.0), Tier::Default), Tier::Vip);
    }

    #[test]
    fn thresholds_are_strict() {
        let resolver = TierResolver::default();
        assert_eq!(resolver.resolve(&with_balance(10_000_000.0), Tier::Default), Tier::Default);
    }

    #[test]
    fn keeps_current_without_balance() {
        let resolver = TierResolver::default();
        assert_eq!(resolver.resolve(&Context::new(), Tier::Premium), Tier::Premium);
    }

    #[test]
    fn express_is_sticky() {
        let resolver = TierResolver::default();
        assert_eq!(resolver.resolve(&with_balance(500_000_000.0), Tier::Express), Tier::Express);
    }

    #[test]
    fn serializes_snake_case() {
        assert_eq!(serde_json::to_string(&Tier::Vip).unwrap(), "\"vip\"");
        assert_eq!(Tier::default(), Tier::Default);
    }
}
