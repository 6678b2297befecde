//! Parley - Negotiation dialogue orchestration engine
//!
//! Drives client conversations through a declarative flow graph: each
//! inbound message runs one turn of the state machine, with conditions and
//! actions resolved from registries, intents classified by a three-tier
//! cascade and replies rendered from templates. A background sweep warns,
//! times out and closes idle conversations under per-tier policies.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod telemetry;

mod bootstrap;

pub use bootstrap::{Parley, StartupError};
