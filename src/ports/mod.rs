//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `ConversationRepository` - conversations, message log, leases, extensions
//! - `IntentClassifier` - remote text classification
//! - `ClientDirectory` - client lookups and plan registration
//! - `Clock` - current time

mod client_directory;
mod clock;
mod conversation_repository;
mod intent_classifier;

pub use client_directory::{ClientDirectory, ClientRecord, PlanSelection};
pub use clock::Clock;
pub use conversation_repository::{ConversationRepository, ExtensionRecord};
pub use intent_classifier::{ClassificationError, ClassificationRequest, IntentClassifier};
