//! Client Directory Port - Business lookups used by flow actions.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ConversationId, DomainError};

/// What the business knows about a debtor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientRecord {
    pub document_number: String,
    pub name: String,
    /// Outstanding balance in currency units.
    pub balance: f64,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub previous_conversations: u32,
}

/// A payment plan chosen by a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanSelection {
    pub conversation_id: ConversationId,
    pub document_number: Option<String>,
    pub option_key: String,
    pub installments: u32,
    pub amount: Option<f64>,
}

/// Port for the client system of record.
#[async_trait]
pub trait ClientDirectory: Send + Sync {
    /// Looks a client up by document number. `None` if unknown.
    async fn find_by_document(&self, document: &str) -> Result<Option<ClientRecord>, DomainError>;

    /// Records the plan a client picked.
    async fn record_plan_selection(&self, selection: &PlanSelection) -> Result<(), DomainError>;
}
