//! In-memory client directory, seeded from code or a YAML file.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;

use crate::domain::foundation::DomainError;
use crate::ports::{ClientDirectory, ClientRecord, PlanSelection};

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read client seed file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse client seed file: {0}")]
    Parse(#[from] serde_yaml::Error),
}

#[derive(Debug, Deserialize)]
struct SeedFile {
    clients: Vec<ClientRecord>,
}

/// Client records held in memory, keyed by document number.
#[derive(Debug, Clone, Default)]
pub struct InMemoryClientDirectory {
    clients: Arc<RwLock<HashMap<String, ClientRecord>>>,
    selections: Arc<RwLock<Vec<PlanSelection>>>,
}

impl InMemoryClientDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clients(clients: impl IntoIterator<Item = ClientRecord>) -> Self {
        let directory = Self::new();
        for client in clients {
            directory.insert(client);
        }
        directory
    }

    /// Parses `clients: [...]` YAML.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, SeedError> {
        let seed: SeedFile = serde_yaml::from_str(yaml)?;
        Ok(Self::with_clients(seed.clients))
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, SeedError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| SeedError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    pub fn insert(&self, client: ClientRecord) {
        self.clients
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(client.document_number.clone(), client);
    }

    pub fn len(&self) -> usize {
        self.clients.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Plan selections recorded so far, oldest first.
    pub fn selections(&self) -> Vec<PlanSelection> {
        self.selections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl ClientDirectory for InMemoryClientDirectory {
    async fn find_by_document(&self, document: &str) -> Result<Option<ClientRecord>, DomainError> {
        Ok(self
            .clients
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(document.trim())
            .cloned())
    }

    async fn record_plan_selection(&self, selection: &PlanSelection) -> Result<(), DomainError> {
        self.selections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(selection.clone());
        Ok(())
    }
}
