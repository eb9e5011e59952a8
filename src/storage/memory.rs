//! In-memory state store for testing.

use std::collections::BTreeMap;

use anyhow::Result;
use tokio::sync::Mutex;

use crate::models::CredentialState;

use super::StateStore;

/// In-memory state store for testing purposes.
#[derive(Default)]
pub struct MemoryStateStore {
    entries: Mutex<BTreeMap<String, CredentialState>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl StateStore for MemoryStateStore {
    async fn list(&self) -> Result<Vec<(String, CredentialState)>> {
        let entries = self.entries.lock().await;
        Ok(entries
            .iter()
            .map(|(name, state)| (name.clone(), state.clone()))
            .collect())
    }

    async fn get(&self, name: &str) -> Result<Option<CredentialState>> {
        let entries = self.entries.lock().await;
        Ok(entries.get(name).cloned())
    }

    async fn save(&self, name: &str, state: &CredentialState) -> Result<()> {
        let mut entries = self.entries.lock().await;
        entries.insert(name.to_string(), state.clone());
        Ok(())
    }

    async fn remove(&self, name: &str) -> Result<bool> {
        let mut entries = self.entries.lock().await;
        Ok(entries.remove(name).is_some())
    }
}
