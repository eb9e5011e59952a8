mod json_file;
mod memory;

pub use json_file::JsonFileStateStore;
pub use memory::MemoryStateStore;

use anyhow::Result;

use crate::models::CredentialState;

/// Persists the last-known state of each managed credential, keyed by the
/// declaration name.
#[async_trait::async_trait]
pub trait StateStore: Send + Sync {
    /// All entries, ordered by name.
    async fn list(&self) -> Result<Vec<(String, CredentialState)>>;
    async fn get(&self, name: &str) -> Result<Option<CredentialState>>;
    async fn save(&self, name: &str, state: &CredentialState) -> Result<()>;
    /// Returns true if an entry was removed.
    async fn remove(&self, name: &str) -> Result<bool>;
}
