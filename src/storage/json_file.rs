use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Mutex;

use super::StateStore;
use crate::models::CredentialState;

const STATE_VERSION: u32 = 1;

#[derive(Debug, Default, Serialize, Deserialize)]
struct StateDocument {
    version: u32,
    #[serde(default)]
    credentials: BTreeMap<String, CredentialState>,
}

/// JSON file-based state store.
///
/// The whole state lives in one document:
/// ```json
/// {
///   "version": 1,
///   "credentials": {
///     "github": { "id": "...", "name": "github", "credential_type": "httpBasicAuth", "payload": {...} }
///   }
/// }
/// ```
///
/// The file holds credential payloads in clear text, like any declarative
/// tool's state; protect it accordingly.
pub struct JsonFileStateStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl JsonFileStateStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    async fn read_document(&self) -> Result<StateDocument> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(StateDocument {
                    version: STATE_VERSION,
                    credentials: BTreeMap::new(),
                })
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read state file {}", self.path.display()))
            }
        };

        let document: StateDocument = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse state file {}", self.path.display()))?;
        if document.version != STATE_VERSION {
            bail!(
                "Unsupported state file version {} in {} (expected {STATE_VERSION})",
                document.version,
                self.path.display()
            );
        }
        Ok(document)
    }

    async fn write_document(&self, document: &StateDocument) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .context("Failed to create state directory")?;
            }
        }

        let content =
            serde_json::to_string_pretty(document).context("Failed to serialize state")?;

        // Write then rename so an interrupted write never truncates the state.
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, content)
            .await
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &self.path)
            .await
            .with_context(|| format!("Failed to replace state file {}", self.path.display()))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl StateStore for JsonFileStateStore {
    async fn list(&self) -> Result<Vec<(String, CredentialState)>> {
        let _guard = self.lock.lock().await;
        Ok(self.read_document().await?.credentials.into_iter().collect())
    }

    async fn get(&self, name: &str) -> Result<Option<CredentialState>> {
        let _guard = self.lock.lock().await;
        Ok(self.read_document().await?.credentials.remove(name))
    }

    async fn save(&self, name: &str, state: &CredentialState) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut document = self.read_document().await?;
        document.credentials.insert(name.to_string(), state.clone());
        self.write_document(&document).await
    }

    async fn remove(&self, name: &str) -> Result<bool> {
        let _guard = self.lock.lock().await;
        let mut document = self.read_document().await?;
        let removed = document.credentials.remove(name).is_some();
        if removed {
            self.write_document(&document).await?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;
    use crate::models::CredentialId;
    use crate::shape::Payload;

    fn state(id: &str) -> CredentialState {
        let mut payload = Payload::new();
        payload.insert("user".to_string(), json!("u"));
        CredentialState {
            id: CredentialId::from(id),
            name: "x".to_string(),
            credential_type: "httpBasicAuth".to_string(),
            payload,
            nodes_access: None,
        }
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_state() -> Result<()> {
        let dir = TempDir::new()?;
        let store = JsonFileStateStore::new(dir.path().join("state.json"));
        assert!(store.list().await?.is_empty());
        assert!(store.get("x").await?.is_none());
        assert!(!store.remove("x").await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_save_get_remove() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("nested").join("state.json");
        let store = JsonFileStateStore::new(&path);

        store.save("b", &state("2")).await?;
        store.save("a", &state("1")).await?;

        let names: Vec<String> = store.list().await?.into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["a", "b"]);

        let reopened = JsonFileStateStore::new(&path);
        assert_eq!(reopened.get("a").await?, Some(state("1")));

        assert!(reopened.remove("a").await?);
        assert!(reopened.get("a").await?.is_none());
        assert!(!path.with_extension("json.tmp").exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_rejects_unknown_version() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("state.json");
        std::fs::write(&path, r#"{"version": 99, "credentials": {}}"#)?;

        let store = JsonFileStateStore::new(&path);
        let err = store.list().await.unwrap_err();
        assert!(err.to_string().contains("Unsupported state file version 99"));
        Ok(())
    }
}
