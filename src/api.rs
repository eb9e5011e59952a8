//! Credential operations on top of a [`Transport`].
//!
//! n8n has no update endpoint for credentials. [`CredentialsApi::replace`]
//! deletes and recreates instead, which always yields a new id and leaves a
//! window where the old credential is gone and the new one does not exist.

use std::sync::Arc;

use reqwest::Method;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::client::Transport;
use crate::error::{Error, Result};
use crate::models::{Credential, CredentialId, CredentialList, NewCredential};

const CREDENTIALS: &str = "credentials";

/// Repository for n8n credentials.
#[derive(Clone)]
pub struct CredentialsApi {
    transport: Arc<dyn Transport>,
}

impl CredentialsApi {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T> {
        let bytes = self.transport.request(method, endpoint, body).await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| Error::transport("Failed to parse JSON response", e))
    }

    fn item_endpoint(id: &CredentialId) -> Result<String> {
        Ok(format!("{CREDENTIALS}/{}", id.checked()?))
    }

    /// Create a credential. The response carries the new id but no payload.
    pub async fn create(&self, credential: &NewCredential) -> Result<Credential> {
        let body = serde_json::to_value(credential)
            .map_err(|e| Error::transport("Failed to encode credential", e))?;
        let created: Credential = self.call(Method::POST, CREDENTIALS, Some(body)).await?;
        debug!(id = %created.id, name = %created.name, "Created credential");
        Ok(created)
    }

    /// List every credential visible to the API key, following `nextCursor`
    /// until the server stops returning one.
    pub async fn list(&self) -> Result<Vec<Credential>> {
        let mut credentials = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let endpoint = match &cursor {
                Some(cursor) => format!("{CREDENTIALS}?cursor={}", urlencoding::encode(cursor)),
                None => CREDENTIALS.to_string(),
            };
            let page: CredentialList = self.call(Method::GET, &endpoint, None).await?;
            let (mut items, next) = page.into_page();
            credentials.append(&mut items);

            match next {
                // A server that hands back the same cursor would loop forever.
                Some(next) if cursor.as_deref() != Some(next.as_str()) => cursor = Some(next),
                _ => break,
            }
        }

        debug!(count = credentials.len(), "Listed credentials");
        Ok(credentials)
    }

    /// Fetch one credential by id.
    ///
    /// Not every n8n version serves `GET /credentials/{id}`, so any failure of
    /// the direct fetch falls back to listing and scanning for the id.
    pub async fn fetch(&self, id: &CredentialId) -> Result<Credential> {
        let endpoint = Self::item_endpoint(id)?;
        match self.transport.request(Method::GET, &endpoint, None).await {
            Ok(bytes) => {
                return serde_json::from_slice(&bytes)
                    .map_err(|e| Error::transport("Failed to parse JSON response", e));
            }
            Err(e) => {
                debug!(%id, error = %e, "Direct credential fetch failed, falling back to list");
            }
        }

        self.list()
            .await?
            .into_iter()
            .find(|credential| &credential.id == id)
            .ok_or_else(|| Error::NotFound { id: id.to_string() })
    }

    /// Delete a credential by id.
    pub async fn delete(&self, id: &CredentialId) -> Result<()> {
        let endpoint = Self::item_endpoint(id)?;
        self.transport
            .request(Method::DELETE, &endpoint, None)
            .await?;
        debug!(%id, "Deleted credential");
        Ok(())
    }

    /// Replace a credential by deleting `old_id` and creating `credential`.
    ///
    /// This is not atomic:
    /// - if the delete fails, its error is returned unchanged and nothing is
    ///   created;
    /// - if the delete succeeds and the create fails, the old credential is
    ///   already gone and [`Error::ReplaceIncomplete`] is returned.
    ///
    /// On success the returned credential always has a new id. Anything that
    /// referenced `old_id` (workflows, for instance) must be updated.
    pub async fn replace(
        &self,
        old_id: &CredentialId,
        credential: &NewCredential,
    ) -> Result<Credential> {
        self.delete(old_id).await?;

        match self.create(credential).await {
            Ok(created) => {
                info!(old_id = %old_id, new_id = %created.id, "Credential replaced");
                Ok(created)
            }
            Err(source) => Err(Error::ReplaceIncomplete {
                deleted_id: old_id.to_string(),
                source: Box::new(source),
            }),
        }
    }
}
