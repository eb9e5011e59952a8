#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use n8n_credentials::api::CredentialsApi;
use n8n_credentials::client::{ClientConfig, HttpTransport};
use n8n_credentials::models::{CredentialId, CredentialState};
use n8n_credentials::resource::{CredentialDeclaration, CredentialResource};
use n8n_credentials::shape::{BasicAuthBlock, CredentialBlocks};
use secrecy::SecretString;
use serde_json::{json, Value};
use wiremock::MockServer;

pub const API_KEY: &str = "test-api-key";
pub const CREDENTIALS_PATH: &str = "/api/v1/credentials";

pub fn item_path(id: &str) -> String {
    format!("{CREDENTIALS_PATH}/{id}")
}

pub fn resource_for(server: &MockServer) -> Result<CredentialResource> {
    let transport = HttpTransport::new(ClientConfig::new(server.uri(), API_KEY))?;
    Ok(CredentialResource::new(CredentialsApi::new(Arc::new(
        transport,
    ))))
}

pub fn basic_declaration(name: &str, password: &str) -> CredentialDeclaration {
    CredentialDeclaration {
        name: name.to_string(),
        nodes_access: None,
        blocks: CredentialBlocks {
            basic_auth: Some(BasicAuthBlock {
                username: Some("octocat".to_string()),
                password: Some(SecretString::from(password)),
            }),
            ..Default::default()
        },
    }
}

/// State as it would look right after creating `declaration` under `id`.
pub fn state_for(declaration: &CredentialDeclaration, id: &str) -> Result<CredentialState> {
    let desired = declaration.validate()?;
    Ok(CredentialState {
        id: CredentialId::from(id),
        name: desired.name.clone(),
        credential_type: desired.credential_type().to_string(),
        payload: desired.payload(),
        nodes_access: desired.nodes_access.clone(),
    })
}

/// A server response for a credential; n8n never includes `data`.
pub fn remote(id: &str, name: &str, credential_type: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "type": credential_type,
        "createdAt": "2024-01-02T03:04:05.000Z",
        "updatedAt": "2024-01-02T03:04:05.000Z"
    })
}
