use serde::Deserialize;

use crate::error::{ConfigIssue, ConfigurationError};
use crate::models::{NewCredential, NodeAccess};
use crate::shape::{CredentialBlocks, CredentialShape, Payload};

/// One `credential` resource as written in configuration.
///
/// ```toml
/// [[credential]]
/// name = "github"
/// nodes_access = ["n8n-nodes-base.github"]
///
/// [credential.basic_auth]
/// username = "octocat"
/// password = "hunter2"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CredentialDeclaration {
    #[serde(default)]
    pub name: String,

    /// Node types allowed to use the credential.
    #[serde(default)]
    pub nodes_access: Option<Vec<String>>,

    #[serde(flatten)]
    pub blocks: CredentialBlocks,
}

impl CredentialDeclaration {
    /// Validate the declaration without touching the remote.
    pub fn validate(&self) -> Result<DesiredCredential, ConfigurationError> {
        let mut issues = Vec::new();
        if self.name.trim().is_empty() {
            issues.push(ConfigIssue::MissingAttribute { attribute: "name" });
        }
        if let Some(nodes_access) = &self.nodes_access {
            if nodes_access.iter().any(|node_type| node_type.trim().is_empty()) {
                issues.push(ConfigIssue::MissingAttribute {
                    attribute: "nodes_access[]",
                });
            }
        }

        let shape = CredentialShape::collect(&self.blocks, &mut issues);

        match shape {
            Some(shape) if issues.is_empty() => Ok(DesiredCredential {
                name: self.name.clone(),
                shape,
                nodes_access: self.nodes_access.clone(),
            }),
            _ => Err(ConfigurationError::new(issues)),
        }
    }
}

/// A validated declaration: what the remote should hold.
#[derive(Debug, Clone)]
pub struct DesiredCredential {
    pub name: String,
    pub shape: CredentialShape,
    pub nodes_access: Option<Vec<String>>,
}

impl DesiredCredential {
    pub fn credential_type(&self) -> &'static str {
        self.shape.remote_type()
    }

    pub fn payload(&self) -> Payload {
        self.shape.to_payload()
    }

    /// Request body for creating this credential.
    pub fn to_request(&self) -> NewCredential {
        NewCredential {
            name: self.name.clone(),
            credential_type: self.credential_type().to_string(),
            data: self.payload(),
            nodes_access: NodeAccess::from_node_types(
                self.nodes_access.as_deref().unwrap_or_default(),
            ),
        }
    }
}
