use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Credential, CredentialId};
use crate::shape::Payload;

/// Last-known local state of one managed credential.
///
/// `payload` is what was last declared, not what the server holds: n8n
/// never returns credential data, so the declared copy is the only source
/// for future diffs.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialState {
    pub id: CredentialId,
    pub name: String,
    pub credential_type: String,
    #[serde(default)]
    pub payload: Payload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodes_access: Option<Vec<String>>,
}

impl CredentialState {
    /// State for a credential adopted by id, before anything is known about it.
    pub fn imported(id: CredentialId) -> Self {
        Self {
            id,
            name: String::new(),
            credential_type: String::new(),
            payload: Payload::new(),
            nodes_access: None,
        }
    }

    /// Refresh the server-visible attributes, keeping the payload.
    ///
    /// Node access is only replaced when the server reports some; n8n's
    /// public API does not always echo it.
    pub fn refresh_from(&mut self, remote: &Credential) {
        self.id = remote.id.clone();
        self.name = remote.name.clone();
        self.credential_type = remote.credential_type.clone();
        if let Some(node_types) = remote.node_types() {
            self.nodes_access = Some(node_types);
        }
    }

    /// Node access as an unordered set. An empty list and no list are equal.
    pub fn node_access_set(&self) -> BTreeSet<&str> {
        node_access_set(self.nodes_access.as_deref())
    }
}

pub(crate) fn node_access_set(nodes_access: Option<&[String]>) -> BTreeSet<&str> {
    nodes_access
        .unwrap_or_default()
        .iter()
        .map(String::as_str)
        .collect()
}

impl fmt::Debug for CredentialState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialState")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("credential_type", &self.credential_type)
            .field("payload", &self.payload.keys().collect::<Vec<_>>())
            .field("nodes_access", &self.nodes_access)
            .finish()
    }
}
