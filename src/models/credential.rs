//! Wire types for the n8n `/credentials` endpoints.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::CredentialId;
use crate::shape::Payload;

/// A node type allowed to use a credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeAccess {
    pub node_type: String,
}

impl NodeAccess {
    pub fn new(node_type: impl Into<String>) -> Self {
        Self {
            node_type: node_type.into(),
        }
    }

    pub fn from_node_types<S: AsRef<str>>(node_types: &[S]) -> Vec<Self> {
        node_types
            .iter()
            .map(|node_type| Self::new(node_type.as_ref()))
            .collect()
    }
}

/// A credential as returned by the server.
///
/// The server never echoes `data` back, so the payload is absent here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    pub id: CredentialId,
    pub name: String,
    #[serde(rename = "type")]
    pub credential_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodes_access: Option<Vec<NodeAccess>>,
}

impl Credential {
    /// Node types from `nodesAccess`, or `None` if the server sent none.
    pub fn node_types(&self) -> Option<Vec<String>> {
        match self.nodes_access.as_deref() {
            Some(access) if !access.is_empty() => {
                Some(access.iter().map(|a| a.node_type.clone()).collect())
            }
            _ => None,
        }
    }
}

/// Request body for `POST /credentials`.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCredential {
    pub name: String,
    #[serde(rename = "type")]
    pub credential_type: String,
    pub data: Payload,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub nodes_access: Vec<NodeAccess>,
}

impl fmt::Debug for NewCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewCredential")
            .field("name", &self.name)
            .field("credential_type", &self.credential_type)
            .field("data", &self.data.keys().collect::<Vec<_>>())
            .field("nodes_access", &self.nodes_access)
            .finish()
    }
}

/// Response of `GET /credentials`.
///
/// Newer servers wrap the list in `{"data": [...], "nextCursor": ...}`;
/// older ones return a bare array and never paginate.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum CredentialList {
    Wrapped {
        data: Vec<Credential>,
        #[serde(default, rename = "nextCursor")]
        next_cursor: Option<String>,
    },
    Bare(Vec<Credential>),
}

impl CredentialList {
    /// Split into this page's credentials and the cursor for the next page.
    pub fn into_page(self) -> (Vec<Credential>, Option<String>) {
        match self {
            CredentialList::Wrapped { data, next_cursor } => {
                (data, next_cursor.filter(|cursor| !cursor.is_empty()))
            }
            CredentialList::Bare(credentials) => (credentials, None),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_new_credential_omits_empty_nodes_access() {
        let body = NewCredential {
            name: "x".to_string(),
            credential_type: "httpBasicAuth".to_string(),
            data: Payload::new(),
            nodes_access: Vec::new(),
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(
            value,
            json!({ "name": "x", "type": "httpBasicAuth", "data": {} })
        );
    }

    #[test]
    fn test_new_credential_serializes_nodes_access() {
        let body = NewCredential {
            name: "x".to_string(),
            credential_type: "httpBasicAuth".to_string(),
            data: Payload::new(),
            nodes_access: NodeAccess::from_node_types(&["n8n-nodes-base.httpRequest"]),
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(
            value["nodesAccess"],
            json!([{ "nodeType": "n8n-nodes-base.httpRequest" }])
        );
    }

    #[test]
    fn test_credential_ignores_unknown_fields() {
        let credential: Credential = serde_json::from_value(json!({
            "id": "abc123",
            "name": "x",
            "type": "httpBasicAuth",
            "createdAt": "2024-01-01T00:00:00.000Z",
            "isManaged": false
        }))
        .unwrap();
        assert_eq!(credential.id.as_str(), "abc123");
        assert_eq!(credential.node_types(), None);
    }

    #[test]
    fn test_list_accepts_wrapped_and_bare_forms() {
        let wrapped: CredentialList = serde_json::from_value(json!({
            "data": [{ "id": "1", "name": "a", "type": "httpBasicAuth" }],
            "nextCursor": null
        }))
        .unwrap();
        let (credentials, cursor) = wrapped.into_page();
        assert_eq!(credentials.len(), 1);
        assert_eq!(cursor, None);

        let bare: CredentialList = serde_json::from_value(json!([
            { "id": "1", "name": "a", "type": "httpBasicAuth" },
            { "id": "2", "name": "b", "type": "oAuth2Api" }
        ]))
        .unwrap();
        let (credentials, cursor) = bare.into_page();
        assert_eq!(credentials.len(), 2);
        assert_eq!(cursor, None);
    }

    #[test]
    fn test_list_page_carries_next_cursor() {
        let page: CredentialList = serde_json::from_value(json!({
            "data": [{ "id": "1", "name": "a", "type": "httpBasicAuth" }],
            "nextCursor": "eyJsaW1pdCI6MX0="
        }))
        .unwrap();
        assert_eq!(page.into_page().1.as_deref(), Some("eyJsaW1pdCI6MX0="));

        let last: CredentialList =
            serde_json::from_value(json!({ "data": [], "nextCursor": "" })).unwrap();
        assert_eq!(last.into_page().1, None);
    }

    #[test]
    fn test_debug_hides_payload_values() {
        let mut data = Payload::new();
        data.insert("password".to_string(), json!("hunter2"));
        let body = NewCredential {
            name: "x".to_string(),
            credential_type: "httpBasicAuth".to_string(),
            data,
            nodes_access: Vec::new(),
        };
        let rendered = format!("{body:?}");
        assert!(rendered.contains("password"));
        assert!(!rendered.contains("hunter2"));
    }
}
