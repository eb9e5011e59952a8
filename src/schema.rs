//! Declarative surface of the provider and its `credential` resource.
//!
//! The shape blocks are derived from [`ShapeKind`] so the schema and the
//! validation rules cannot drift apart.

use serde::Serialize;

use crate::shape::ShapeKind;

pub const PROVIDER_TYPE_NAME: &str = "n8n";

/// Resource type name under a provider, e.g. `n8n_credential`.
pub fn resource_type_name(provider_type_name: &str) -> String {
    format!("{provider_type_name}_credential")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    String,
    Bool,
    ListOfString,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attribute {
    pub name: &'static str,
    pub kind: AttributeKind,
    pub description: &'static str,
    pub required: bool,
    pub computed: bool,
    pub sensitive: bool,
    /// A change to this attribute forces delete-and-recreate.
    pub replace_on_change: bool,
}

impl Attribute {
    fn new(name: &'static str, kind: AttributeKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            description,
            required: false,
            computed: false,
            sensitive: false,
            replace_on_change: false,
        }
    }

    fn required(mut self) -> Self {
        self.required = true;
        self
    }

    fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    fn replace_on_change(mut self) -> Self {
        self.replace_on_change = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Block {
    pub name: &'static str,
    pub description: &'static str,
    pub attributes: Vec<Attribute>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Schema {
    pub description: &'static str,
    pub attributes: Vec<Attribute>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<Block>,
}

impl Schema {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn block(&self, name: &str) -> Option<&Block> {
        self.blocks.iter().find(|b| b.name == name)
    }
}

impl Block {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

pub fn provider_schema() -> Schema {
    Schema {
        description: "Interact with the n8n API to manage credentials.",
        attributes: vec![
            Attribute::new(
                "host",
                AttributeKind::String,
                "The n8n instance host URL (e.g., https://n8n.example.com). May also be set with N8N_HOST.",
            )
            .required(),
            Attribute::new(
                "api_key",
                AttributeKind::String,
                "The API key for authenticating with n8n. May also be set with N8N_API_KEY.",
            )
            .required()
            .sensitive(),
            Attribute::new(
                "insecure",
                AttributeKind::Bool,
                "Skip TLS certificate verification. Defaults to false.",
            ),
        ],
        blocks: Vec::new(),
    }
}

pub fn credential_schema() -> Schema {
    Schema {
        description: "Manages a credential in n8n. Exactly one of the basic_auth, oauth2 or \
                      header_auth blocks must be set. n8n cannot update credentials, so any \
                      change deletes and recreates the credential under a new id.",
        attributes: vec![
            Attribute::new(
                "id",
                AttributeKind::String,
                "The identifier assigned by n8n. Changes whenever the credential is replaced.",
            )
            .computed(),
            Attribute::new("name", AttributeKind::String, "The name of the credential.")
                .required()
                .replace_on_change(),
            Attribute::new(
                "nodes_access",
                AttributeKind::ListOfString,
                "Node types that can access this credential.",
            )
            .replace_on_change(),
        ],
        blocks: ShapeKind::ALL.iter().map(|kind| shape_block(*kind)).collect(),
    }
}

fn shape_block(kind: ShapeKind) -> Block {
    let required = kind
        .required_fields()
        .iter()
        .map(|field| (*field, true));
    let optional = kind
        .optional_fields()
        .iter()
        .map(|field| (*field, false));

    let attributes = required
        .chain(optional)
        .map(|(field, is_required)| {
            let attribute_kind = if field == "send_additional_body_properties" {
                AttributeKind::Bool
            } else {
                AttributeKind::String
            };
            let mut attribute =
                Attribute::new(field, attribute_kind, field_description(kind, field))
                    .replace_on_change();
            if is_required {
                attribute = attribute.required();
            }
            if kind.sensitive_fields().contains(&field) {
                attribute = attribute.sensitive();
            }
            attribute
        })
        .collect();

    Block {
        name: kind.block_name(),
        description: match kind {
            ShapeKind::BasicAuth => "HTTP basic authentication (n8n type httpBasicAuth).",
            ShapeKind::OAuth2 => "Generic OAuth2 client (n8n type oAuth2Api).",
            ShapeKind::HeaderAuth => "Static header authentication (n8n type httpHeaderAuth).",
        },
        attributes,
    }
}

fn field_description(kind: ShapeKind, field: &str) -> &'static str {
    match (kind, field) {
        (ShapeKind::BasicAuth, "username") => "Username for basic authentication.",
        (ShapeKind::BasicAuth, "password") => "Password for basic authentication.",
        (ShapeKind::OAuth2, "client_id") => "OAuth2 client ID.",
        (ShapeKind::OAuth2, "client_secret") => "OAuth2 client secret.",
        (ShapeKind::OAuth2, "access_token_url") => "Token endpoint URL.",
        (ShapeKind::OAuth2, "auth_url") => "Authorization endpoint URL.",
        (ShapeKind::OAuth2, "scope") => "Space-separated scopes to request.",
        (ShapeKind::OAuth2, "auth_query_parameters") => {
            "Extra query parameters for the authorization URL. Defaults to empty."
        }
        (ShapeKind::OAuth2, "send_additional_body_properties") => {
            "Send additional body properties with the token request. Defaults to false."
        }
        (ShapeKind::OAuth2, "additional_body_properties") => {
            "JSON object of additional token request body properties. Defaults to empty."
        }
        (ShapeKind::HeaderAuth, "header_name") => "Name of the header to send.",
        (ShapeKind::HeaderAuth, "header_value") => "Value of the header to send.",
        _ => "",
    }
}
