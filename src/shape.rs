//! Credential shapes: the closed set of payload schemas a credential can take.
//!
//! A declaration carries one optional block per shape. Exactly one of them
//! must be populated; [`CredentialShape::from_blocks`] enforces that and the
//! per-shape required fields, then [`CredentialShape::to_payload`] maps the
//! fields onto n8n's `{type, data}` wire representation.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{ConfigIssue, ConfigurationError};

/// Generic credential payload as sent in the `data` field.
pub type Payload = Map<String, Value>;

/// Identifies one credential shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShapeKind {
    BasicAuth,
    OAuth2,
    HeaderAuth,
}

impl ShapeKind {
    pub const ALL: &'static [ShapeKind] =
        &[ShapeKind::BasicAuth, ShapeKind::OAuth2, ShapeKind::HeaderAuth];

    /// Name of the configuration block selecting this shape.
    pub fn block_name(self) -> &'static str {
        match self {
            ShapeKind::BasicAuth => "basic_auth",
            ShapeKind::OAuth2 => "oauth2",
            ShapeKind::HeaderAuth => "header_auth",
        }
    }

    /// The n8n credential type string.
    pub fn remote_type(self) -> &'static str {
        match self {
            ShapeKind::BasicAuth => "httpBasicAuth",
            ShapeKind::OAuth2 => "oAuth2Api",
            ShapeKind::HeaderAuth => "httpHeaderAuth",
        }
    }

    pub fn required_fields(self) -> &'static [&'static str] {
        match self {
            ShapeKind::BasicAuth => &["username", "password"],
            ShapeKind::OAuth2 => &[
                "client_id",
                "client_secret",
                "access_token_url",
                "auth_url",
                "scope",
            ],
            ShapeKind::HeaderAuth => &["header_name", "header_value"],
        }
    }

    pub fn optional_fields(self) -> &'static [&'static str] {
        match self {
            ShapeKind::OAuth2 => &[
                "auth_query_parameters",
                "send_additional_body_properties",
                "additional_body_properties",
            ],
            _ => &[],
        }
    }

    pub fn sensitive_fields(self) -> &'static [&'static str] {
        match self {
            ShapeKind::BasicAuth => &["password"],
            ShapeKind::OAuth2 => &["client_secret"],
            ShapeKind::HeaderAuth => &["header_value"],
        }
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.block_name())
    }
}

/// `basic_auth` block as declared.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BasicAuthBlock {
    pub username: Option<String>,
    pub password: Option<SecretString>,
}

/// `oauth2` block as declared.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OAuth2Block {
    pub client_id: Option<String>,
    pub client_secret: Option<SecretString>,
    pub access_token_url: Option<String>,
    pub auth_url: Option<String>,
    pub scope: Option<String>,
    pub auth_query_parameters: Option<String>,
    pub send_additional_body_properties: Option<bool>,
    pub additional_body_properties: Option<String>,
}

/// `header_auth` block as declared.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HeaderAuthBlock {
    pub header_name: Option<String>,
    pub header_value: Option<SecretString>,
}

/// The shape blocks attached to one credential declaration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CredentialBlocks {
    pub basic_auth: Option<BasicAuthBlock>,
    pub oauth2: Option<OAuth2Block>,
    pub header_auth: Option<HeaderAuthBlock>,
}

impl BasicAuthBlock {
    fn is_populated(&self) -> bool {
        self.username.is_some() || self.password.is_some()
    }
}

impl OAuth2Block {
    fn is_populated(&self) -> bool {
        self.client_id.is_some()
            || self.client_secret.is_some()
            || self.access_token_url.is_some()
            || self.auth_url.is_some()
            || self.scope.is_some()
            || self.auth_query_parameters.is_some()
            || self.send_additional_body_properties.is_some()
            || self.additional_body_properties.is_some()
    }
}

impl HeaderAuthBlock {
    fn is_populated(&self) -> bool {
        self.header_name.is_some() || self.header_value.is_some()
    }
}

impl CredentialBlocks {
    /// Shapes whose block has at least one field set.
    pub fn populated(&self) -> Vec<ShapeKind> {
        let mut kinds = Vec::new();
        if self.basic_auth.as_ref().is_some_and(BasicAuthBlock::is_populated) {
            kinds.push(ShapeKind::BasicAuth);
        }
        if self.oauth2.as_ref().is_some_and(OAuth2Block::is_populated) {
            kinds.push(ShapeKind::OAuth2);
        }
        if self
            .header_auth
            .as_ref()
            .is_some_and(HeaderAuthBlock::is_populated)
        {
            kinds.push(ShapeKind::HeaderAuth);
        }
        kinds
    }
}

#[derive(Debug, Clone)]
pub struct BasicAuth {
    pub username: String,
    pub password: SecretString,
}

#[derive(Debug, Clone)]
pub struct OAuth2 {
    pub client_id: String,
    pub client_secret: SecretString,
    pub access_token_url: String,
    pub auth_url: String,
    pub scope: String,
    pub auth_query_parameters: String,
    pub send_additional_body_properties: bool,
    pub additional_body_properties: String,
}

#[derive(Debug, Clone)]
pub struct HeaderAuth {
    pub header_name: String,
    pub header_value: SecretString,
}

/// A validated credential payload. Exactly one shape per credential.
#[derive(Debug, Clone)]
pub enum CredentialShape {
    BasicAuth(BasicAuth),
    OAuth2(OAuth2),
    HeaderAuth(HeaderAuth),
}

/// Collects missing-field issues while reading one block.
struct FieldCheck<'a> {
    shape: ShapeKind,
    issues: &'a mut Vec<ConfigIssue>,
}

impl FieldCheck<'_> {
    fn required(&mut self, field: &'static str, value: &Option<String>) -> String {
        match value.as_deref() {
            Some(v) if !v.trim().is_empty() => v.to_string(),
            _ => {
                self.issues.push(ConfigIssue::MissingField {
                    shape: self.shape,
                    field,
                });
                String::new()
            }
        }
    }

    fn required_secret(
        &mut self,
        field: &'static str,
        value: &Option<SecretString>,
    ) -> SecretString {
        match value {
            Some(v) if !v.expose_secret().trim().is_empty() => v.clone(),
            _ => {
                self.issues.push(ConfigIssue::MissingField {
                    shape: self.shape,
                    field,
                });
                SecretString::default()
            }
        }
    }
}

impl CredentialShape {
    /// Select and validate the single populated shape.
    ///
    /// Every problem found is reported, not just the first.
    pub fn from_blocks(blocks: &CredentialBlocks) -> Result<Self, ConfigurationError> {
        let mut issues = Vec::new();
        match Self::collect(blocks, &mut issues) {
            Some(shape) if issues.is_empty() => Ok(shape),
            _ => Err(ConfigurationError::new(issues)),
        }
    }

    /// Validates `blocks`, appending problems to `issues`.
    ///
    /// Returns `None` when no usable shape could be built.
    pub(crate) fn collect(blocks: &CredentialBlocks, issues: &mut Vec<ConfigIssue>) -> Option<Self> {
        let populated = blocks.populated();
        let kind = match populated.as_slice() {
            [] => {
                issues.push(ConfigIssue::NoShape);
                return None;
            }
            [kind] => *kind,
            _ => {
                issues.push(ConfigIssue::MultipleShapes(populated));
                return None;
            }
        };

        let before = issues.len();
        let mut check = FieldCheck {
            shape: kind,
            issues: &mut *issues,
        };

        let shape = match kind {
            ShapeKind::BasicAuth => {
                let block = blocks.basic_auth.clone().unwrap_or_default();
                CredentialShape::BasicAuth(BasicAuth {
                    username: check.required("username", &block.username),
                    password: check.required_secret("password", &block.password),
                })
            }
            ShapeKind::OAuth2 => {
                let block = blocks.oauth2.clone().unwrap_or_default();
                CredentialShape::OAuth2(OAuth2 {
                    client_id: check.required("client_id", &block.client_id),
                    client_secret: check.required_secret(
                        "client_secret",
                        &block.client_secret,
                    ),
                    access_token_url: check.required("access_token_url", &block.access_token_url),
                    auth_url: check.required("auth_url", &block.auth_url),
                    scope: check.required("scope", &block.scope),
                    auth_query_parameters: block.auth_query_parameters.unwrap_or_default(),
                    send_additional_body_properties: block
                        .send_additional_body_properties
                        .unwrap_or(false),
                    additional_body_properties: block
                        .additional_body_properties
                        .unwrap_or_default(),
                })
            }
            ShapeKind::HeaderAuth => {
                let block = blocks.header_auth.clone().unwrap_or_default();
                CredentialShape::HeaderAuth(HeaderAuth {
                    header_name: check.required("header_name", &block.header_name),
                    header_value: check.required_secret("header_value", &block.header_value),
                })
            }
        };

        (issues.len() == before).then_some(shape)
    }

    pub fn kind(&self) -> ShapeKind {
        match self {
            CredentialShape::BasicAuth(_) => ShapeKind::BasicAuth,
            CredentialShape::OAuth2(_) => ShapeKind::OAuth2,
            CredentialShape::HeaderAuth(_) => ShapeKind::HeaderAuth,
        }
    }

    pub fn remote_type(&self) -> &'static str {
        self.kind().remote_type()
    }

    /// Map the shape onto n8n's field names.
    ///
    /// This is where secrets leave their wrappers, for the request body
    /// and the state file.
    pub fn to_payload(&self) -> Payload {
        match self {
            CredentialShape::BasicAuth(basic) => payload([
                ("user", Value::from(basic.username.as_str())),
                ("password", Value::from(basic.password.expose_secret())),
            ]),
            CredentialShape::OAuth2(oauth) => payload([
                ("clientId", Value::from(oauth.client_id.as_str())),
                ("clientSecret", Value::from(oauth.client_secret.expose_secret())),
                ("accessTokenUrl", Value::from(oauth.access_token_url.as_str())),
                ("authUrl", Value::from(oauth.auth_url.as_str())),
                ("scope", Value::from(oauth.scope.as_str())),
                (
                    "authQueryParameters",
                    Value::from(oauth.auth_query_parameters.as_str()),
                ),
                (
                    "sendAdditionalBodyProperties",
                    Value::from(oauth.send_additional_body_properties),
                ),
                (
                    "additionalBodyProperties",
                    Value::from(oauth.additional_body_properties.as_str()),
                ),
            ]),
            CredentialShape::HeaderAuth(header) => payload([
                ("name", Value::from(header.header_name.as_str())),
                ("value", Value::from(header.header_value.expose_secret())),
            ]),
        }
    }
}

fn payload<const N: usize>(fields: [(&str, Value); N]) -> Payload {
    fields
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}
