//! Error taxonomy for the credential client and lifecycle adapter.
//!
//! Library operations return [`Error`]. Configuration problems are collected
//! into a single [`ConfigurationError`] so a declaration can be fixed in one
//! pass. Application glue (config files, state files, the CLI) uses `anyhow`.

use std::fmt;

use crate::models::IdError;
use crate::shape::ShapeKind;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The declaration is invalid. Never sent to the remote.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// The client could not be constructed from the given settings.
    #[error("invalid client configuration: {0}")]
    InvalidClientConfig(String),

    /// A credential id cannot be used as a request path segment.
    #[error(transparent)]
    InvalidId(#[from] IdError),

    /// No response was obtained, or a body could not be encoded/decoded.
    #[error("{message}")]
    Transport {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// The server answered with a status outside `200..300`.
    #[error("API error (status {status}): {body}")]
    Api { status: u16, body: String },

    /// Neither the direct fetch nor the list fallback found the id.
    #[error("credential with ID {id} not found")]
    NotFound { id: String },

    /// The old credential was deleted but the replacement was not created.
    ///
    /// The credential no longer exists remotely; it has to be recreated.
    #[error(
        "credential {deleted_id} was deleted but its replacement could not be created; \
         the credential no longer exists in n8n and must be recreated: {source}"
    )]
    ReplaceIncomplete {
        deleted_id: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub fn transport(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Transport {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// HTTP status carried by an [`Error::Api`], if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. }) || self.status() == Some(404)
    }
}

/// A single problem found while validating a credential declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigIssue {
    /// A top-level attribute is missing or empty.
    MissingAttribute { attribute: &'static str },
    NoShape,
    MultipleShapes(Vec<ShapeKind>),
    MissingField {
        shape: ShapeKind,
        field: &'static str,
    },
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingAttribute { attribute } => write!(f, "{attribute} is required"),
            Self::NoShape => write!(
                f,
                "no credential shape specified (expected exactly one of: {})",
                join_shapes(ShapeKind::ALL)
            ),
            Self::MultipleShapes(shapes) => write!(
                f,
                "multiple credential shapes specified: {}",
                join_shapes(shapes)
            ),
            Self::MissingField { shape, field } => write!(f, "{shape}.{field} is required"),
        }
    }
}

fn join_shapes(shapes: &[ShapeKind]) -> String {
    shapes
        .iter()
        .map(|s| s.block_name())
        .collect::<Vec<_>>()
        .join(", ")
}

/// All problems found in one declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationError {
    issues: Vec<ConfigIssue>,
}

impl ConfigurationError {
    pub fn new(issues: Vec<ConfigIssue>) -> Self {
        Self { issues }
    }

    pub fn issues(&self) -> &[ConfigIssue] {
        &self.issues
    }

    /// Fields reported missing for `shape`, in declaration order.
    pub fn missing_fields(&self, shape: ShapeKind) -> Vec<&'static str> {
        self.issues
            .iter()
            .filter_map(|issue| match issue {
                ConfigIssue::MissingField { shape: s, field } if *s == shape => Some(*field),
                _ => None,
            })
            .collect()
    }
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.issues.as_slice() {
            [single] => write!(f, "invalid credential configuration: {single}"),
            issues => {
                write!(f, "invalid credential configuration:")?;
                for issue in issues {
                    write!(f, "\n  - {issue}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigurationError {}
