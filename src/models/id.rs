use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error(
    "Invalid credential id {value:?}: ids must be a single URL path segment \
     (non-empty, no '/', '\\\\', '?', '#', whitespace, '.' or '..')"
)]
pub struct IdError {
    value: String,
}

/// Opaque credential identifier assigned by the n8n server.
///
/// The id is not stable across updates: every replace yields a new one.
/// It is interpolated into request paths, so it must be a single path
/// segment before it is sent anywhere.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialId(String);

impl CredentialId {
    /// Wrap a server-provided id without validation.
    pub fn from_string(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Create an id, validating that it is a safe path segment.
    pub fn from_string_checked(value: impl Into<String>) -> Result<Self, IdError> {
        let value = value.into();
        if Self::is_path_safe(&value) {
            Ok(Self(value))
        } else {
            Err(IdError { value })
        }
    }

    /// Re-validate an id that may have come from an unchecked source.
    pub fn checked(&self) -> Result<&Self, IdError> {
        if Self::is_path_safe(&self.0) {
            Ok(self)
        } else {
            Err(IdError {
                value: self.0.clone(),
            })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the string can be used as a single URL path segment.
    pub fn is_path_safe(value: &str) -> bool {
        if value.is_empty() || value == "." || value == ".." {
            return false;
        }
        !value
            .chars()
            .any(|c| matches!(c, '/' | '\\' | '?' | '#' | '\0') || c.is_whitespace())
    }
}

impl fmt::Display for CredentialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for CredentialId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for CredentialId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl AsRef<str> for CredentialId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_string_keeps_value() {
        let id = CredentialId::from_string("zYk3o1Vq2W0mJ5Ab");
        assert_eq!(id.as_str(), "zYk3o1Vq2W0mJ5Ab");
    }

    #[test]
    fn test_from_string_checked_rejects_unsafe_values() {
        assert!(CredentialId::from_string_checked("").is_err());
        assert!(CredentialId::from_string_checked("..").is_err());
        assert!(CredentialId::from_string_checked(".").is_err());
        assert!(CredentialId::from_string_checked("foo/bar").is_err());
        assert!(CredentialId::from_string_checked("foo\\bar").is_err());
        assert!(CredentialId::from_string_checked("id?force=true").is_err());
        assert!(CredentialId::from_string_checked("id#frag").is_err());
        assert!(CredentialId::from_string_checked("has space").is_err());
        assert!(CredentialId::from_string_checked("42").is_ok());
    }

    #[test]
    fn test_checked_revalidates_unchecked_ids() {
        let id = CredentialId::from_string("../../workflows");
        assert!(id.checked().is_err());
        let id = CredentialId::from_string("abc123");
        assert_eq!(id.checked().map(CredentialId::as_str), Ok("abc123"));
    }
}
