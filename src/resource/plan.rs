//! Plan-time comparison of local state and a validated declaration.
//!
//! Every attribute of a credential is immutable remotely, so a difference
//! always plans a replace. There is no in-place update.

use std::fmt;

use super::DesiredCredential;
use crate::models::{node_access_set, CredentialState};

/// What has to happen to converge one credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanAction {
    NoOp,
    Create,
    /// Delete and recreate; the id will change.
    Replace { changed: Vec<&'static str> },
    Delete,
}

impl PlanAction {
    pub fn is_noop(&self) -> bool {
        matches!(self, PlanAction::NoOp)
    }
}

impl fmt::Display for PlanAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanAction::NoOp => write!(f, "no changes"),
            PlanAction::Create => write!(f, "create"),
            PlanAction::Replace { changed } => {
                write!(f, "replace (changed: {})", changed.join(", "))
            }
            PlanAction::Delete => write!(f, "delete"),
        }
    }
}

/// Attributes that differ between `current` and `desired`.
pub fn changed_attributes(
    current: &CredentialState,
    desired: &DesiredCredential,
) -> Vec<&'static str> {
    let mut changed = Vec::new();
    if current.name != desired.name {
        changed.push("name");
    }
    if current.credential_type != desired.credential_type() {
        changed.push("type");
    }
    if current.payload != desired.payload() {
        changed.push("payload");
    }
    if current.node_access_set() != node_access_set(desired.nodes_access.as_deref()) {
        changed.push("nodes_access");
    }
    changed
}

pub fn plan(current: Option<&CredentialState>, desired: Option<&DesiredCredential>) -> PlanAction {
    match (current, desired) {
        (None, None) => PlanAction::NoOp,
        (None, Some(_)) => PlanAction::Create,
        (Some(_), None) => PlanAction::Delete,
        (Some(current), Some(desired)) => {
            let changed = changed_attributes(current, desired);
            if changed.is_empty() {
                PlanAction::NoOp
            } else {
                PlanAction::Replace { changed }
            }
        }
    }
}
