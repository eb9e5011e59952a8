//! Lifecycle adapter for the `credential` resource.
//!
//! Maps the host tool's callbacks (plan, create, read, replace, delete,
//! import) onto [`CredentialsApi`] calls and keeps [`CredentialState`]
//! current. The declared payload stays authoritative because the server
//! never returns it.

mod declaration;
mod plan;

pub use declaration::{CredentialDeclaration, DesiredCredential};
pub use plan::{changed_attributes, plan, PlanAction};

use tracing::{info, warn};

use crate::api::CredentialsApi;
use crate::error::{Error, Result};
use crate::models::{CredentialId, CredentialState};

/// Result of refreshing a credential from the server.
#[derive(Debug)]
pub enum ReadOutcome {
    /// The server answered; id, name, type and node access are current.
    Refreshed(CredentialState),
    /// The server could not be read. The prior state is kept unchanged and
    /// the error is reported as a warning.
    Retained {
        state: CredentialState,
        error: Error,
    },
}

impl ReadOutcome {
    pub fn state(&self) -> &CredentialState {
        match self {
            ReadOutcome::Refreshed(state) | ReadOutcome::Retained { state, .. } => state,
        }
    }

    pub fn into_state(self) -> CredentialState {
        match self {
            ReadOutcome::Refreshed(state) | ReadOutcome::Retained { state, .. } => state,
        }
    }

    pub fn warning(&self) -> Option<&Error> {
        match self {
            ReadOutcome::Refreshed(_) => None,
            ReadOutcome::Retained { error, .. } => Some(error),
        }
    }
}

/// Result of a replace: the credential now lives under a different id.
#[derive(Debug)]
pub struct Replaced {
    pub previous_id: CredentialId,
    pub state: CredentialState,
}

/// The `credential` resource bound to one n8n instance.
#[derive(Clone)]
pub struct CredentialResource {
    api: CredentialsApi,
}

impl CredentialResource {
    pub fn new(api: CredentialsApi) -> Self {
        Self { api }
    }

    /// Validate `declaration` and decide what has to happen to `current`.
    ///
    /// No remote call is made.
    pub fn plan(
        &self,
        current: Option<&CredentialState>,
        declaration: Option<&CredentialDeclaration>,
    ) -> Result<PlanAction> {
        let desired = declaration.map(CredentialDeclaration::validate).transpose()?;
        Ok(plan(current, desired.as_ref()))
    }

    pub async fn create(&self, desired: &DesiredCredential) -> Result<CredentialState> {
        info!(name = %desired.name, credential_type = desired.credential_type(), "Creating credential");

        let created = self.api.create(&desired.to_request()).await?;
        let state = state_from_created(desired, &created);

        info!(id = %state.id, name = %state.name, "Created credential");
        Ok(state)
    }

    /// Refresh `state` from the server.
    ///
    /// Never fails: n8n may refuse to return credentials as a matter of
    /// policy, so any error keeps `state` as it was and is reported through
    /// [`ReadOutcome::Retained`].
    pub async fn read(&self, state: CredentialState) -> ReadOutcome {
        info!(id = %state.id, "Reading credential");

        match self.api.fetch(&state.id).await {
            Ok(remote) => {
                let mut refreshed = state;
                refreshed.refresh_from(&remote);
                info!(id = %refreshed.id, name = %refreshed.name, "Read credential");
                ReadOutcome::Refreshed(refreshed)
            }
            Err(error) => {
                warn!(
                    id = %state.id,
                    error = %error,
                    "Could not read credential from API, keeping existing state"
                );
                ReadOutcome::Retained { state, error }
            }
        }
    }

    /// Delete `current` and create `desired` in its place.
    ///
    /// See [`CredentialsApi::replace`] for the failure modes.
    pub async fn replace(
        &self,
        current: &CredentialState,
        desired: &DesiredCredential,
    ) -> Result<Replaced> {
        info!(old_id = %current.id, name = %desired.name, "Replacing credential via delete-and-recreate");

        let created = self.api.replace(&current.id, &desired.to_request()).await?;
        let state = state_from_created(desired, &created);

        if state.id != current.id {
            info!(old_id = %current.id, new_id = %state.id, "Credential ID changed after replace");
        }

        Ok(Replaced {
            previous_id: current.id.clone(),
            state,
        })
    }

    pub async fn delete(&self, state: &CredentialState) -> Result<()> {
        info!(id = %state.id, "Deleting credential");
        self.api.delete(&state.id).await?;
        info!(id = %state.id, "Deleted credential");
        Ok(())
    }

    /// Adopt an existing remote credential.
    ///
    /// The payload cannot be recovered, so the imported state carries an
    /// empty one and the next plan replaces the credential with the
    /// declared payload.
    pub async fn import(&self, id: &str) -> Result<CredentialState> {
        let id = CredentialId::from_string_checked(id)?;
        info!(%id, "Importing credential");

        let remote = self.api.fetch(&id).await?;
        let mut state = CredentialState::imported(id);
        state.refresh_from(&remote);
        Ok(state)
    }
}

fn state_from_created(
    desired: &DesiredCredential,
    created: &crate::models::Credential,
) -> CredentialState {
    CredentialState {
        id: created.id.clone(),
        name: created.name.clone(),
        credential_type: created.credential_type.clone(),
        payload: desired.payload(),
        nodes_access: created
            .node_types()
            .or_else(|| desired.nodes_access.clone()),
    }
}
