//! Command implementations shared by the CLI.
//!
//! Each function reconciles the declarations in a [`ResolvedConfig`]
//! against a [`StateStore`] and returns a serializable summary.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use crate::api::CredentialsApi;
use crate::client::HttpTransport;
use crate::config::ResolvedConfig;
use crate::error::{ConfigurationError, Error};
use crate::models::CredentialState;
use crate::resource::{
    plan, CredentialDeclaration, CredentialResource, DesiredCredential, PlanAction, ReadOutcome,
};
use crate::storage::StateStore;

/// JSON output for one credential change
#[derive(Debug, Serialize)]
pub struct ChangeOutput {
    pub name: String,
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub changed: Vec<&'static str>,
}

/// JSON output for a declaration that failed validation
#[derive(Debug, Serialize)]
pub struct InvalidOutput {
    pub name: String,
    pub issues: Vec<String>,
}

/// JSON output for `plan`
#[derive(Debug, Serialize)]
pub struct PlanOutput {
    pub changes: Vec<ChangeOutput>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub invalid: Vec<InvalidOutput>,
}

/// JSON output for a read that fell back to the stored state
#[derive(Debug, Serialize)]
pub struct RefreshWarning {
    pub name: String,
    pub id: String,
    pub error: String,
}

/// JSON output for `refresh`
#[derive(Debug, Serialize)]
pub struct RefreshOutput {
    pub refreshed: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<RefreshWarning>,
}

/// One step of a plan.
#[derive(Debug)]
pub struct PlannedChange {
    /// State key: the declared credential name.
    pub name: String,
    pub current: Option<CredentialState>,
    pub desired: Option<DesiredCredential>,
    pub action: PlanAction,
}

impl PlannedChange {
    fn output(&self) -> ChangeOutput {
        ChangeOutput {
            name: self.name.clone(),
            action: action_label(&self.action).to_string(),
            id: self.current.as_ref().map(|state| state.id.to_string()),
            previous_id: None,
            changed: match &self.action {
                PlanAction::Replace { changed } => changed.clone(),
                _ => Vec::new(),
            },
        }
    }
}

#[derive(Debug)]
pub struct InvalidDeclaration {
    pub name: String,
    pub error: ConfigurationError,
}

#[derive(Debug, Default)]
pub struct Plan {
    pub changes: Vec<PlannedChange>,
    pub invalid: Vec<InvalidDeclaration>,
}

impl Plan {
    /// Changes that require a remote call.
    pub fn pending(&self) -> impl Iterator<Item = &PlannedChange> {
        self.changes.iter().filter(|change| !change.action.is_noop())
    }

    pub fn ensure_valid(&self) -> Result<()> {
        if self.invalid.is_empty() {
            return Ok(());
        }
        let details: Vec<String> = self
            .invalid
            .iter()
            .map(|invalid| format!("{}: {}", invalid.name, invalid.error))
            .collect();
        bail!(
            "Invalid credential declarations, nothing was applied:\n{}",
            details.join("\n")
        );
    }

    pub fn output(&self) -> PlanOutput {
        PlanOutput {
            changes: self.pending().map(PlannedChange::output).collect(),
            invalid: self
                .invalid
                .iter()
                .map(|invalid| InvalidOutput {
                    name: invalid.name.clone(),
                    issues: invalid
                        .error
                        .issues()
                        .iter()
                        .map(ToString::to_string)
                        .collect(),
                })
                .collect(),
        }
    }
}

fn action_label(action: &PlanAction) -> &'static str {
    match action {
        PlanAction::NoOp => "noop",
        PlanAction::Create => "create",
        PlanAction::Replace { .. } => "replace",
        PlanAction::Delete => "delete",
    }
}

fn display_name(index: usize, declaration: &CredentialDeclaration) -> String {
    if declaration.name.trim().is_empty() {
        format!("credential[{index}]")
    } else {
        declaration.name.clone()
    }
}

pub fn config_output(config: &ResolvedConfig) -> serde_json::Value {
    serde_json::json!({
        "config_file": config.config_path.display().to_string(),
        "state_file": config.state_file.display().to_string(),
        "provider": {
            "host": config.provider.host,
            "api_key_set": config.provider.api_key.is_some(),
            "insecure": config.provider.insecure.unwrap_or(false),
        },
        "credentials": config.credentials.iter().map(|d| d.name.clone()).collect::<Vec<_>>(),
    })
}

/// Build the credential resource for the configured instance.
pub fn build_resource(config: &ResolvedConfig) -> Result<CredentialResource> {
    let transport = HttpTransport::new(config.provider.client_config()?)
        .context("Failed to create n8n client")?;
    Ok(CredentialResource::new(CredentialsApi::new(Arc::new(
        transport,
    ))))
}

/// Compare every declaration with stored state. No remote call is made.
///
/// Stored credentials with no declaration are planned for deletion. A
/// declaration that fails validation keeps its stored state out of the
/// plan entirely rather than deleting it.
pub async fn plan_all(
    declarations: &[CredentialDeclaration],
    store: &dyn StateStore,
) -> Result<Plan> {
    let mut stored: BTreeMap<String, CredentialState> = store
        .list()
        .await
        .context("Failed to load credential state")?
        .into_iter()
        .collect();

    let mut result = Plan::default();
    for (index, declaration) in declarations.iter().enumerate() {
        let name = display_name(index, declaration);
        let current = stored.remove(&declaration.name);

        match declaration.validate() {
            Ok(desired) => {
                let action = plan(current.as_ref(), Some(&desired));
                result.changes.push(PlannedChange {
                    name,
                    current,
                    desired: Some(desired),
                    action,
                });
            }
            Err(error) => result.invalid.push(InvalidDeclaration { name, error }),
        }
    }

    for (name, current) in stored {
        result.changes.push(PlannedChange {
            name,
            current: Some(current),
            desired: None,
            action: PlanAction::Delete,
        });
    }

    Ok(result)
}

/// Execute the plan, saving state after every step.
///
/// Stops at the first failure; steps already applied stay recorded.
pub async fn apply(
    resource: &CredentialResource,
    declarations: &[CredentialDeclaration],
    store: &dyn StateStore,
) -> Result<Vec<ChangeOutput>> {
    let plan = plan_all(declarations, store).await?;
    plan.ensure_valid()?;

    let mut applied = Vec::new();
    for change in plan.pending() {
        applied.push(apply_change(resource, store, change).await?);
    }

    info!(changes = applied.len(), "Apply complete");
    Ok(applied)
}

async fn apply_change(
    resource: &CredentialResource,
    store: &dyn StateStore,
    change: &PlannedChange,
) -> Result<ChangeOutput> {
    let name = change.name.as_str();
    let mut output = change.output();

    match (&change.action, &change.current, &change.desired) {
        (PlanAction::Create, None, Some(desired)) => {
            let state = resource
                .create(desired)
                .await
                .with_context(|| format!("Failed to create credential {name}"))?;
            output.id = Some(state.id.to_string());
            save(store, name, &state).await?;
        }
        (PlanAction::Replace { .. }, Some(current), Some(desired)) => {
            match resource.replace(current, desired).await {
                Ok(replaced) => {
                    output.previous_id = Some(replaced.previous_id.to_string());
                    output.id = Some(replaced.state.id.to_string());
                    save(store, name, &replaced.state).await?;
                }
                Err(error @ Error::ReplaceIncomplete { .. }) => {
                    // The old credential is gone remotely; stop tracking it.
                    if let Err(remove_error) = store.remove(name).await {
                        warn!(
                            name = %name,
                            deleted_id = %current.id,
                            error = %format!("{remove_error:#}"),
                            "Failed to remove partially replaced credential from state"
                        );
                    }
                    return Err(anyhow::Error::new(error)
                        .context(format!("Failed to replace credential {name} ({})", current.id)));
                }
                Err(error) => {
                    return Err(error).with_context(|| {
                        format!("Failed to replace credential {name} ({})", current.id)
                    });
                }
            }
        }
        (PlanAction::Delete, Some(current), _) => {
            delete_tracked(resource, store, name, current).await?;
            output.previous_id = output.id.take();
        }
        (action, _, _) => bail!("Inconsistent plan step for {name}: {action}"),
    }

    Ok(output)
}

async fn save(store: &dyn StateStore, name: &str, state: &CredentialState) -> Result<()> {
    store
        .save(name, state)
        .await
        .with_context(|| format!("Failed to save state for credential {name} ({})", state.id))
}

async fn delete_tracked(
    resource: &CredentialResource,
    store: &dyn StateStore,
    name: &str,
    current: &CredentialState,
) -> Result<()> {
    resource
        .delete(current)
        .await
        .with_context(|| format!("Failed to delete credential {name} ({})", current.id))?;
    store
        .remove(name)
        .await
        .with_context(|| format!("Failed to remove {name} from state"))?;
    Ok(())
}

/// Re-read every stored credential from the server.
///
/// Read failures are reported as warnings and leave the stored entry as is.
pub async fn refresh(resource: &CredentialResource, store: &dyn StateStore) -> Result<RefreshOutput> {
    let entries = store
        .list()
        .await
        .context("Failed to load credential state")?;

    let mut output = RefreshOutput {
        refreshed: Vec::new(),
        warnings: Vec::new(),
    };

    for (name, state) in entries {
        match resource.read(state).await {
            ReadOutcome::Refreshed(state) => {
                save(store, &name, &state).await?;
                output.refreshed.push(name);
            }
            ReadOutcome::Retained { state, error } => {
                output.warnings.push(RefreshWarning {
                    name,
                    id: state.id.to_string(),
                    error: format!("{:#}", anyhow::Error::new(error)),
                });
            }
        }
    }

    Ok(output)
}

/// Delete every stored credential, or only `name`.
pub async fn destroy(
    resource: &CredentialResource,
    store: &dyn StateStore,
    name: Option<&str>,
) -> Result<Vec<ChangeOutput>> {
    let entries = match name {
        Some(name) => {
            let state = store
                .get(name)
                .await
                .context("Failed to load credential state")?;
            match state {
                Some(state) => vec![(name.to_string(), state)],
                None => bail!("No credential named {name} in state"),
            }
        }
        None => store
            .list()
            .await
            .context("Failed to load credential state")?,
    };

    let mut destroyed = Vec::new();
    for (name, state) in entries {
        delete_tracked(resource, store, &name, &state).await?;
        destroyed.push(ChangeOutput {
            name,
            action: action_label(&PlanAction::Delete).to_string(),
            id: None,
            previous_id: Some(state.id.to_string()),
            changed: Vec::new(),
        });
    }

    Ok(destroyed)
}

/// Start tracking an existing remote credential under `name`.
pub async fn import(
    resource: &CredentialResource,
    store: &dyn StateStore,
    name: &str,
    id: &str,
) -> Result<ChangeOutput> {
    if name.trim().is_empty() {
        bail!("Credential name must not be empty");
    }
    if let Some(existing) = store
        .get(name)
        .await
        .context("Failed to load credential state")?
    {
        bail!(
            "Credential {name} is already tracked with ID {}; destroy or remove it first",
            existing.id
        );
    }

    let state = resource
        .import(id)
        .await
        .with_context(|| format!("Failed to import credential {id}"))?;
    save(store, name, &state).await?;

    warn!(
        name = %name,
        id = %state.id,
        "Imported credential has no payload; the next apply will replace it"
    );

    Ok(ChangeOutput {
        name: name.to_string(),
        action: "import".to_string(),
        id: Some(state.id.to_string()),
        previous_id: None,
        changed: Vec::new(),
    })
}
