use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use n8n_credentials::app;
use n8n_credentials::config::{default_config_path, ResolvedConfig};
use n8n_credentials::schema::{
    credential_schema, provider_schema, resource_type_name, PROVIDER_TYPE_NAME,
};
use n8n_credentials::storage::JsonFileStateStore;
use serde::Serialize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "n8n-credentials")]
#[command(about = "Declarative management of n8n credentials")]
struct Cli {
    /// Path to config file (defaults to ./n8n-credentials.toml, then the user config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the changes apply would make, without calling the API
    Plan,
    /// Create, replace and delete credentials to match the config
    Apply,
    /// Re-read tracked credentials from the server
    Refresh,
    /// Delete tracked credentials (all, or one by name)
    Destroy {
        /// Credential name to destroy
        name: Option<String>,
    },
    /// Track an existing credential by its n8n ID
    Import {
        /// Name to track the credential under
        name: String,
        /// n8n credential ID
        id: String,
    },
    /// Print the provider and resource schema
    Schema,
    /// Show current configuration
    Config,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(layer.json())
            .init();
    } else {
        tracing_subscriber::registry().with(filter).with(layer).init();
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    if let Command::Schema = cli.command {
        let mut resources = serde_json::Map::new();
        resources.insert(
            resource_type_name(PROVIDER_TYPE_NAME),
            serde_json::to_value(credential_schema())?,
        );
        return print_json(&serde_json::json!({
            "provider": {
                "type_name": PROVIDER_TYPE_NAME,
                "schema": provider_schema(),
            },
            "resources": resources,
        }));
    }

    let config_path = cli.config.unwrap_or_else(default_config_path);
    let config = ResolvedConfig::load(&config_path)
        .with_context(|| format!("Failed to load config: {}", config_path.display()))?;
    let store = JsonFileStateStore::new(&config.state_file);

    match cli.command {
        Command::Config => print_json(&app::config_output(&config)),
        Command::Plan => {
            let plan = app::plan_all(&config.credentials, &store).await?;
            print_json(&plan.output())?;
            plan.ensure_valid()
        }
        Command::Apply => {
            let resource = app::build_resource(&config)?;
            print_json(&app::apply(&resource, &config.credentials, &store).await?)
        }
        Command::Refresh => {
            let resource = app::build_resource(&config)?;
            print_json(&app::refresh(&resource, &store).await?)
        }
        Command::Destroy { name } => {
            let resource = app::build_resource(&config)?;
            print_json(&app::destroy(&resource, &store, name.as_deref()).await?)
        }
        Command::Import { name, id } => {
            let resource = app::build_resource(&config)?;
            print_json(&app::import(&resource, &store, &name, &id).await?)
        }
        Command::Schema => Ok(()),
    }
}
