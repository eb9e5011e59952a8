use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::client::ClientConfig;
use crate::resource::CredentialDeclaration;

pub const DEFAULT_CONFIG_FILE: &str = "n8n-credentials.toml";

pub const ENV_HOST: &str = "N8N_HOST";
pub const ENV_API_KEY: &str = "N8N_API_KEY";
pub const ENV_INSECURE: &str = "N8N_INSECURE";

/// Default state file name, next to the config file.
fn default_state_file() -> PathBuf {
    PathBuf::from("n8n-credentials.state.json")
}

/// Provider connection settings.
///
/// Anything left unset here can come from the environment, see
/// [`ProviderSettings::apply_env`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// The n8n instance host URL (e.g., "https://n8n.example.com").
    pub host: Option<String>,

    /// API key sent in the `X-N8N-API-KEY` header.
    pub api_key: Option<SecretString>,

    /// Skip TLS certificate verification.
    pub insecure: Option<bool>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn non_empty_secret(value: Option<SecretString>) -> Option<SecretString> {
    value.filter(|v| !v.expose_secret().trim().is_empty())
}

impl ProviderSettings {
    /// Fill unset values from the environment.
    ///
    /// Values in the file win. Empty values count as unset.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        self.host = non_empty(self.host.take()).or_else(|| non_empty(lookup(ENV_HOST)));
        self.api_key = non_empty_secret(self.api_key.take())
            .or_else(|| non_empty(lookup(ENV_API_KEY)).map(SecretString::from));

        if self.insecure.is_none() {
            if let Some(raw) = non_empty(lookup(ENV_INSECURE)) {
                self.insecure = Some(parse_bool(&raw).with_context(|| {
                    format!("Invalid {ENV_INSECURE} value {raw:?}")
                })?);
            }
        }
        Ok(())
    }

    /// Build client settings, reporting every missing value at once.
    pub fn client_config(&self) -> Result<ClientConfig> {
        let mut missing = Vec::new();
        if self.host.as_deref().map_or(true, |h| h.trim().is_empty()) {
            missing.push(format!("provider.host (or {ENV_HOST})"));
        }
        let api_key = non_empty_secret(self.api_key.clone());
        if api_key.is_none() {
            missing.push(format!("provider.api_key (or {ENV_API_KEY})"));
        }
        if !missing.is_empty() {
            bail!("Missing provider settings: {}", missing.join(", "));
        }

        let host = self.host.clone().unwrap_or_default();
        Ok(ClientConfig::new(host, api_key.unwrap_or_default())
            .with_insecure(self.insecure.unwrap_or(false)))
    }
}

fn parse_bool(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => bail!("expected true or false"),
    }
}

/// Configuration file contents.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to the state file. If relative, resolved from the config file location.
    pub state_file: Option<PathBuf>,

    /// Provider connection settings.
    pub provider: ProviderSettings,

    /// Declared credentials (`[[credential]]` tables).
    #[serde(rename = "credential")]
    pub credentials: Vec<CredentialDeclaration>,
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;

        let mut seen = HashSet::new();
        for declaration in &config.credentials {
            if !declaration.name.is_empty() && !seen.insert(declaration.name.as_str()) {
                bail!("Duplicate credential name {:?}", declaration.name);
            }
        }

        Ok(config)
    }

    /// Resolve the state file path.
    ///
    /// If `state_file` is set and relative, it's resolved relative to `config_dir`.
    pub fn resolve_state_file(&self, config_dir: &Path) -> PathBuf {
        match &self.state_file {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => config_dir.join(path),
            None => config_dir.join(default_state_file()),
        }
    }
}

/// Loaded configuration with resolved paths and environment applied.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The config file this was loaded from.
    pub config_path: PathBuf,

    /// The resolved state file path.
    pub state_file: PathBuf,

    pub provider: ProviderSettings,

    pub credentials: Vec<CredentialDeclaration>,
}

/// Returns the default config file path.
///
/// Resolution order:
/// 1. `./n8n-credentials.toml` if it exists in current directory
/// 2. `~/.config/n8n-credentials/n8n-credentials.toml` (user config directory)
pub fn default_config_path() -> PathBuf {
    let local_config = PathBuf::from(DEFAULT_CONFIG_FILE);
    if local_config.exists() {
        return local_config;
    }

    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("n8n-credentials").join(DEFAULT_CONFIG_FILE);
    }

    local_config
}

impl ResolvedConfig {
    /// Load and resolve config from a file path, reading the process environment.
    pub fn load(config_path: &Path) -> Result<Self> {
        Self::load_with_env(config_path, |key| std::env::var(key).ok())
    }

    /// Load and resolve config with an explicit environment lookup.
    pub fn load_with_env(
        config_path: &Path,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let config_path = config_path
            .canonicalize()
            .with_context(|| format!("Config file not found: {}", config_path.display()))?;

        let config_dir = config_path
            .parent()
            .context("Config file has no parent directory")?;

        let config = Config::load(&config_path)?;
        let state_file = config.resolve_state_file(config_dir);

        let mut provider = config.provider;
        provider.apply_env(lookup)?;

        Ok(Self {
            state_file,
            provider,
            credentials: config.credentials,
            config_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_state_file_is_next_to_config() {
        let config = Config::default();
        assert_eq!(
            config.resolve_state_file(Path::new("/srv/n8n")),
            PathBuf::from("/srv/n8n/n8n-credentials.state.json")
        );
    }

    #[test]
    fn test_relative_and_absolute_state_file() {
        let mut config = Config {
            state_file: Some(PathBuf::from("state/creds.json")),
            ..Default::default()
        };
        assert_eq!(
            config.resolve_state_file(Path::new("/srv/n8n")),
            PathBuf::from("/srv/n8n/state/creds.json")
        );

        config.state_file = Some(PathBuf::from("/var/lib/creds.json"));
        assert_eq!(
            config.resolve_state_file(Path::new("/srv/n8n")),
            PathBuf::from("/var/lib/creds.json")
        );
    }

    #[test]
    fn test_parse_full_config() -> Result<()> {
        let config = Config::parse(
            r#"
state_file = "state.json"

[provider]
host = "https://n8n.example.com"
api_key = "secret"

[[credential]]
name = "github"
nodes_access = ["n8n-nodes-base.github"]

[credential.basic_auth]
username = "octocat"
password = "hunter2"

[[credential]]
name = "token"

[credential.header_auth]
header_name = "X-Token"
header_value = "t"
"#,
        )?;

        assert_eq!(config.credentials.len(), 2);
        assert_eq!(config.credentials[0].name, "github");
        assert!(config.credentials[0].blocks.basic_auth.is_some());
        assert!(config.credentials[1].blocks.header_auth.is_some());
        assert_eq!(config.provider.insecure, None);
        Ok(())
    }

    #[test]
    fn test_duplicate_names_are_rejected() {
        let err = Config::parse(
            r#"
[[credential]]
name = "dup"
[credential.basic_auth]
username = "a"
password = "b"

[[credential]]
name = "dup"
[credential.basic_auth]
username = "c"
password = "d"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("Duplicate credential name \"dup\""));
    }

    #[test]
    fn test_env_fills_unset_values_only() -> Result<()> {
        let mut settings = ProviderSettings {
            host: Some("https://from-file.example.com".to_string()),
            api_key: Some(SecretString::from("")),
            insecure: None,
        };
        settings.apply_env(env(&[
            (ENV_HOST, "https://from-env.example.com"),
            (ENV_API_KEY, "env-key"),
            (ENV_INSECURE, "true"),
        ]))?;

        assert_eq!(settings.host.as_deref(), Some("https://from-file.example.com"));
        assert_eq!(
            settings.api_key.as_ref().map(|k| k.expose_secret()),
            Some("env-key")
        );
        assert_eq!(settings.insecure, Some(true));
        Ok(())
    }

    #[test]
    fn test_invalid_insecure_env_is_an_error() {
        let mut settings = ProviderSettings::default();
        let err = settings
            .apply_env(env(&[(ENV_INSECURE, "maybe")]))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_INSECURE));
    }

    #[test]
    fn test_client_config_reports_all_missing_settings() {
        let err = ProviderSettings::default().client_config().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("provider.host (or N8N_HOST)"));
        assert!(message.contains("provider.api_key (or N8N_API_KEY)"));
    }

    #[test]
    fn test_client_config_defaults_to_secure() -> Result<()> {
        let settings = ProviderSettings {
            host: Some("https://n8n.example.com".to_string()),
            api_key: Some(SecretString::from("key")),
            insecure: None,
        };
        assert!(!settings.client_config()?.insecure);
        Ok(())
    }

    #[test]
    fn test_load_with_env_resolves_paths() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        let mut file = std::fs::File::create(&path)?;
        writeln!(
            file,
            r#"
state_file = "state/creds.json"

[provider]
host = "https://n8n.example.com"
"#
        )?;

        let config = ResolvedConfig::load_with_env(&path, env(&[(ENV_API_KEY, "k")]))?;

        assert_eq!(
            config.state_file,
            dir.path().canonicalize()?.join("state/creds.json")
        );
        assert_eq!(
            config.provider.api_key.as_ref().map(|k| k.expose_secret()),
            Some("k")
        );
        assert!(config.credentials.is_empty());
        Ok(())
    }

    #[test]
    fn test_debug_never_prints_secrets() -> Result<()> {
        let config = Config::parse(
            r#"
[provider]
host = "https://n8n.example.com"
api_key = "api-key-SECRET"

[[credential]]
name = "github"

[credential.basic_auth]
username = "octocat"
password = "hunter2-SECRET"

[[credential]]
name = "google"

[credential.oauth2]
client_id = "id"
client_secret = "client-SECRET"

[[credential]]
name = "token"

[credential.header_auth]
header_name = "X-Token"
header_value = "header-SECRET"
"#,
        )?;

        let rendered = format!("{config:?}");
        assert!(!rendered.contains("SECRET"), "secret leaked: {rendered}");
        assert!(rendered.contains("octocat"));
        assert!(rendered.contains("[REDACTED]"));
        Ok(())
    }

    #[test]
    fn test_blank_api_key_in_file_falls_back_to_env() -> Result<()> {
        let mut settings = ProviderSettings {
            host: Some("https://n8n.example.com".to_string()),
            api_key: Some(SecretString::from("   ")),
            insecure: None,
        };
        assert!(settings.client_config().is_err());

        settings.apply_env(env(&[(ENV_API_KEY, "from-env")]))?;
        let client = settings.client_config()?;
        assert_eq!(client.api_key.expose_secret(), "from-env");
        Ok(())
    }
}
