use anyhow::{anyhow, Context as _, Result};
use apprepo_manifest::DEFAULT_MANIFEST_NAME;
use jsonschema::validator_for;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const DEFAULT_APPS_NAMESPACE: &str = "app";
pub const DEFAULT_STATE_NAMESPACE: &str = "state";
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Environment variable naming a TOML config file.
pub const CONFIG_ENV: &str = "APPREPO_CONFIG";

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RegistryConfig {
    /// Store namespace holding installation records.
    #[serde(default = "default_apps_namespace")]
    pub apps_namespace: String,
    /// Store namespace holding per-application state blobs.
    #[serde(default = "default_state_namespace")]
    pub state_namespace: String,
    /// File name assumed under `base_url` when a fetched manifest does not
    /// declare `manifest_name`.
    #[serde(default = "default_manifest_name")]
    pub default_manifest_name: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            apps_namespace: default_apps_namespace(),
            state_namespace: default_state_namespace(),
            default_manifest_name: default_manifest_name(),
        }
    }
}

fn default_apps_namespace() -> String {
    DEFAULT_APPS_NAMESPACE.to_string()
}

fn default_state_namespace() -> String {
    DEFAULT_STATE_NAMESPACE.to_string()
}

fn default_manifest_name() -> String {
    DEFAULT_MANIFEST_NAME.to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct EventsConfig {
    /// Broadcast buffer per subscriber; slow subscribers lag past this.
    #[serde(default = "default_event_capacity")]
    pub capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            capacity: default_event_capacity(),
        }
    }
}

fn default_event_capacity() -> usize {
    DEFAULT_EVENT_CAPACITY
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub events: EventsConfig,
}

impl Config {
    /// Parse TOML, checking it against the generated JSON schema first so
    /// that every problem is reported at once rather than the first serde
    /// error only.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let raw: toml::Value = toml::from_str(content)?;
        let json_value = serde_json::to_value(&raw)?;
        let schema = config_schema_json()?;
        let validator =
            validator_for(&schema).map_err(|err| anyhow!("config schema is invalid: {err}"))?;
        let validation_errors: Vec<_> = validator
            .iter_errors(&json_value)
            .map(|e| e.to_string())
            .collect();
        if !validation_errors.is_empty() {
            return Err(anyhow!(validation_errors.join(", ")));
        }
        let cfg: Config = toml::from_str(content)?;
        Ok(cfg)
    }
}

/// Returns the JSON schema describing the configuration structure.
pub fn config_schema_json() -> Result<serde_json::Value> {
    let schema = schemars::schema_for!(Config);
    Ok(serde_json::to_value(&schema)?)
}

pub fn write_schema_file(path: &str) -> Result<()> {
    let schema_json = config_schema_json()?;
    std::fs::write(path, serde_json::to_string_pretty(&schema_json)?)
        .with_context(|| format!("failed to write schema to {path}"))
}

pub fn load_config(path: &str) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config at {path}"))?;
    Config::from_toml_str(&content).with_context(|| format!("invalid config {path}"))
}

/// Load the file named by `APPREPO_CONFIG`, or the defaults when it is unset
/// or blank.
pub fn resolve_config() -> Result<Config> {
    match std::env::var(CONFIG_ENV) {
        Ok(path) if !path.trim().is_empty() => load_config(path.trim()),
        _ => Ok(Config::default()),
    }
}
