//! Configuration for the flowdeck CLI and other engine consumers.
//!
//! TOML file + environment merge, and translation into the engine's
//! [`ConnectionConfig`] and [`FlowLimits`]. The engine itself never
//! reads config files -- this crate is the only place that does.
//!
//! Environment overrides use the `FLOWDECK_` prefix with `__` as the
//! section separator (`FLOWDECK_CONNECTION__URL`,
//! `FLOWDECK_FLOWS__MAX_NODES`, ...). `REDIS_URL`, the variable queue
//! deployments already export, overrides the connection target last.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use flowdeck_core::{ConnectionConfig, FlowLimits, ProviderKind};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    /// Backend connection target.
    #[serde(default)]
    pub connection: ConnectionSettings,

    /// Flow traversal bounds.
    #[serde(default)]
    pub flows: FlowSettings,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ConnectionSettings {
    /// Connection URL (e.g. "redis://localhost:6379").
    #[serde(default = "default_url")]
    pub url: String,

    /// Backend technology: "bullmq".
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Deadline for each backend round trip, in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            url: default_url(),
            provider: default_provider(),
            timeout_secs: default_timeout(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct FlowSettings {
    /// Maximum nodes resolved per flow build, root included.
    #[serde(default = "default_max_nodes")]
    pub max_nodes: usize,

    /// Maximum levels beneath a flow root.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Flow roots considered per queue when listing.
    #[serde(default = "default_list_limit")]
    pub list_limit: usize,
}

impl Default for FlowSettings {
    fn default() -> Self {
        Self {
            max_nodes: default_max_nodes(),
            max_depth: default_max_depth(),
            list_limit: default_list_limit(),
        }
    }
}

fn default_url() -> String {
    "redis://localhost:6379".into()
}
fn default_provider() -> String {
    "bullmq".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_max_nodes() -> usize {
    5_000
}
fn default_max_depth() -> usize {
    64
}
fn default_list_limit() -> usize {
    50
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "flowdeck", "flowdeck").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("flowdeck");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full [`Config`] from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    let mut config = load_config_from(&config_path())?;

    // Queue deployments usually already export REDIS_URL; honor it as
    // the strongest override for the connection target.
    if let Ok(url) = std::env::var("REDIS_URL") {
        config.connection.url = url;
    }
    Ok(config)
}

/// Load configuration from an explicit file path + environment.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("FLOWDECK_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning defaults if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

/// Serialize config to TOML at an explicit path.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation to engine types ─────────────────────────────────────

impl ConnectionSettings {
    /// Validate and translate into the engine's [`ConnectionConfig`].
    pub fn to_connection_config(&self) -> Result<ConnectionConfig, ConfigError> {
        let url: url::Url = self.url.parse().map_err(|_| ConfigError::Validation {
            field: "connection.url".into(),
            reason: format!("invalid URL: {}", self.url),
        })?;

        let kind: ProviderKind = self.provider.parse().map_err(|_| ConfigError::Validation {
            field: "connection.provider".into(),
            reason: format!("unknown provider '{}' (expected: bullmq)", self.provider),
        })?;

        Ok(ConnectionConfig {
            url,
            kind,
            timeout: Duration::from_secs(self.timeout_secs),
        })
    }
}

impl FlowSettings {
    pub fn to_flow_limits(&self) -> FlowLimits {
        FlowLimits {
            max_nodes: self.max_nodes,
            max_depth: self.max_depth,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_translate_to_engine_types() {
        let config = Config::default();

        let conn = config.connection.to_connection_config().unwrap();
        assert_eq!(conn.url.as_str(), "redis://localhost:6379");
        assert_eq!(conn.kind, ProviderKind::BullMq);
        assert_eq!(conn.timeout, Duration::from_secs(30));

        let limits = config.flows.to_flow_limits();
        assert_eq!(limits.max_nodes, 5_000);
        assert_eq!(limits.max_depth, 64);
    }

    #[test]
    fn invalid_url_is_a_validation_error() {
        let settings = ConnectionSettings {
            url: "not a url".into(),
            ..ConnectionSettings::default()
        };
        let err = settings.to_connection_config().unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "connection.url"));
    }

    #[test]
    fn unknown_provider_is_a_validation_error() {
        let settings = ConnectionSettings {
            provider: "rabbitmq".into(),
            ..ConnectionSettings::default()
        };
        let err = settings.to_connection_config().unwrap_err();
        assert!(
            matches!(err, ConfigError::Validation { ref field, .. } if field == "connection.provider")
        );
    }

    #[test]
    fn toml_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.connection.url = "redis://queue.internal:6380/2".into();
        config.flows.max_depth = 16;
        save_config_to(&config, &path).unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.connection.url, "redis://queue.internal:6380/2");
        assert_eq!(loaded.flows.max_depth, 16);
        assert_eq!(loaded.flows.max_nodes, 5_000);
    }
}
