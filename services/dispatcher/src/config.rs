//! Dispatcher configuration loading.
//!
//! TOML is the sole config source, mirroring the forwarder's Raw/validated
//! split (`services/forwarder/src/config.rs`). Default config path:
//! `/etc/rusty-proxy/dispatcher.toml`.
//!
//! # Required fields
//! - At least one `[[credentials]]` entry (the Credential Pool, §3).

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Default per-task deadline if `task_deadline_ms` is unset (§3: "default
/// 1500 ms after creation").
const DEFAULT_TASK_DEADLINE_MS: u64 = 1500;

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub api_bind: String,
    pub worker_bind: String,
    pub task_deadline: Duration,
    pub credentials: Vec<(String, String)>,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    api_bind: Option<String>,
    worker_bind: Option<String>,
    task_deadline_ms: Option<u64>,
    credentials: Option<Vec<RawCredential>>,
}

#[derive(Debug, Deserialize)]
struct RawCredential {
    username: String,
    password: String,
}

/// Load dispatcher config from a custom path.
pub fn load_config_from_path(path: &Path) -> Result<DispatcherConfig, ConfigError> {
    let toml_str = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Io(format!("reading config file '{}': {}", path.display(), e)))?;
    load_config_from_str(&toml_str)
}

/// Load dispatcher config from the default path `/etc/rusty-proxy/dispatcher.toml`.
pub fn load_config() -> Result<DispatcherConfig, ConfigError> {
    load_config_from_path(Path::new("/etc/rusty-proxy/dispatcher.toml"))
}

/// Load dispatcher config from a TOML string.
pub fn load_config_from_str(toml_str: &str) -> Result<DispatcherConfig, ConfigError> {
    let raw: RawConfig = toml::from_str(toml_str).map_err(|e| ConfigError::Parse(e.to_string()))?;

    let raw_credentials = raw
        .credentials
        .ok_or_else(|| ConfigError::MissingField("credentials".to_owned()))?;
    if raw_credentials.is_empty() {
        return Err(ConfigError::InvalidValue(
            "at least one [[credentials]] entry is required".to_owned(),
        ));
    }
    let credentials = raw_credentials
        .into_iter()
        .map(|c| (c.username, c.password))
        .collect();

    Ok(DispatcherConfig {
        api_bind: raw.api_bind.unwrap_or_else(|| "0.0.0.0:9876".to_owned()),
        worker_bind: raw.worker_bind.unwrap_or_else(|| "0.0.0.0:1331".to_owned()),
        task_deadline: Duration::from_millis(raw.task_deadline_ms.unwrap_or(DEFAULT_TASK_DEADLINE_MS)),
        credentials,
    })
}

#[derive(Debug)]
pub enum ConfigError {
    Io(String),
    Parse(String),
    MissingField(String),
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(s) => write!(f, "IO error: {}", s),
            ConfigError::Parse(s) => write!(f, "Parse error: {}", s),
            ConfigError::MissingField(s) => write!(f, "Missing required field: {}", s),
            ConfigError::InvalidValue(s) => write!(f, "Invalid config value: {}", s),
        }
    }
}

impl std::error::Error for ConfigError {}
