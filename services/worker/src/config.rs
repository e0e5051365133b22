//! Worker configuration loading (§4.7, §6). Mirrors the dispatcher's
//! Raw/validated split. Default config path: `/etc/rusty-proxy/worker.toml`.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

const DEFAULT_GAME_SERVER_PORT: u16 = 2099;
const DEFAULT_LOCALE: &str = "en_US";
const DEFAULT_HEARTBEAT_INTERVAL_SECS: u64 = 120;
const DEFAULT_SUPERVISOR_INTERVAL_SECS: u64 = 60;
const DEFAULT_SUPERVISOR_MAX_FAILURES: u32 = 3;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub dispatcher_addr: String,
    pub game_server_host: String,
    pub game_server_port: u16,
    pub login_server_address: String,
    pub league_version: String,
    pub client_mac: String,
    pub locale: String,
    pub heartbeat_interval: Duration,
    pub supervisor_interval: Duration,
    pub supervisor_max_failures: u32,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    dispatcher_addr: Option<String>,
    game_server_host: Option<String>,
    game_server_port: Option<u16>,
    login_server_address: Option<String>,
    league_version: Option<String>,
    client_mac: Option<String>,
    locale: Option<String>,
    heartbeat_interval_secs: Option<u64>,
    supervisor_interval_secs: Option<u64>,
    supervisor_max_failures: Option<u32>,
}

pub fn load_config_from_path(path: &Path) -> Result<WorkerConfig, ConfigError> {
    let toml_str = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Io(format!("reading config file '{}': {}", path.display(), e)))?;
    load_config_from_str(&toml_str)
}

pub fn load_config() -> Result<WorkerConfig, ConfigError> {
    load_config_from_path(Path::new("/etc/rusty-proxy/worker.toml"))
}

pub fn load_config_from_str(toml_str: &str) -> Result<WorkerConfig, ConfigError> {
    let raw: RawConfig = toml::from_str(toml_str).map_err(|e| ConfigError::Parse(e.to_string()))?;

    let dispatcher_addr = raw
        .dispatcher_addr
        .ok_or_else(|| ConfigError::MissingField("dispatcher_addr".to_owned()))?;
    let game_server_host = raw
        .game_server_host
        .ok_or_else(|| ConfigError::MissingField("game_server_host".to_owned()))?;
    let login_server_address = raw
        .login_server_address
        .ok_or_else(|| ConfigError::MissingField("login_server_address".to_owned()))?;
    let league_version = raw
        .league_version
        .ok_or_else(|| ConfigError::MissingField("league_version".to_owned()))?;
    let client_mac = raw
        .client_mac
        .ok_or_else(|| ConfigError::MissingField("client_mac".to_owned()))?;

    Ok(WorkerConfig {
        dispatcher_addr,
        game_server_host,
        game_server_port: raw.game_server_port.unwrap_or(DEFAULT_GAME_SERVER_PORT),
        login_server_address,
        league_version,
        client_mac,
        locale: raw.locale.unwrap_or_else(|| DEFAULT_LOCALE.to_owned()),
        heartbeat_interval: Duration::from_secs(
            raw.heartbeat_interval_secs.unwrap_or(DEFAULT_HEARTBEAT_INTERVAL_SECS),
        ),
        supervisor_interval: Duration::from_secs(
            raw.supervisor_interval_secs.unwrap_or(DEFAULT_SUPERVISOR_INTERVAL_SECS),
        ),
        supervisor_max_failures: raw
            .supervisor_max_failures
            .unwrap_or(DEFAULT_SUPERVISOR_MAX_FAILURES),
    })
}

#[derive(Debug)]
pub enum ConfigError {
    Io(String),
    Parse(String),
    MissingField(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(s) => write!(f, "IO error: {}", s),
            ConfigError::Parse(s) => write!(f, "Parse error: {}", s),
            ConfigError::MissingField(s) => write!(f, "Missing required field: {}", s),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_toml() -> &'static str {
        r#"
        dispatcher_addr = "127.0.0.1:1331"
        game_server_host = "prod.na.lol.riotgames.com"
        login_server_address = "https://login.na.lol.riotgames.com"
        league_version = "0.1.2.3"
        client_mac = "00:11:22:33:44:55"
        "#
    }

    #[test]
    fn defaults_fill_in_unset_fields() {
        let cfg = load_config_from_str(minimal_toml()).unwrap();
        assert_eq!(cfg.game_server_port, 2099);
        assert_eq!(cfg.locale, "en_US");
        assert_eq!(cfg.heartbeat_interval, Duration::from_secs(120));
        assert_eq!(cfg.supervisor_interval, Duration::from_secs(60));
        assert_eq!(cfg.supervisor_max_failures, 3);
    }

    #[test]
    fn missing_dispatcher_addr_is_an_error() {
        assert!(load_config_from_str("game_server_host = \"x\"").is_err());
    }
}
