//! Core configuration types and loading.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Client configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Where to connect and who to be.
    pub server: ServerConfig,
    /// Services and channel policy.
    #[serde(default)]
    pub services: ServicesConfig,
    /// Scheduler timing.
    #[serde(default)]
    pub timeouts: TimeoutsConfig,
    /// Optional Prometheus endpoint.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

/// Connection and identity.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// `host:port` of the IRC server.
    pub address: String,
    /// Nickname to register with.
    pub nick: String,
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default = "default_realname")]
    pub realname: String,
    /// Server password (PASS), if the network needs one.
    pub password: Option<String>,
    /// Channels to join after registration. The first one is the default
    /// channel for commands typed without an explicit channel.
    #[serde(default)]
    pub channels: Vec<String>,
}

fn default_username() -> String {
    "chanmod".to_string()
}

fn default_realname() -> String {
    "chanmod moderation helper".to_string()
}

/// How kicks are sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum KickCommand {
    /// `REMOVE`: a forced part; clients do not auto-rejoin.
    #[default]
    Remove,
    /// Plain `KICK`.
    Kick,
}

/// Services and channel policy.
#[derive(Debug, Clone, Deserialize)]
pub struct ServicesConfig {
    /// Nick of the channel service that grants operator status.
    #[serde(default = "default_chanserv")]
    pub chanserv: String,
    /// Host substring marking shared web gateways (e.g. `gateway/`).
    #[serde(default = "default_gateway_marker")]
    pub gateway_marker: String,
    #[serde(default)]
    pub kick_command: KickCommand,
    /// Kick reason when none is given.
    #[serde(default = "default_reason")]
    pub default_reason: String,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            chanserv: default_chanserv(),
            gateway_marker: default_gateway_marker(),
            kick_command: KickCommand::default(),
            default_reason: default_reason(),
        }
    }
}

fn default_chanserv() -> String {
    "ChanServ".to_string()
}

fn default_gateway_marker() -> String {
    "gateway/".to_string()
}

fn default_reason() -> String {
    "Goodbye".to_string()
}

/// Scheduler timing.
///
/// - `action_secs`: how long a queued action may wait for its preconditions (default: 10)
/// - `identity_ttl_secs`: how long a WHOIS result is trusted (default: 10)
/// - `tick_millis`: period of the housekeeping tick that fires reversals (default: 1000)
#[derive(Debug, Clone, Deserialize)]
pub struct TimeoutsConfig {
    #[serde(default = "default_action_secs")]
    pub action_secs: u64,
    #[serde(default = "default_identity_ttl_secs")]
    pub identity_ttl_secs: u64,
    #[serde(default = "default_tick_millis")]
    pub tick_millis: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            action_secs: default_action_secs(),
            identity_ttl_secs: default_identity_ttl_secs(),
            tick_millis: default_tick_millis(),
        }
    }
}

impl TimeoutsConfig {
    pub fn action(&self) -> Duration {
        Duration::from_secs(self.action_secs)
    }

    pub fn identity_ttl(&self) -> Duration {
        Duration::from_secs(self.identity_ttl_secs)
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_millis)
    }
}

fn default_action_secs() -> u64 {
    10
}

fn default_identity_ttl_secs() -> u64 {
    10
}

fn default_tick_millis() -> u64 {
    1000
}

/// Prometheus endpoint.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct MetricsConfig {
    /// Serve `/metrics` on this port when set.
    pub port: Option<u16>,
}
