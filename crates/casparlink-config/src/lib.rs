//! Configuration for the casparlink server.
//!
//! One TOML file plus `CASPARLINK_*` environment overrides, layered over
//! built-in defaults, and translated into a `casparlink_core::ManagerConfig`.
//! The routing config (named inputs and outputs) lives elsewhere, in the
//! JSON store this file points at.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use casparlink_api::ReconnectConfig;
use casparlink_api::connector::DEFAULT_AMCP_PORT;
use casparlink_core::stream::MAX_SUBSCRIBER_BUFFER;
use casparlink_core::{DeviceEndpoint, ManagerConfig, SessionConfig};
use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Prefix for environment overrides. Nested keys use `__`, e.g.
/// `CASPARLINK_DEVICE__HOST`.
pub const ENV_PREFIX: &str = "CASPARLINK_";

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

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub device: DeviceSection,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub store: StoreSection,

    #[serde(default)]
    pub events: EventsSection,
}

/// Where the playout server is and how the session treats it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DeviceSection {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// How long one command may wait for its reply.
    #[serde(default = "default_ack_timeout")]
    pub ack_timeout_secs: u64,

    /// Send `VERSION` after connecting and require a `2xx` reply.
    #[serde(default = "default_true")]
    pub handshake: bool,

    /// Drop the link when a command times out.
    #[serde(default = "default_true")]
    pub reset_on_ack_timeout: bool,

    #[serde(default = "default_reconnect_initial")]
    pub reconnect_initial_ms: u64,

    #[serde(default = "default_reconnect_max")]
    pub reconnect_max_secs: u64,

    /// Retries after a failed connect. Unset means retry forever.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconnect_max_retries: Option<u32>,
}

impl Default for DeviceSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            connect_timeout_secs: default_connect_timeout(),
            ack_timeout_secs: default_ack_timeout(),
            handshake: true,
            reset_on_ack_timeout: true,
            reconnect_initial_ms: default_reconnect_initial(),
            reconnect_max_secs: default_reconnect_max(),
            reconnect_max_retries: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServerSection {
    /// `host:port` for the HTTP listener.
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct StoreSection {
    /// Routing config file. Defaults to [`default_store_path()`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EventsSection {
    /// Events a subscriber may fall behind before losing the oldest. A
    /// power of two, at most 65536.
    #[serde(default = "default_subscriber_buffer")]
    pub subscriber_buffer: usize,
}

impl Default for EventsSection {
    fn default() -> Self {
        Self {
            subscriber_buffer: default_subscriber_buffer(),
        }
    }
}

fn default_host() -> String {
    "localhost".into()
}
fn default_port() -> u16 {
    DEFAULT_AMCP_PORT
}
fn default_connect_timeout() -> u64 {
    5
}
fn default_ack_timeout() -> u64 {
    5
}
fn default_true() -> bool {
    true
}
fn default_reconnect_initial() -> u64 {
    1000
}
fn default_reconnect_max() -> u64 {
    30
}
fn default_bind() -> String {
    "0.0.0.0:3000".into()
}
fn default_subscriber_buffer() -> usize {
    casparlink_core::stream::DEFAULT_SUBSCRIBER_BUFFER
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "casparlink", "casparlink")
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback(".config").join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Where the routing config is kept unless `store.path` says otherwise.
pub fn default_store_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback(".local/share").join("routing.json"),
        |dirs| dirs.data_dir().join("routing.json"),
    )
}

fn dirs_fallback(base: &str) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(base);
    p.push("casparlink");
    p
}

// ── Loading and saving ──────────────────────────────────────────────

/// Build the layered provider: defaults, then the TOML file, then the
/// environment. `CASPAR_HOST` is honored as a shorthand for the device host.
pub fn figment(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(
            Env::raw()
                .only(&["CASPAR_HOST"])
                .map(|_| "device.host".into()),
        )
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
}

/// Load the config from `path` (or [`config_path()`]) plus environment.
/// A missing file is not an error.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.map_or_else(config_path, Path::to_path_buf);
    let config: Config = figment(&path).extract()?;
    Ok(config)
}

/// Serialize `cfg` to TOML at `path` (or [`config_path()`]). Returns the
/// path written.
pub fn save_config(cfg: &Config, path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    let path = path.map_or_else(config_path, Path::to_path_buf);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(&path, toml_str)?;
    Ok(path)
}

// ── Translation ─────────────────────────────────────────────────────

impl Config {
    /// Validate and build the runtime config for a `Manager`.
    pub fn to_manager_config(&self) -> Result<ManagerConfig, ConfigError> {
        let device = &self.device;
        if device.host.trim().is_empty() {
            return Err(invalid("device.host", "must not be empty"));
        }
        if device.port == 0 {
            return Err(invalid("device.port", "must be between 1 and 65535"));
        }
        if device.ack_timeout_secs == 0 {
            return Err(invalid("device.ack_timeout_secs", "must be at least 1"));
        }
        if device.connect_timeout_secs == 0 {
            return Err(invalid("device.connect_timeout_secs", "must be at least 1"));
        }
        let buffer = self.events.subscriber_buffer;
        if buffer == 0 || buffer > MAX_SUBSCRIBER_BUFFER {
            return Err(invalid(
                "events.subscriber_buffer",
                format!("must be between 1 and {MAX_SUBSCRIBER_BUFFER}"),
            ));
        }
        if !buffer.is_power_of_two() {
            return Err(invalid(
                "events.subscriber_buffer",
                format!("must be a power of two, e.g. {}", buffer.next_power_of_two()),
            ));
        }

        Ok(ManagerConfig {
            device: DeviceEndpoint {
                host: device.host.trim().to_owned(),
                port: device.port,
                connect_timeout: Duration::from_secs(device.connect_timeout_secs),
            },
            session: SessionConfig {
                ack_timeout: Duration::from_secs(device.ack_timeout_secs),
                reconnect: ReconnectConfig {
                    initial_delay: Duration::from_millis(device.reconnect_initial_ms),
                    max_delay: Duration::from_secs(device.reconnect_max_secs),
                    max_retries: device.reconnect_max_retries,
                },
                handshake: device.handshake,
                reset_on_ack_timeout: device.reset_on_ack_timeout,
            },
            subscriber_buffer: self.events.subscriber_buffer,
        })
    }

    /// The HTTP listen address.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.server
            .bind
            .parse()
            .map_err(|e| invalid("server.bind", format!("'{}': {e}", self.server.bind)))
    }

    pub fn store_path(&self) -> PathBuf {
        self.store.path.clone().unwrap_or_else(default_store_path)
    }
}
