// ── Runtime configuration ──
//
// Describes *where* the device is and *how* the session behaves. Built by
// the binary from its config file; this crate never reads config files.

use std::time::Duration;

use casparlink_api::connector::DEFAULT_AMCP_PORT;

use crate::session::SessionConfig;
use crate::stream::DEFAULT_SUBSCRIBER_BUFFER;

/// Network location of the playout server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEndpoint {
    pub host: String,
    pub port: u16,
    pub connect_timeout: Duration,
}

impl Default for DeviceEndpoint {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: DEFAULT_AMCP_PORT,
            connect_timeout: Duration::from_secs(5),
        }
    }
}

/// Everything a [`Manager`](crate::Manager) needs besides its store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerConfig {
    pub device: DeviceEndpoint,
    pub session: SessionConfig,
    /// Events each subscriber may lag behind before losing the oldest.
    pub subscriber_buffer: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            device: DeviceEndpoint::default(),
            session: SessionConfig::default(),
            subscriber_buffer: DEFAULT_SUBSCRIBER_BUFFER,
        }
    }
}
