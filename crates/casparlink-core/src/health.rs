use serde::Serialize;

use crate::session::SessionState;

/// Point-in-time service health.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    /// Always `"ok"` while the process is serving; device trouble shows up
    /// in the other fields, not here.
    pub status: &'static str,
    pub device_connected: bool,
    /// Where the session connects, e.g. `"localhost:5250"`.
    pub device: String,
    pub session: SessionState,
    pub subscribers: usize,
    pub pending_commands: usize,
}
