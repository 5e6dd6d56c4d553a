// ── Core error types ──
//
// Every command and config operation resolves to success or one of these.
// Transport failures from casparlink-api are folded in via `From`; callers
// never see raw socket errors.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoreError {
    // ── Session errors ───────────────────────────────────────────────
    #[error("Device is not connected")]
    NotConnected,

    #[error("Device connection lost before the command was acknowledged")]
    ConnectionLost,

    #[error("Command #{seq} was not acknowledged within {timeout_ms}ms")]
    AckTimeout { seq: u64, timeout_ms: u64 },

    #[error("Cannot connect to device at {addr}: {reason}")]
    ConnectionFailed { addr: String, reason: String },

    // ── Routing errors ───────────────────────────────────────────────
    #[error("Unknown input: {id}")]
    UnknownInput { id: String },

    // ── Config errors ────────────────────────────────────────────────
    #[error("{entity_type} already exists: {id}")]
    AlreadyExists { entity_type: String, id: String },

    #[error("{entity_type} not found: {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Config store error: {message}")]
    Storage { message: String },

    // ── Device errors ────────────────────────────────────────────────
    #[error("Device rejected command ({code}): {message}")]
    DeviceRejected { code: u16, message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    pub(crate) fn storage(err: impl std::fmt::Display) -> Self {
        Self::Storage {
            message: err.to_string(),
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<casparlink_api::Error> for CoreError {
    fn from(err: casparlink_api::Error) -> Self {
        match err {
            casparlink_api::Error::Connect { addr, reason } => {
                CoreError::ConnectionFailed { addr, reason }
            }
            casparlink_api::Error::Timeout { timeout_secs } => CoreError::ConnectionFailed {
                addr: String::new(),
                reason: format!("timed out after {timeout_secs}s"),
            },
            casparlink_api::Error::Io(_) | casparlink_api::Error::Closed => {
                CoreError::ConnectionLost
            }
            casparlink_api::Error::InvalidCommand { reason } => {
                CoreError::InvalidRequest { message: reason }
            }
            casparlink_api::Error::MalformedReply { line } => {
                CoreError::Internal(format!("malformed device reply: {line:?}"))
            }
        }
    }
}
