use thiserror::Error;
use tokio_util::codec::LinesCodecError;

/// Top-level error type for the `casparlink-api` crate.
///
/// Covers every failure mode of the device link: connection setup,
/// socket I/O, and reply framing. `casparlink-core` maps these into
/// session-level errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Connection ──────────────────────────────────────────────────
    /// TCP connect failed (refused, unreachable, DNS failure, etc.)
    #[error("Cannot connect to device at {addr}: {reason}")]
    Connect { addr: String, reason: String },

    /// Connect (or handshake) did not complete in time.
    #[error("Device connection timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Transport ───────────────────────────────────────────────────
    /// Socket read/write error.
    #[error("Device I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The device closed the connection in the middle of a reply.
    #[error("Device closed the connection")]
    Closed,

    // ── Framing ─────────────────────────────────────────────────────
    /// A reply line that does not start with a three-digit status code.
    #[error("Malformed reply from device: {line:?}")]
    MalformedReply { line: String },

    /// A command that cannot be framed as a single line.
    #[error("Invalid command: {reason}")]
    InvalidCommand { reason: String },
}

impl From<LinesCodecError> for Error {
    fn from(err: LinesCodecError) -> Self {
        match err {
            LinesCodecError::Io(e) => Self::Io(e),
            LinesCodecError::MaxLineLengthExceeded => Self::MalformedReply {
                line: "<line exceeds maximum length>".into(),
            },
        }
    }
}
