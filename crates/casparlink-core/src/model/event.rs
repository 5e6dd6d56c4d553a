// ── Broadcast events ──
//
// Everything subscribers see: link lifecycle, per-command outcomes and
// config changes. Serialized with a `type` tag so push clients can switch
// on it directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::address::ChannelLayerAddress;
use crate::command::{CommandKind, CommandParams};

/// A timestamped event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl Event {
    /// Stamp `kind` with the current time.
    pub fn new(kind: EventKind) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
        }
    }

    /// Stable snake_case name, e.g. `"command_acked"`.
    pub fn name(&self) -> &'static str {
        (&self.kind).into()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, strum::IntoStaticStr)]
#[serde(tag = "type", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EventKind {
    // ── Session ──────────────────────────────────────────────────────
    Connected {
        peer: String,
    },
    Disconnected {
        reason: String,
    },

    // ── Commands ─────────────────────────────────────────────────────
    /// Carries the intent's own fields (locator and its flags, or the
    /// routed input id) so clients can tell what was played.
    CommandIssued {
        command_id: Uuid,
        address: ChannelLayerAddress,
        command: CommandKind,
        params: CommandParams,
    },
    CommandAcked {
        command_id: Uuid,
        address: ChannelLayerAddress,
        command: CommandKind,
        code: u16,
        message: String,
    },
    CommandFailed {
        command_id: Uuid,
        address: ChannelLayerAddress,
        command: CommandKind,
        error: String,
    },

    // ── Config ───────────────────────────────────────────────────────
    InputAdded {
        id: String,
    },
    InputUpdated {
        id: String,
    },
    InputDeleted {
        id: String,
    },
    OutputAdded {
        id: String,
    },
    OutputUpdated {
        id: String,
    },
    OutputDeleted {
        id: String,
    },
}

impl EventKind {
    /// Command id for command-outcome events.
    pub fn command_id(&self) -> Option<Uuid> {
        match self {
            Self::CommandIssued { command_id, .. }
            | Self::CommandAcked { command_id, .. }
            | Self::CommandFailed { command_id, .. } => Some(*command_id),
            _ => None,
        }
    }
}
