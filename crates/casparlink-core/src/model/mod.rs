// ── Domain model ──
//
// Value types shared by the session, dispatcher, config service and the
// HTTP surface. Everything here is plain data; behaviour lives elsewhere.

pub mod address;
pub mod config;
pub mod event;

// ── Re-exports ──────────────────────────────────────────────────────

pub use address::ChannelLayerAddress;
pub use config::{ConfigSnapshot, InputRecord, InputUpdate, OutputRecord, OutputUpdate};
pub use event::{Event, EventKind};
