//! Control layer between `casparlink-api` and the outer surfaces (HTTP, CLI).
//!
//! - **[`Manager`]**: facade owning one device session plus everything that
//!   feeds it. Built at startup, [`start()`](Manager::start)ed, and
//!   [`shutdown()`](Manager::shutdown) on exit.
//!
//! - **[`DeviceSession`]**: the single connection to the playout server.
//!   Reconnects with backoff, allows one write at a time, and matches each
//!   reply to the oldest unacknowledged command.
//!
//! - **[`Dispatcher`]**: validates [`Command`]s, resolves named inputs, and
//!   runs commands FIFO per channel-layer.
//!
//! - **[`EventBroadcaster`]**: fan-out of [`Event`]s with a bounded,
//!   drop-oldest buffer per subscriber.
//!
//! - **[`ConfigStore`]** / [`ConfigService`]: named inputs and outputs, with
//!   change events published after each durable write.

pub mod command;
pub mod config;
pub mod config_service;
pub mod dispatcher;
pub mod error;
pub mod health;
pub mod manager;
pub mod model;
pub mod routing;
pub mod session;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::{Command, CommandKind, CommandParams, DeviceCommand};
pub use config::{DeviceEndpoint, ManagerConfig};
pub use config_service::ConfigService;
pub use dispatcher::{Ack, Dispatcher};
pub use error::CoreError;
pub use health::HealthReport;
pub use manager::Manager;
pub use routing::{RouteExpression, RoutingResolver};
pub use session::{DeviceSession, Receipt, SessionConfig, SessionState};
pub use store::{ConfigStore, JsonFileStore, MemoryStore};
pub use stream::{EventBroadcaster, Subscription};

pub use model::{
    ChannelLayerAddress, ConfigSnapshot, Event, EventKind, InputRecord, InputUpdate,
    OutputRecord, OutputUpdate,
};
