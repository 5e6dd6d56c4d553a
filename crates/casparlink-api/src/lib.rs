// casparlink-api: byte-level plumbing between casparlink-core and a playout server.
//
// Everything above "open a link, write a command line, read a reply" lives
// in casparlink-core. This crate never interprets reply payloads.

pub mod connector;
pub mod error;
pub mod protocol;
pub mod reconnect;

pub use connector::{Connector, DeviceIo, DeviceLink, TcpConnector};
pub use error::Error;
pub use protocol::{CommandWriter, Reply, ReplyReader};
pub use reconnect::{ReconnectConfig, calculate_backoff};
