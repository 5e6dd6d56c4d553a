// Link establishment.
//
// A `Connector` knows how to reach one device and hands back a fresh
// `DeviceLink` per attempt. The session layer owns retry policy; a
// connector makes exactly one attempt per call.

use std::time::Duration;

use futures_util::future::BoxFuture;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use crate::error::Error;
use crate::protocol::{CommandWriter, ReplyReader};

/// Default AMCP control port.
pub const DEFAULT_AMCP_PORT: u16 = 5250;

/// Any duplex byte stream usable as a device link.
pub trait DeviceIo: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> DeviceIo for T {}

/// An established, not-yet-split connection to a device.
pub struct DeviceLink {
    io: Box<dyn DeviceIo>,
    peer: String,
}

impl DeviceLink {
    pub fn new(io: impl DeviceIo + 'static, peer: impl Into<String>) -> Self {
        Self {
            io: Box::new(io),
            peer: peer.into(),
        }
    }

    /// Human-readable peer description, e.g. `"10.0.0.5:5250"`.
    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Split into independently owned write and read halves.
    pub fn split(self) -> (CommandWriter, ReplyReader) {
        let (read, write) = tokio::io::split(self.io);
        (CommandWriter::new(write), ReplyReader::new(read))
    }
}

impl std::fmt::Debug for DeviceLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceLink").field("peer", &self.peer).finish_non_exhaustive()
    }
}

/// Opens links to a single device.
pub trait Connector: Send + Sync + 'static {
    /// Make one connection attempt.
    fn connect(&self) -> BoxFuture<'_, Result<DeviceLink, Error>>;

    /// Where this connector points, for logs and health output.
    fn describe(&self) -> String;
}

/// Plain TCP connector for AMCP servers.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    host: String,
    port: u16,
    connect_timeout: Duration,
}

impl TcpConnector {
    pub fn new(host: impl Into<String>, port: u16, connect_timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            connect_timeout,
        }
    }

    fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Connector for TcpConnector {
    fn connect(&self) -> BoxFuture<'_, Result<DeviceLink, Error>> {
        Box::pin(async move {
            let addr = self.addr();
            tracing::debug!(%addr, "opening device connection");

            let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(&addr))
                .await
                .map_err(|_| Error::Timeout {
                    timeout_secs: self.connect_timeout.as_secs(),
                })?
                .map_err(|e| Error::Connect {
                    addr: addr.clone(),
                    reason: e.to_string(),
                })?;

            // Commands are tiny and latency-sensitive.
            stream.set_nodelay(true)?;

            Ok(DeviceLink::new(stream, addr))
        })
    }

    fn describe(&self) -> String {
        self.addr()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn tcp_connector_round_trips_a_command() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let device = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let (read, mut write) = socket.into_split();
            let mut lines = BufReader::new(read).lines();
            let line = lines.next_line().await.unwrap().unwrap();
            write.write_all(b"202 PLAY OK\r\n").await.unwrap();
            line
        });

        let connector = TcpConnector::new("127.0.0.1", port, Duration::from_secs(2));
        assert_eq!(connector.describe(), format!("127.0.0.1:{port}"));

        let link = connector.connect().await.unwrap();
        let (mut writer, mut reader) = link.split();
        writer.send("PLAY 1-10 \"CLIP1\"").await.unwrap();
        let reply = reader.next_reply().await.unwrap().unwrap();

        assert_eq!(reply.code, 202);
        assert_eq!(device.await.unwrap(), "PLAY 1-10 \"CLIP1\"");
    }

    #[tokio::test]
    async fn tcp_connector_reports_refused_connection() {
        // Bind then drop to get a port nobody listens on.
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };

        let connector = TcpConnector::new("127.0.0.1", port, Duration::from_secs(2));
        let err = connector.connect().await.unwrap_err();
        assert!(matches!(err, Error::Connect { .. }), "unexpected error: {err}");
    }
}
