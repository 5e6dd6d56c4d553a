// Shared fixtures: an in-process device reachable through a `Connector`.

#![allow(dead_code, clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use casparlink_api::{Connector, DeviceLink, Error, ReconnectConfig};
use casparlink_core::{Event, SessionConfig, SessionState, Subscription};
use futures_util::future::BoxFuture;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines, ReadHalf, WriteHalf};
use tokio::sync::{mpsc, watch};

pub const PEER: &str = "fake:5250";
const WAIT: Duration = Duration::from_secs(2);

/// Hands the device end of every new link to the test.
pub struct FakeConnector {
    links: mpsc::UnboundedSender<DuplexStream>,
    refuse: AtomicBool,
    hang_up: AtomicBool,
    attempts: AtomicU32,
}

impl FakeConnector {
    pub fn new() -> (Arc<Self>, DeviceLinks) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connector = Arc::new(Self {
            links: tx,
            refuse: AtomicBool::new(false),
            hang_up: AtomicBool::new(false),
            attempts: AtomicU32::new(0),
        });
        (connector, DeviceLinks(rx))
    }

    /// Make every following connect attempt fail (or succeed again).
    pub fn set_refuse(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    /// Accept every following link and close the device end at once.
    pub fn set_hang_up(&self, hang_up: bool) {
        self.hang_up.store(hang_up, Ordering::SeqCst);
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Connector for FakeConnector {
    fn connect(&self) -> BoxFuture<'_, Result<DeviceLink, Error>> {
        Box::pin(async move {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.refuse.load(Ordering::SeqCst) {
                return Err(Error::Connect {
                    addr: PEER.into(),
                    reason: "connection refused".into(),
                });
            }
            let (client, device) = tokio::io::duplex(64 * 1024);
            if self.hang_up.load(Ordering::SeqCst) {
                drop(device);
            } else {
                let _ = self.links.send(device);
            }
            Ok(DeviceLink::new(client, PEER))
        })
    }

    fn describe(&self) -> String {
        PEER.into()
    }
}

/// Receiving side for device ends created by [`FakeConnector`].
pub struct DeviceLinks(mpsc::UnboundedReceiver<DuplexStream>);

impl DeviceLinks {
    /// Wait for the next link the session opens.
    pub async fn accept(&mut self) -> FakeDevice {
        let stream = tokio::time::timeout(WAIT, self.0.recv())
            .await
            .expect("session did not open a link")
            .expect("connector dropped");
        FakeDevice::new(stream)
    }
}

/// The device side of one link.
pub struct FakeDevice {
    lines: Lines<BufReader<ReadHalf<DuplexStream>>>,
    writer: WriteHalf<DuplexStream>,
}

impl FakeDevice {
    fn new(stream: DuplexStream) -> Self {
        let (read, writer) = tokio::io::split(stream);
        Self {
            lines: BufReader::new(read).lines(),
            writer,
        }
    }

    /// Next command line the session wrote.
    pub async fn command(&mut self) -> String {
        tokio::time::timeout(WAIT, self.lines.next_line())
            .await
            .expect("no command arrived")
            .unwrap()
            .expect("link closed")
    }

    /// Assert nothing is written for `window`.
    pub async fn expect_silence(&mut self, window: Duration) {
        if let Ok(line) = tokio::time::timeout(window, self.lines.next_line()).await {
            panic!("unexpected traffic: {line:?}");
        }
    }

    /// Write raw reply text; `\r\n` is appended.
    pub async fn reply(&mut self, text: &str) {
        self.writer
            .write_all(format!("{text}\r\n").as_bytes())
            .await
            .unwrap();
    }

    /// Read one command and acknowledge it with `202 <verb> OK`.
    pub async fn ack_next(&mut self) -> String {
        let line = self.command().await;
        let verb = line.split_whitespace().next().unwrap_or_default().to_owned();
        self.reply(&format!("202 {verb} OK")).await;
        line
    }
}

/// Fast settings for tests: short timeouts, quick reconnects, no handshake.
pub fn session_config() -> SessionConfig {
    SessionConfig {
        ack_timeout: Duration::from_millis(500),
        reconnect: ReconnectConfig {
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(50),
            max_retries: None,
        },
        handshake: false,
        reset_on_ack_timeout: true,
    }
}

pub async fn wait_for_state(
    rx: &mut watch::Receiver<SessionState>,
    want: impl FnMut(&SessionState) -> bool,
) {
    tokio::time::timeout(WAIT, rx.wait_for(want))
        .await
        .expect("state not reached")
        .unwrap();
}

pub async fn wait_connected(rx: &mut watch::Receiver<SessionState>) {
    wait_for_state(rx, |s| matches!(s, SessionState::Connected { .. })).await;
}

pub async fn next_event(sub: &mut Subscription) -> Event {
    tokio::time::timeout(WAIT, sub.recv())
        .await
        .expect("no event arrived")
        .expect("event stream closed")
}

/// Skip events until one named `name` arrives.
pub async fn event_named(sub: &mut Subscription, name: &str) -> Event {
    loop {
        let event = next_event(sub).await;
        if event.name() == name {
            return event;
        }
    }
}
