// ── Device session ──
//
// Owns the one connection to the playout device. A supervisor task walks
// Disconnected -> Connecting -> Connected, reads replies while connected,
// and reconnects with backoff after any failure. Callers submit rendered
// command lines; replies are matched to the oldest unacknowledged command.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, MutexGuard, PoisonError};
use std::time::Duration;

use casparlink_api::{CommandWriter, Connector, ReconnectConfig, Reply, ReplyReader, calculate_backoff};
use serde::Serialize;
use tokio::sync::{Mutex, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::command::DeviceCommand;
use crate::error::CoreError;
use crate::model::EventKind;
use crate::stream::EventBroadcaster;

// ── SessionState ─────────────────────────────────────────────────────

/// Connection lifecycle, observable by consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    Disconnected,
    /// `attempt` counts from 1 and resets once a link has stayed up for
    /// the reconnect delay cap.
    Connecting { attempt: u32 },
    Connected { peer: String },
}

// ── SessionConfig ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// How long a command may wait for its reply. Also bounds the write
    /// itself and the handshake.
    pub ack_timeout: Duration,
    pub reconnect: ReconnectConfig,
    /// Send `VERSION` after connecting and require a successful reply.
    pub handshake: bool,
    /// Drop the link when a command times out. Replies are correlated by
    /// position, so one lost reply would otherwise shift every later one.
    pub reset_on_ack_timeout: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ack_timeout: Duration::from_secs(5),
            reconnect: ReconnectConfig::default(),
            handshake: true,
            reset_on_ack_timeout: true,
        }
    }
}

/// A command the device acknowledged with a `2xx` reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub seq: u64,
    pub reply: Reply,
}

// ── DeviceSession ────────────────────────────────────────────────────

/// Handle to the device session. Cheaply cloneable.
#[derive(Clone)]
pub struct DeviceSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    config: SessionConfig,
    connector: Arc<dyn Connector>,
    events: EventBroadcaster,
    state: watch::Sender<SessionState>,
    /// The live link. Holding this lock is the right to write.
    link: Mutex<Option<ActiveLink>>,
    /// Commands written but not yet answered, oldest first.
    pending: std::sync::Mutex<VecDeque<Pending>>,
    next_seq: AtomicU64,
    supervisor: Mutex<Option<Supervisor>>,
}

struct ActiveLink {
    writer: CommandWriter,
    /// Cancelled to make the reader give up on this link.
    reset: CancellationToken,
}

struct Pending {
    seq: u64,
    tx: oneshot::Sender<Reply>,
}

struct Supervisor {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl DeviceSession {
    pub fn new(
        config: SessionConfig,
        connector: Arc<dyn Connector>,
        events: EventBroadcaster,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::Disconnected);
        Self {
            inner: Arc::new(SessionInner {
                config,
                connector,
                events,
                state,
                link: Mutex::new(None),
                pending: std::sync::Mutex::new(VecDeque::new()),
                next_seq: AtomicU64::new(0),
                supervisor: Mutex::new(None),
            }),
        }
    }

    /// Where the session connects to, e.g. `"localhost:5250"`.
    pub fn describe(&self) -> String {
        self.inner.connector.describe()
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Start the connection supervisor and wait for its first attempt.
    ///
    /// A failed first attempt is returned, but the supervisor keeps
    /// retrying in the background. If the supervisor is already running
    /// this returns `Ok(())` immediately.
    pub async fn connect(&self) -> Result<(), CoreError> {
        let first = {
            let mut supervisor = self.inner.supervisor.lock().await;
            if supervisor.as_ref().is_some_and(|s| !s.handle.is_finished()) {
                return Ok(());
            }

            let cancel = CancellationToken::new();
            let (tx, rx) = oneshot::channel();
            let handle = tokio::spawn(supervise(Arc::clone(&self.inner), cancel.clone(), tx));
            *supervisor = Some(Supervisor { cancel, handle });
            rx
        };

        first.await.unwrap_or(Err(CoreError::NotConnected))
    }

    /// Stop the supervisor and close the link. Pending commands fail with
    /// `ConnectionLost`. Safe to call when not running.
    pub async fn disconnect(&self) {
        let supervisor = self.inner.supervisor.lock().await.take();
        if let Some(supervisor) = supervisor {
            supervisor.cancel.cancel();
            if let Err(e) = supervisor.handle.await {
                warn!(error = %e, "session supervisor ended abnormally");
            }
        }
    }

    // ── State ────────────────────────────────────────────────────────

    pub fn current_state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    /// Subscribe to state transitions.
    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        matches!(*self.inner.state.borrow(), SessionState::Connected { .. })
    }

    /// Commands written and still waiting for a reply.
    pub fn pending_count(&self) -> usize {
        self.inner.pending().len()
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Write `command` and wait for its reply.
    ///
    /// Fails at once with `NotConnected` unless a link is up; nothing is
    /// queued. Once the line is on the wire it stays there: dropping the
    /// returned future only stops waiting for the reply.
    pub async fn submit(&self, command: &DeviceCommand) -> Result<Receipt, CoreError> {
        let inner = Arc::clone(&self.inner);
        let line = command.as_str().to_owned();

        // The write runs in its own task so a cancelled caller cannot leave
        // half a line on the wire.
        let (seq, reset, rx) = tokio::spawn(async move { inner.write(&line).await })
            .await
            .map_err(|e| CoreError::Internal(format!("write task failed: {e}")))??;

        let timeout = self.inner.config.ack_timeout;
        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(reply)) if reply.is_success() => Ok(Receipt { seq, reply }),
            Ok(Ok(reply)) => {
                debug!(seq, code = reply.code, message = %reply.message, "device rejected command");
                Err(CoreError::DeviceRejected {
                    code: reply.code,
                    message: reply.message,
                })
            }
            Ok(Err(_)) => Err(CoreError::ConnectionLost),
            Err(_) => {
                warn!(seq, timeout_ms = timeout.as_millis(), "command not acknowledged in time");
                if self.inner.config.reset_on_ack_timeout {
                    reset.cancel();
                }
                Err(CoreError::AckTimeout {
                    seq,
                    timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                })
            }
        }
    }
}

impl SessionInner {
    fn pending(&self) -> MutexGuard<'_, VecDeque<Pending>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register and write one command. Holds the link lock for the whole
    /// write so at most one write is ever in flight.
    async fn write(
        &self,
        line: &str,
    ) -> Result<(u64, CancellationToken, oneshot::Receiver<Reply>), CoreError> {
        let mut guard = self.link.lock().await;
        let link = guard.as_mut().ok_or(CoreError::NotConnected)?;

        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed) + 1;
        let (tx, rx) = oneshot::channel();
        // Registered before writing so a fast reply always finds it.
        self.pending().push_back(Pending { seq, tx });

        match tokio::time::timeout(self.config.ack_timeout, link.writer.send(line)).await {
            Ok(Ok(())) => {
                trace!(seq, command = line, "command sent");
                Ok((seq, link.reset.clone(), rx))
            }
            Ok(Err(e)) => {
                warn!(seq, error = %e, "write to device failed");
                link.reset.cancel();
                Err(CoreError::ConnectionLost)
            }
            Err(_) => {
                warn!(seq, "write to device stalled");
                link.reset.cancel();
                Err(CoreError::ConnectionLost)
            }
        }
    }

    /// Open a link, optionally handshake, and install it as the live link.
    async fn establish(&self) -> Result<(ReplyReader, CancellationToken), CoreError> {
        let link = self.connector.connect().await?;
        let peer = link.peer().to_owned();
        let (mut writer, mut reader) = link.split();

        if self.config.handshake {
            if let Err(e) = self.handshake(&mut writer, &mut reader).await {
                writer.shutdown().await;
                return Err(e);
            }
        }

        let reset = CancellationToken::new();
        *self.link.lock().await = Some(ActiveLink {
            writer,
            reset: reset.clone(),
        });

        self.state.send_replace(SessionState::Connected { peer: peer.clone() });
        info!(%peer, "connected to device");
        self.events.emit(EventKind::Connected { peer });

        Ok((reader, reset))
    }

    async fn handshake(
        &self,
        writer: &mut CommandWriter,
        reader: &mut ReplyReader,
    ) -> Result<(), CoreError> {
        writer.send("VERSION").await?;
        let reply = tokio::time::timeout(self.config.ack_timeout, reader.next_reply())
            .await
            .map_err(|_| CoreError::ConnectionFailed {
                addr: self.connector.describe(),
                reason: "no reply to VERSION".into(),
            })??
            .ok_or(CoreError::ConnectionLost)?;

        if !reply.is_success() {
            return Err(CoreError::ConnectionFailed {
                addr: self.connector.describe(),
                reason: format!("VERSION rejected ({}): {}", reply.code, reply.message),
            });
        }

        let version = reply.data.first().map_or("unknown", String::as_str);
        info!(version, "device handshake complete");
        Ok(())
    }

    /// Read replies until the link fails, is reset, or the session stops.
    /// Returns the reason the link ended.
    async fn read_replies(
        &self,
        mut reader: ReplyReader,
        reset: &CancellationToken,
        cancel: &CancellationToken,
    ) -> String {
        loop {
            tokio::select! {
                () = cancel.cancelled() => return "disconnect requested".into(),
                () = reset.cancelled() => return "link reset".into(),
                next = reader.next_reply() => match next {
                    Ok(Some(reply)) => self.acknowledge(reply),
                    Ok(None) => return "device closed the connection".into(),
                    Err(e) => return e.to_string(),
                },
            }
        }
    }

    fn acknowledge(&self, reply: Reply) {
        let oldest = self.pending().pop_front();
        match oldest {
            Some(pending) => {
                trace!(seq = pending.seq, code = reply.code, "reply received");
                // The submitter may have given up; that is fine.
                let _ = pending.tx.send(reply);
            }
            None => debug!(code = reply.code, message = %reply.message, "unsolicited reply ignored"),
        }
    }

    /// Close the live link, if any, and fail everything still pending.
    async fn teardown(&self, reason: &str) {
        let link = self.link.lock().await.take();
        self.state.send_replace(SessionState::Disconnected);

        if let Some(mut link) = link {
            link.reset.cancel();
            link.writer.shutdown().await;
            warn!(reason, "disconnected from device");
            self.events.emit(EventKind::Disconnected {
                reason: reason.to_owned(),
            });
        }

        let drained: Vec<Pending> = self.pending().drain(..).collect();
        if !drained.is_empty() {
            debug!(count = drained.len(), "failing unacknowledged commands");
        }
        // Dropping the senders resolves each waiter with ConnectionLost.
        drop(drained);
    }
}

// ── Supervisor ───────────────────────────────────────────────────────

async fn supervise(
    inner: Arc<SessionInner>,
    cancel: CancellationToken,
    first: oneshot::Sender<Result<(), CoreError>>,
) {
    let mut first = Some(first);
    let reconnect = inner.config.reconnect.clone();
    let mut retries: u32 = 0;

    while !cancel.is_cancelled() {
        inner.state.send_replace(SessionState::Connecting {
            attempt: retries.saturating_add(1),
        });

        let outcome = tokio::select! {
            () = cancel.cancelled() => break,
            outcome = inner.establish() => outcome,
        };

        let delay = match outcome {
            Ok((reader, reset)) => {
                if let Some(tx) = first.take() {
                    let _ = tx.send(Ok(()));
                }
                let up_since = Instant::now();
                let reason = inner.read_replies(reader, &reset, &cancel).await;
                inner.teardown(&reason).await;

                // Only a link that stayed up for a full backoff cap counts as
                // recovered; one that drops sooner keeps the delay growing.
                if up_since.elapsed() >= reconnect.max_delay {
                    retries = 0;
                }
                let delay = calculate_backoff(retries, &reconnect);
                retries = retries.saturating_add(1);
                delay
            }
            Err(e) => {
                inner.state.send_replace(SessionState::Disconnected);
                warn!(attempt = retries + 1, error = %e, "device connection attempt failed");
                if let Some(tx) = first.take() {
                    let _ = tx.send(Err(e));
                }
                if !reconnect.allows(retries) {
                    warn!(retries, "giving up on device connection");
                    break;
                }
                let delay = calculate_backoff(retries, &reconnect);
                retries = retries.saturating_add(1);
                delay
            }
        };

        if cancel.is_cancelled() {
            break;
        }
        debug!(delay_ms = delay.as_millis(), "reconnecting after delay");
        tokio::select! {
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(delay) => {}
        }
    }

    inner.teardown("session stopped").await;
    debug!("session supervisor exited");
}
