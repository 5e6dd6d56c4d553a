// ── Command dispatcher ──
//
// Validates and renders commands, then pushes them through the session one
// address at a time. Each address has a FIFO lane (a fair async mutex held
// until the command's outcome is known); different addresses never wait on
// each other.

use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::command::{Command, CommandKind, DeviceCommand};
use crate::error::CoreError;
use crate::model::{ChannelLayerAddress, EventKind};
use crate::routing::RoutingResolver;
use crate::session::{DeviceSession, Receipt};
use crate::stream::EventBroadcaster;

/// Successful outcome of one command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ack {
    pub command_id: Uuid,
    pub address: ChannelLayerAddress,
    pub command: CommandKind,
    /// Session sequence number the command was written under.
    pub seq: u64,
    pub code: u16,
    pub message: String,
}

#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    session: DeviceSession,
    resolver: RoutingResolver,
    events: EventBroadcaster,
    lanes: DashMap<ChannelLayerAddress, Arc<Mutex<()>>>,
}

/// Identity of one dispatched command, shared by its events.
#[derive(Clone, Copy)]
struct Tag {
    id: Uuid,
    address: ChannelLayerAddress,
    kind: CommandKind,
}

impl Dispatcher {
    pub fn new(session: DeviceSession, resolver: RoutingResolver, events: EventBroadcaster) -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                session,
                resolver,
                events,
                lanes: DashMap::new(),
            }),
        }
    }

    /// Validate, resolve, and run `command` on its address lane.
    ///
    /// Commands rejected before reaching the device (bad shape, unknown
    /// input) publish a single `CommandFailed`. Commands that reach the
    /// session publish `CommandIssued` followed by exactly one of
    /// `CommandAcked` or `CommandFailed`.
    pub async fn dispatch(&self, command: Command) -> Result<Ack, CoreError> {
        let tag = Tag {
            id: Uuid::new_v4(),
            address: command.address(),
            kind: command.kind(),
        };

        let line = match self.prepare(&command) {
            Ok(line) => line,
            Err(e) => {
                debug!(command = %tag.kind, address = %tag.address, error = %e, "command rejected");
                self.inner.events.emit(failed(tag, &e));
                return Err(e);
            }
        };

        let params = command.params();
        let ticket = LaneTicket::new(&self.inner, tag.address);
        let turn = ticket.lane().lock_owned().await;

        // From here the command runs to completion even if the caller
        // stops waiting.
        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move {
            inner.events.emit(EventKind::CommandIssued {
                command_id: tag.id,
                address: tag.address,
                command: tag.kind,
                params,
            });
            debug!(command = %line, address = %tag.address, "command issued");

            let outcome = inner.session.submit(&line).await;
            match &outcome {
                Ok(receipt) => inner.events.emit(acked(tag, receipt)),
                Err(e) => {
                    debug!(command = %line, error = %e, "command failed");
                    inner.events.emit(failed(tag, e));
                }
            }

            drop(turn);
            drop(ticket);
            outcome
        });

        let receipt = task
            .await
            .map_err(|e| CoreError::Internal(format!("dispatch task failed: {e}")))??;

        Ok(Ack {
            command_id: tag.id,
            address: tag.address,
            command: tag.kind,
            seq: receipt.seq,
            code: receipt.reply.code,
            message: receipt.reply.message,
        })
    }

    /// Number of addresses with a command queued or in flight.
    pub fn active_lanes(&self) -> usize {
        self.inner.lanes.len()
    }

    fn prepare(&self, command: &Command) -> Result<DeviceCommand, CoreError> {
        command.validate()?;
        let route = match command {
            Command::Route { input_id, .. } => Some(self.inner.resolver.resolve(input_id)?),
            _ => None,
        };
        DeviceCommand::render(command, route.as_ref())
    }
}

impl DispatcherInner {
    fn lane(&self, address: ChannelLayerAddress) -> Arc<Mutex<()>> {
        Arc::clone(self.lanes.entry(address).or_default().value())
    }
}

/// A caller's claim on an address lane, queued or running. Dropping it,
/// including when the caller is cancelled while still queued, forgets the
/// lane if nobody else holds it.
struct LaneTicket {
    inner: Arc<DispatcherInner>,
    address: ChannelLayerAddress,
    lane: Arc<Mutex<()>>,
}

impl LaneTicket {
    fn new(inner: &Arc<DispatcherInner>, address: ChannelLayerAddress) -> Self {
        Self {
            inner: Arc::clone(inner),
            address,
            lane: inner.lane(address),
        }
    }

    fn lane(&self) -> Arc<Mutex<()>> {
        Arc::clone(&self.lane)
    }
}

impl Drop for LaneTicket {
    fn drop(&mut self) {
        // Idle when only the map and this ticket are left.
        self.inner.lanes.remove_if(&self.address, |_, lane| {
            Arc::ptr_eq(lane, &self.lane) && Arc::strong_count(lane) == 2
        });
    }
}

fn acked(tag: Tag, receipt: &Receipt) -> EventKind {
    EventKind::CommandAcked {
        command_id: tag.id,
        address: tag.address,
        command: tag.kind,
        code: receipt.reply.code,
        message: receipt.reply.message.clone(),
    }
}

fn failed(tag: Tag, error: &CoreError) -> EventKind {
    EventKind::CommandFailed {
        command_id: tag.id,
        address: tag.address,
        command: tag.kind,
        error: error.to_string(),
    }
}
