// ── Manager facade ──
//
// One object per configured device, built at startup and shut down on
// exit. Wires the session, dispatcher, resolver, config service and event
// broadcaster together and exposes the intents the outer surfaces need.

use std::sync::Arc;

use casparlink_api::{Connector, TcpConnector};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::command::Command;
use crate::config::ManagerConfig;
use crate::config_service::ConfigService;
use crate::dispatcher::{Ack, Dispatcher};
use crate::error::CoreError;
use crate::health::HealthReport;
use crate::model::ChannelLayerAddress;
use crate::routing::RoutingResolver;
use crate::session::{DeviceSession, SessionState};
use crate::store::ConfigStore;
use crate::stream::{EventBroadcaster, Subscription};

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<ManagerInner>`. Does not touch the network
/// until [`start()`](Self::start) is called.
#[derive(Clone)]
pub struct Manager {
    inner: Arc<ManagerInner>,
}

struct ManagerInner {
    events: EventBroadcaster,
    session: DeviceSession,
    dispatcher: Dispatcher,
    config_service: ConfigService,
}

impl Manager {
    /// Build a manager that talks AMCP over TCP to `config.device`.
    pub fn new(config: ManagerConfig, store: Arc<dyn ConfigStore>) -> Self {
        let connector = TcpConnector::new(
            config.device.host.clone(),
            config.device.port,
            config.device.connect_timeout,
        );
        Self::with_connector(config, Arc::new(connector), store)
    }

    /// Build a manager over any connector, e.g. an in-process fake device.
    pub fn with_connector(
        config: ManagerConfig,
        connector: Arc<dyn Connector>,
        store: Arc<dyn ConfigStore>,
    ) -> Self {
        let events = EventBroadcaster::new(config.subscriber_buffer);
        let session = DeviceSession::new(config.session.clone(), connector, events.clone());
        let resolver = RoutingResolver::new(Arc::clone(&store));
        let dispatcher = Dispatcher::new(session.clone(), resolver, events.clone());
        let config_service = ConfigService::new(store, events.clone());

        Self {
            inner: Arc::new(ManagerInner {
                events,
                session,
                dispatcher,
                config_service,
            }),
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Start the device session. A failed first connect is logged and
    /// left to the background reconnect loop; it never fails startup.
    pub async fn start(&self) {
        let device = self.inner.session.describe();
        match self.inner.session.connect().await {
            Ok(()) => info!(%device, "device session started"),
            Err(e) => warn!(%device, error = %e, "device unavailable, retrying in background"),
        }
    }

    /// Stop the device session. Pending commands fail with `ConnectionLost`.
    pub async fn shutdown(&self) {
        self.inner.session.disconnect().await;
        info!("device session stopped");
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub async fn dispatch(&self, command: Command) -> Result<Ack, CoreError> {
        self.inner.dispatcher.dispatch(command).await
    }

    pub async fn play(
        &self,
        address: ChannelLayerAddress,
        locator: impl Into<String>,
        looping: bool,
    ) -> Result<Ack, CoreError> {
        self.dispatch(Command::Play {
            address,
            locator: locator.into(),
            looping,
        })
        .await
    }

    pub async fn stop(&self, address: ChannelLayerAddress) -> Result<Ack, CoreError> {
        self.dispatch(Command::Stop { address }).await
    }

    pub async fn clear(&self, address: ChannelLayerAddress) -> Result<Ack, CoreError> {
        self.dispatch(Command::Clear { address }).await
    }

    pub async fn load_background(
        &self,
        address: ChannelLayerAddress,
        locator: impl Into<String>,
        auto: bool,
    ) -> Result<Ack, CoreError> {
        self.dispatch(Command::LoadBackground {
            address,
            locator: locator.into(),
            auto,
        })
        .await
    }

    pub async fn route(
        &self,
        address: ChannelLayerAddress,
        input_id: impl Into<String>,
    ) -> Result<Ack, CoreError> {
        self.dispatch(Command::Route {
            address,
            input_id: input_id.into(),
        })
        .await
    }

    // ── Config, events, state ────────────────────────────────────────

    pub fn config_service(&self) -> &ConfigService {
        &self.inner.config_service
    }

    pub fn subscribe(&self) -> Subscription {
        self.inner.events.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.session.is_connected()
    }

    pub fn session_state(&self) -> SessionState {
        self.inner.session.current_state()
    }

    pub fn watch_session(&self) -> watch::Receiver<SessionState> {
        self.inner.session.watch_state()
    }

    pub fn health(&self) -> HealthReport {
        HealthReport {
            status: "ok",
            device_connected: self.inner.session.is_connected(),
            device: self.inner.session.describe(),
            session: self.inner.session.current_state(),
            subscribers: self.inner.events.subscriber_count(),
            pending_commands: self.inner.session.pending_count(),
        }
    }
}
