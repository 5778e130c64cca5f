//! Gateway client handle
//!
//! Owns the per-client collaborators (cache, REST, listener registry,
//! dispatcher) and the driver task. Listener registration works before
//! and after [`GatewayClient::start`].

use crate::broadcast::EventDispatcher;
use crate::connection::{
    Command, ConnectionState, DriverChannels, GatewayEndpoint, SessionConfig, SessionDriver,
    SessionMachine,
};
use crate::error::GatewayError;
use crate::events::{Event, EventCategories};
use crate::handlers::{HandlerContext, PacketHandlerRegistry};
use crate::listeners::{listener_fn, EventListener, ListenerRegistry, RegistrationHandle};
use crate::protocol::{
    Activity, Envelope, IdentifyProperties, PresenceUpdatePayload, RequestGuildMembersPayload,
    Status, VoiceStateUpdatePayload,
};
use crate::transport::Connector;
use concord_common::ClientConfig;
use concord_core::{EntityCache, ObjectRef, RestClient, Snowflake};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use super::GatewayClientBuilder;

/// Driver inputs waiting for `start`
struct Pending {
    machine: SessionMachine,
    connector: Arc<dyn Connector>,
    handlers: Arc<PacketHandlerRegistry>,
    channels: DriverChannels,
}

pub struct GatewayClient {
    config: Arc<ClientConfig>,
    cache: Arc<dyn EntityCache>,
    rest: Arc<dyn RestClient>,
    registry: Arc<ListenerRegistry>,
    dispatcher: Arc<EventDispatcher>,
    commands: mpsc::UnboundedSender<Command>,
    shutdown: watch::Sender<bool>,
    state: watch::Receiver<ConnectionState>,
    session_id: watch::Receiver<Option<String>>,
    pending: Mutex<Option<Pending>>,
    task: Mutex<Option<JoinHandle<Result<(), GatewayError>>>>,
}

impl GatewayClient {
    #[must_use]
    pub fn builder(config: ClientConfig) -> GatewayClientBuilder {
        GatewayClientBuilder::new(config)
    }

    pub(super) fn assemble(
        config: ClientConfig,
        connector: Arc<dyn Connector>,
        rest: Arc<dyn RestClient>,
        cache: Arc<dyn EntityCache>,
        handlers: PacketHandlerRegistry,
        properties: IdentifyProperties,
        presence: Option<PresenceUpdatePayload>,
    ) -> Self {
        let registry = ListenerRegistry::new();
        let dispatcher = Arc::new(EventDispatcher::new(
            Arc::clone(&registry),
            config.dispatch_workers,
        ));

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let (session_tx, session_rx) = watch::channel(None);

        let mut session_config = SessionConfig::from_client_config(&config);
        session_config.properties = properties;
        session_config.presence = presence;

        let pending = Pending {
            machine: SessionMachine::new(session_config),
            connector,
            handlers: Arc::new(handlers),
            channels: DriverChannels {
                commands: commands_rx,
                shutdown: shutdown_rx,
                state: state_tx,
                session_id: session_tx,
            },
        };

        Self {
            config: Arc::new(config),
            cache,
            rest,
            registry,
            dispatcher,
            commands: commands_tx,
            shutdown: shutdown_tx,
            state: state_rx,
            session_id: session_rx,
            pending: Mutex::new(Some(pending)),
            task: Mutex::new(None),
        }
    }

    // === Lifecycle ===

    /// Spawn the driver task
    ///
    /// The driver resolves the gateway URL over REST first when none is
    /// configured, retrying transient failures with the reconnect backoff.
    pub fn start(&self) -> Result<(), GatewayError> {
        let pending = self
            .pending
            .lock()
            .take()
            .ok_or(GatewayError::AlreadyStarted)?;

        let ctx = HandlerContext::new(Arc::clone(&self.cache), Arc::clone(&self.dispatcher));
        let endpoint = GatewayEndpoint {
            url: self.config.gateway_url.clone(),
            version: self.config.gateway_version,
            rest: Arc::clone(&self.rest),
        };

        let driver = SessionDriver::new(
            pending.machine,
            pending.connector,
            pending.handlers,
            ctx,
            endpoint,
            pending.channels,
        );
        let handle = tokio::spawn(driver.run());

        *self.task.lock() = Some(handle);
        tracing::info!(
            intents = %self.config.intents,
            shard_id = self.config.shard.id,
            shard_count = self.config.shard.count,
            "Gateway client started"
        );
        Ok(())
    }

    /// Start if needed, then wait for the driver to finish
    ///
    /// Returns `Ok` after [`shutdown`](Self::shutdown) and the terminal
    /// error after a fatal close.
    pub async fn run(&self) -> Result<(), GatewayError> {
        if self.pending.lock().is_some() {
            self.start()?;
        }

        let handle = self.task.lock().take().ok_or(GatewayError::AlreadyStarted)?;
        handle
            .await
            .map_err(|e| GatewayError::Internal(format!("driver task failed: {e}")))?
    }

    /// Close the connection with a normal closure and stop dispatching
    pub fn shutdown(&self) {
        tracing::info!("Gateway client shutting down");
        self.shutdown.send_replace(true);
        if self.pending.lock().take().is_some() {
            self.dispatcher.shutdown();
        }
    }

    // === Listeners ===

    /// Register a listener for every event in `categories`
    pub fn add_listener<L: EventListener>(
        &self,
        categories: EventCategories,
        listener: L,
    ) -> RegistrationHandle {
        self.registry.add(categories, None, Arc::new(listener))
    }

    /// Register a listener for events concerning one object
    pub fn add_object_listener<L: EventListener>(
        &self,
        categories: EventCategories,
        target: ObjectRef,
        listener: L,
    ) -> RegistrationHandle {
        self.registry.add(categories, Some(target), Arc::new(listener))
    }

    pub fn on_connection_lost<F, Fut>(&self, f: F) -> RegistrationHandle
    where
        F: Fn(Arc<Event>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.add_listener(
            EventCategories::CONNECTION_LOST,
            listener_fn("on_connection_lost", f),
        )
    }

    pub fn on_resumed<F, Fut>(&self, f: F) -> RegistrationHandle
    where
        F: Fn(Arc<Event>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.add_listener(EventCategories::RESUMED, listener_fn("on_resumed", f))
    }

    pub fn on_reconnected<F, Fut>(&self, f: F) -> RegistrationHandle
    where
        F: Fn(Arc<Event>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.add_listener(EventCategories::RECONNECTED, listener_fn("on_reconnected", f))
    }

    // === Commands ===

    /// Change the presence now and for every future Identify
    pub fn update_presence(
        &self,
        status: Status,
        activity: Option<Activity>,
    ) -> Result<(), GatewayError> {
        self.commands
            .send(Command::UpdatePresence(PresenceUpdatePayload::new(status, activity)))
            .map_err(|_| GatewayError::Shutdown)
    }

    /// Ask for the full member list of a server
    pub fn request_server_members(&self, server_id: Snowflake) -> Result<(), GatewayError> {
        let frame = Envelope::request_guild_members(&RequestGuildMembersPayload::all(server_id))?;
        self.send_frame(frame)
    }

    /// Join, move or leave a voice channel (gateway side only)
    pub fn update_voice_state(&self, payload: VoiceStateUpdatePayload) -> Result<(), GatewayError> {
        let frame = Envelope::voice_state_update(&payload)?;
        self.send_frame(frame)
    }

    fn send_frame(&self, frame: String) -> Result<(), GatewayError> {
        if *self.state.borrow() != ConnectionState::Connected {
            return Err(GatewayError::NotConnected);
        }
        self.commands
            .send(Command::Send(frame))
            .map_err(|_| GatewayError::Shutdown)
    }

    // === Accessors ===

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Receiver notified on every connection state change
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    pub fn session_id(&self) -> Option<String> {
        self.session_id.borrow().clone()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<dyn EntityCache> {
        &self.cache
    }

    pub fn rest(&self) -> &Arc<dyn RestClient> {
        &self.rest
    }

    pub fn listeners(&self) -> &Arc<ListenerRegistry> {
        &self.registry
    }

    pub fn dispatcher(&self) -> &Arc<EventDispatcher> {
        &self.dispatcher
    }
}
