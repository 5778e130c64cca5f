//! Session driver
//!
//! Runs the [`SessionMachine`] against a live transport: reads frames,
//! fires heartbeat and deferred-send timers, forwards outbound commands
//! and performs the actions the machine answers with. One driver task
//! exists per client.
//!
//! Writes and closes are bounded by [`IO_TIMEOUT`] so a peer that stops
//! reading cannot wedge the loop.

use super::session::{SessionAction, SessionMachine};
use super::state::ConnectionState;
use crate::error::GatewayError;
use crate::events::Event;
use crate::handlers::{HandlerContext, PacketHandlerRegistry};
use crate::protocol::{CloseCode, CodecError, Envelope, PresenceUpdatePayload};
use crate::rest::discover_gateway_url;
use crate::transport::{Connector, Frame, Transport, TransportError};
use concord_core::{RestClient, RestError};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

/// Upper bound for one transport write or close
pub const IO_TIMEOUT: Duration = Duration::from_secs(5);

/// Outbound request from the client handle
#[derive(Debug)]
pub enum Command {
    /// Send an encoded frame while connected
    Send(String),
    /// Send a presence update and keep it for future Identify frames
    UpdatePresence(PresenceUpdatePayload),
}

/// Channels the driver reports through and listens on
pub struct DriverChannels {
    pub commands: mpsc::UnboundedReceiver<Command>,
    pub shutdown: watch::Receiver<bool>,
    pub state: watch::Sender<ConnectionState>,
    pub session_id: watch::Sender<Option<String>>,
}

/// Where the driver connects to
pub struct GatewayEndpoint {
    /// Configured URL; discovered over REST while `None`
    pub url: Option<String>,
    pub version: u8,
    pub rest: Arc<dyn RestClient>,
}

/// How one connection ended
enum Outcome {
    Reconnect(Duration),
    Fatal(GatewayError),
    Shutdown,
}

/// What woke the connection loop
enum Wake {
    Shutdown,
    Frame(Option<Result<Frame, TransportError>>),
    Heartbeat,
    Deferred,
    Command(Command),
}

pub struct SessionDriver {
    machine: SessionMachine,
    connector: Arc<dyn Connector>,
    handlers: Arc<PacketHandlerRegistry>,
    ctx: HandlerContext,
    endpoint: GatewayEndpoint,
    channels: DriverChannels,
}

impl SessionDriver {
    #[must_use]
    pub fn new(
        machine: SessionMachine,
        connector: Arc<dyn Connector>,
        handlers: Arc<PacketHandlerRegistry>,
        ctx: HandlerContext,
        endpoint: GatewayEndpoint,
        channels: DriverChannels,
    ) -> Self {
        Self {
            machine,
            connector,
            handlers,
            ctx,
            endpoint,
            channels,
        }
    }

    /// Connect, and keep reconnecting until shutdown or a fatal close
    pub async fn run(mut self) -> Result<(), GatewayError> {
        let mut wait: Option<Duration> = None;

        loop {
            if let Some(delay) = wait.take() {
                if self.wait_or_shutdown(delay).await {
                    return self.finish();
                }
            }
            if *self.channels.shutdown.borrow() {
                return self.finish();
            }

            let base = match self.resolve_gateway_url().await {
                Ok(Some(base)) => base,
                Ok(None) => return self.finish(),
                Err(error) => return self.fail(error),
            };

            self.machine.connecting();
            self.publish();
            let url = self.connect_url(&base);
            tracing::info!(url = %url, resumable = self.machine.session().is_some(), "Connecting to gateway");

            let connected = tokio::select! {
                _ = self.channels.shutdown.changed() => None,
                result = self.connector.connect(&url) => Some(result),
            };
            let Some(connected) = connected else {
                return self.finish();
            };

            let transport = match connected {
                Ok(transport) => transport,
                Err(e) => {
                    tracing::warn!(error = %e, "Gateway connect failed");
                    wait = Some(self.machine.connect_failed());
                    self.publish();
                    continue;
                }
            };

            self.machine.transport_open();
            self.publish();

            match self.run_connection(transport).await {
                Outcome::Reconnect(delay) => wait = Some(delay),
                Outcome::Fatal(error) => return self.fail(error),
                Outcome::Shutdown => return self.finish(),
            }
        }
    }

    /// Sleep for `delay`; true when shutdown was requested meanwhile
    async fn wait_or_shutdown(&mut self, delay: Duration) -> bool {
        tokio::select! {
            _ = self.channels.shutdown.changed() => true,
            _ = tokio::time::sleep(delay) => false,
        }
    }

    /// Configured gateway URL, or the one `GET /gateway/bot` reports
    ///
    /// Transient REST failures are retried with the reconnect backoff.
    /// `Ok(None)` means shutdown was requested before a URL was known.
    async fn resolve_gateway_url(&mut self) -> Result<Option<String>, GatewayError> {
        loop {
            if let Some(url) = &self.endpoint.url {
                return Ok(Some(url.clone()));
            }

            let discovered = tokio::select! {
                _ = self.channels.shutdown.changed() => return Ok(None),
                result = discover_gateway_url(self.endpoint.rest.as_ref()) => result,
            };

            match discovered {
                Ok(url) => self.endpoint.url = Some(url),
                Err(RestError::Unauthorized) => return Err(GatewayError::AuthenticationFailed),
                Err(e) if e.is_transient() => {
                    tracing::warn!(error = %e, "Gateway URL discovery failed");
                    let delay = self.machine.connect_failed();
                    self.publish();
                    if self.wait_or_shutdown(delay).await {
                        return Ok(None);
                    }
                }
                Err(e) => return Err(GatewayError::Discovery(e)),
            }
        }
    }

    fn connect_url(&self, base: &str) -> String {
        let base = self.machine.connect_url(base, Instant::now());
        format!(
            "{}/?v={}&encoding=json",
            base.trim_end_matches('/'),
            self.endpoint.version
        )
    }

    async fn run_connection(&mut self, mut transport: Box<dyn Transport>) -> Outcome {
        let mut deferred: Option<(Instant, String)> = None;

        loop {
            let heartbeat_at = self.machine.heartbeat_deadline();
            let deferred_at = deferred.as_ref().map(|(at, _)| *at);

            let wake = tokio::select! {
                biased;
                _ = self.channels.shutdown.changed() => Wake::Shutdown,
                // ahead of reads so a flooding peer cannot starve the zombie check
                _ = sleep_until(heartbeat_at) => Wake::Heartbeat,
                frame = transport.next_frame() => Wake::Frame(frame),
                _ = sleep_until(deferred_at) => Wake::Deferred,
                Some(command) = self.channels.commands.recv() => Wake::Command(command),
            };

            let now = Instant::now();
            let actions = match wake {
                Wake::Shutdown => {
                    close_bounded(
                        transport.as_mut(),
                        CloseCode::NormalClosure.as_u16(),
                        "shutdown",
                    )
                    .await;
                    return Outcome::Shutdown;
                }
                Wake::Frame(Some(Ok(Frame::Text(text)))) => self.on_raw(Envelope::decode(&text), now),
                Wake::Frame(Some(Ok(Frame::Binary(bytes)))) => {
                    self.on_raw(Envelope::decode_bytes(&bytes), now)
                }
                Wake::Frame(Some(Ok(Frame::Close(close)))) => {
                    if let Some(close) = &close {
                        tracing::info!(code = close.code, reason = %close.reason, "Gateway closed the connection");
                    }
                    self.machine.disconnected(close.map(|c| c.code), now)
                }
                Wake::Frame(Some(Err(e))) => {
                    tracing::warn!(error = %e, "Gateway read failed");
                    self.machine.disconnected(None, now)
                }
                Wake::Frame(None) => {
                    tracing::info!("Gateway stream ended");
                    self.machine.disconnected(None, now)
                }
                Wake::Heartbeat => self.machine.heartbeat_tick(now),
                Wake::Deferred => deferred
                    .take()
                    .map(|(_, frame)| vec![SessionAction::Send(frame)])
                    .unwrap_or_default(),
                Wake::Command(command) => self.on_command(command),
            };

            let outcome = self.perform(actions, &mut transport, &mut deferred).await;
            self.publish();
            if let Some(outcome) = outcome {
                return outcome;
            }
        }
    }

    fn on_raw(
        &mut self,
        decoded: Result<Envelope, CodecError>,
        now: Instant,
    ) -> Vec<SessionAction> {
        match decoded {
            Ok(envelope) => {
                tracing::trace!(envelope = %envelope, "Frame received");
                self.machine.handle(envelope, now)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Undecodable frame dropped");
                Vec::new()
            }
        }
    }

    fn on_command(&mut self, command: Command) -> Vec<SessionAction> {
        let frame = match command {
            Command::Send(frame) => frame,
            Command::UpdatePresence(presence) => {
                let frame = Envelope::presence_update(&presence);
                self.machine.set_presence(presence);
                match frame {
                    Ok(frame) => frame,
                    Err(e) => {
                        tracing::warn!(error = %e, "Presence update not encodable");
                        return Vec::new();
                    }
                }
            }
        };

        if self.machine.state() == ConnectionState::Connected {
            vec![SessionAction::Send(frame)]
        } else {
            tracing::debug!(state = %self.machine.state(), "Command dropped, not connected");
            Vec::new()
        }
    }

    async fn perform(
        &mut self,
        actions: Vec<SessionAction>,
        transport: &mut Box<dyn Transport>,
        deferred: &mut Option<(Instant, String)>,
    ) -> Option<Outcome> {
        let mut queue: VecDeque<SessionAction> = actions.into();

        while let Some(action) = queue.pop_front() {
            match action {
                SessionAction::Send(frame) => {
                    let sent = match tokio::time::timeout(IO_TIMEOUT, transport.send(frame)).await {
                        Ok(Ok(())) => true,
                        Ok(Err(e)) => {
                            tracing::warn!(error = %e, "Gateway send failed");
                            false
                        }
                        Err(_) => {
                            tracing::warn!(
                                timeout_ms = IO_TIMEOUT.as_millis() as u64,
                                "Gateway send timed out"
                            );
                            false
                        }
                    };
                    if !sent {
                        queue.clear();
                        queue.extend(self.machine.disconnected(None, Instant::now()));
                    }
                }
                SessionAction::SendAfter { delay, frame } => {
                    *deferred = Some((Instant::now() + delay, frame));
                }
                SessionAction::Dispatch {
                    event_type,
                    sequence,
                    data,
                } => self.dispatch(&event_type, sequence, data),
                SessionAction::Notify(lifecycle) => {
                    self.ctx.emit(Event::from(lifecycle), &[]);
                }
                SessionAction::Close(code) => {
                    close_bounded(transport.as_mut(), code.as_u16(), code.description()).await;
                    queue.clear();
                    queue.extend(self.machine.disconnected(Some(code.as_u16()), Instant::now()));
                }
                SessionAction::Reconnect { delay } => return Some(Outcome::Reconnect(delay)),
                SessionAction::Fatal(error) => return Some(Outcome::Fatal(error)),
            }
        }
        None
    }

    fn dispatch(&mut self, event_type: &str, sequence: Option<u64>, data: serde_json::Value) {
        match self.handlers.handle(event_type, data, &self.ctx) {
            Ok(()) => {
                if let Some(sequence) = sequence {
                    self.machine.commit_sequence(sequence);
                }
            }
            Err(e) if e.is_unknown_event() => {
                tracing::debug!(event_type, seq = ?sequence, "No handler for event type");
            }
            Err(e) => {
                tracing::warn!(event_type, seq = ?sequence, error = %e, "Dispatch handling failed");
            }
        }
    }

    fn publish(&self) {
        let state = self.machine.state();
        self.channels.state.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            tracing::debug!(from = %current, to = %state, "Connection state changed");
            *current = state;
            true
        });

        let session_id = self.machine.session_id();
        self.channels.session_id.send_if_modified(|current| {
            if current.as_deref() == session_id {
                return false;
            }
            *current = session_id.map(str::to_string);
            true
        });
    }

    fn fail(mut self, error: GatewayError) -> Result<(), GatewayError> {
        tracing::error!(code = error.code(), error = %error, "Gateway session ended");
        self.machine.shutdown();
        self.publish();
        self.ctx.dispatcher().shutdown();
        Err(error)
    }

    fn finish(mut self) -> Result<(), GatewayError> {
        tracing::info!("Gateway client shut down");
        self.machine.shutdown();
        self.publish();
        self.ctx.dispatcher().shutdown();
        Ok(())
    }
}

/// Close `transport`, giving up after [`IO_TIMEOUT`]
///
/// The transport is dropped by the caller either way.
async fn close_bounded(transport: &mut dyn Transport, code: u16, reason: &str) {
    match tokio::time::timeout(IO_TIMEOUT, transport.close(code, reason)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::debug!(code, error = %e, "Close failed"),
        Err(_) => tracing::warn!(code, "Close timed out, dropping connection"),
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
