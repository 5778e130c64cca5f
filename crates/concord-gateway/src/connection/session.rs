//! Session state machine
//!
//! Sans-IO core of the gateway session. It consumes decoded envelopes,
//! heartbeat ticks and transport events, and answers with
//! [`SessionAction`]s that the driver performs. It owns the one live
//! [`Session`] of the client.

use super::backoff::Backoff;
use super::heartbeat::{Heartbeat, HeartbeatTick};
use super::state::ConnectionState;
use crate::error::GatewayError;
use crate::events::Lifecycle;
use crate::protocol::{
    CloseCode, CodecError, Envelope, HelloPayload, IdentifyPayload, IdentifyProperties, OpCode,
    PresenceUpdatePayload, ResumePayload,
};
use chrono::{DateTime, Utc};
use concord_common::{ClientConfig, ReconnectConfig};
use concord_core::Intents;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tokio::time::Instant;

/// Wait before re-identifying after an Invalid Session in reply to Identify
const IDENTIFY_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Bounds of the random wait after any other Invalid Session
const INVALID_SESSION_DELAY_MS: (u64, u64) = (1_000, 5_000);

/// Static inputs of the handshake
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub token: String,
    pub intents: Intents,
    pub shard: Option<[u32; 2]>,
    pub large_threshold: u16,
    pub properties: IdentifyProperties,
    pub presence: Option<PresenceUpdatePayload>,
    pub resume_window: Duration,
    pub reconnect: ReconnectConfig,
}

impl SessionConfig {
    #[must_use]
    pub fn from_client_config(config: &ClientConfig) -> Self {
        Self {
            token: config.token.clone(),
            intents: config.intents,
            shard: config
                .shard
                .is_sharded()
                .then_some([config.shard.id, config.shard.count]),
            large_threshold: config.large_threshold,
            properties: IdentifyProperties::new(),
            presence: None,
            resume_window: config.resume_window,
            reconnect: config.reconnect,
        }
    }
}

/// Resumable gateway session, created on READY
#[derive(Debug, Clone)]
pub struct Session {
    pub session_id: String,
    /// Sequence of the last dispatch handed to the dispatcher
    pub sequence: Option<u64>,
    pub resume_gateway_url: Option<String>,
    pub created_at: DateTime<Utc>,
    dropped_at: Option<Instant>,
}

impl Session {
    fn new(session_id: String, resume_gateway_url: Option<String>) -> Self {
        Self {
            session_id,
            sequence: None,
            resume_gateway_url,
            created_at: Utc::now(),
            dropped_at: None,
        }
    }

    /// When the connection carrying this session was lost
    pub fn dropped_at(&self) -> Option<Instant> {
        self.dropped_at
    }

    fn within_window(&self, window: Duration, now: Instant) -> bool {
        self.dropped_at
            .map_or(true, |dropped| now.saturating_duration_since(dropped) <= window)
    }
}

#[derive(Deserialize)]
struct ReadySession {
    session_id: String,
    #[serde(default)]
    resume_gateway_url: Option<String>,
}

/// Work for the driver
#[derive(Debug)]
pub enum SessionAction {
    /// Send a frame now
    Send(String),
    /// Send a frame once `delay` has elapsed (dropped if the connection
    /// goes away first)
    SendAfter { delay: Duration, frame: String },
    /// Route a dispatch through the packet handlers, then commit `sequence`
    Dispatch {
        event_type: String,
        sequence: Option<u64>,
        data: Value,
    },
    /// Emit a lifecycle event
    Notify(Lifecycle),
    /// Close the transport with this code, then report the disconnect
    Close(CloseCode),
    /// Open a new transport after `delay`
    Reconnect { delay: Duration },
    /// Stop for good
    Fatal(GatewayError),
}

/// Gateway session state machine
pub struct SessionMachine {
    config: SessionConfig,
    state: ConnectionState,
    session: Option<Session>,
    heartbeat: Heartbeat,
    backoff: Backoff,
    rng: StdRng,
    connected_at: Option<Instant>,
    had_session: bool,
}

impl SessionMachine {
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        let backoff = Backoff::new(config.reconnect.base, config.reconnect.max);
        Self {
            config,
            state: ConnectionState::Disconnected,
            session: None,
            heartbeat: Heartbeat::new(),
            backoff,
            rng: StdRng::from_entropy(),
            connected_at: None,
            had_session: false,
        }
    }

    /// Use a deterministic jitter source
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.session_id.as_str())
    }

    /// Last committed sequence
    pub fn sequence(&self) -> Option<u64> {
        self.session.as_ref().and_then(|s| s.sequence)
    }

    pub fn heartbeat(&self) -> &Heartbeat {
        &self.heartbeat
    }

    pub fn heartbeat_deadline(&self) -> Option<Instant> {
        self.heartbeat.deadline()
    }

    /// Presence sent with future Identify frames
    pub fn set_presence(&mut self, presence: PresenceUpdatePayload) {
        self.config.presence = Some(presence);
    }

    /// A session exists and its resume window has not elapsed
    pub fn is_resumable(&self, now: Instant) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.within_window(self.config.resume_window, now))
    }

    /// Gateway base URL for the next connection
    pub fn connect_url<'a>(&'a self, default: &'a str, now: Instant) -> &'a str {
        if !self.is_resumable(now) {
            return default;
        }
        self.session
            .as_ref()
            .and_then(|s| s.resume_gateway_url.as_deref())
            .unwrap_or(default)
    }

    // === Transport Events ===

    pub fn connecting(&mut self) {
        self.state = ConnectionState::Connecting;
    }

    pub fn transport_open(&mut self) {
        self.state = ConnectionState::WaitingForHello;
    }

    /// Opening the transport failed; returns the wait before the next try
    pub fn connect_failed(&mut self) -> Duration {
        self.state = ConnectionState::Reconnecting;
        let delay = self.backoff.next_delay(&mut self.rng);
        tracing::warn!(
            attempt = self.backoff.attempt(),
            delay_ms = delay.as_millis() as u64,
            "Gateway connection failed, retrying"
        );
        delay
    }

    /// The transport closed (remotely, or after a [`SessionAction::Close`])
    pub fn disconnected(&mut self, close_code: Option<u16>, now: Instant) -> Vec<SessionAction> {
        self.heartbeat.stop();
        if self.state == ConnectionState::Disconnected {
            return Vec::new();
        }

        let mut actions = Vec::new();
        if self.state == ConnectionState::Connected {
            actions.push(SessionAction::Notify(Lifecycle::ConnectionLost));
        }

        if let Some(connected_at) = self.connected_at.take() {
            if now.saturating_duration_since(connected_at) >= self.config.reconnect.stable_window {
                self.backoff.reset();
            }
        }
        if let Some(session) = self.session.as_mut() {
            session.dropped_at.get_or_insert(now);
        }

        if let Some(code) = close_code.and_then(CloseCode::from_u16) {
            if code.is_fatal() {
                tracing::error!(
                    code = code.as_u16(),
                    reason = code.description(),
                    "Fatal close code, not reconnecting"
                );
                self.state = ConnectionState::Disconnected;
                self.session = None;
                actions.push(SessionAction::Fatal(GatewayError::from_close(code)));
                return actions;
            }
            if code.invalidates_session() && self.session.take().is_some() {
                tracing::info!(code = code.as_u16(), "Session invalidated by close code");
            }
        }

        self.state = ConnectionState::Reconnecting;
        let delay = self.backoff.next_delay(&mut self.rng);
        tracing::info!(
            code = ?close_code,
            resumable = self.session.is_some(),
            attempt = self.backoff.attempt(),
            delay_ms = delay.as_millis() as u64,
            "Gateway connection lost"
        );
        actions.push(SessionAction::Reconnect { delay });
        actions
    }

    /// Explicit shutdown: terminal, the session is destroyed
    pub fn shutdown(&mut self) {
        self.heartbeat.stop();
        self.state = ConnectionState::Disconnected;
        self.session = None;
        self.connected_at = None;
    }

    // === Inbound ===

    /// Process one inbound envelope
    pub fn handle(&mut self, envelope: Envelope, now: Instant) -> Vec<SessionAction> {
        match envelope.op {
            OpCode::Hello => {
                let hello = envelope.as_hello().unwrap_or_default();
                self.on_hello(hello, now)
            }
            OpCode::HeartbeatAck => {
                let latency = self.heartbeat.on_ack(now);
                tracing::trace!(latency_ms = latency.map(|l| l.as_millis() as u64), "Heartbeat ACK");
                Vec::new()
            }
            OpCode::Heartbeat => {
                tracing::debug!("Gateway requested a heartbeat");
                vec![encoded(Envelope::heartbeat(self.sequence()))]
            }
            OpCode::Reconnect => {
                tracing::info!(session_id = ?self.session_id(), "Gateway requested reconnect");
                vec![SessionAction::Close(CloseCode::CommandedReconnect)]
            }
            OpCode::InvalidSession => {
                let resumable = envelope.as_invalid_session().unwrap_or(false);
                self.on_invalid_session(resumable)
            }
            OpCode::Dispatch => self.on_dispatch(envelope, now),
            op => {
                tracing::debug!(op = %op, "Ignoring unexpected op code");
                Vec::new()
            }
        }
    }

    fn on_hello(&mut self, hello: HelloPayload, now: Instant) -> Vec<SessionAction> {
        let interval = Duration::from_millis(hello.heartbeat_interval);
        let jitter: f64 = self.rng.gen();
        self.heartbeat.start(interval, jitter, now);

        if self.session.is_some() && !self.is_resumable(now) {
            tracing::info!("Resume window elapsed, starting a new session");
            self.session = None;
        }

        if self.session.is_some() {
            self.state = ConnectionState::Resuming;
            tracing::debug!(
                session_id = ?self.session_id(),
                seq = ?self.sequence(),
                heartbeat_interval = hello.heartbeat_interval,
                "Hello received, resuming"
            );
            vec![encoded(self.resume_frame())]
        } else {
            self.state = ConnectionState::Identifying;
            tracing::debug!(
                heartbeat_interval = hello.heartbeat_interval,
                "Hello received, identifying"
            );
            vec![encoded(self.identify_frame())]
        }
    }

    fn on_invalid_session(&mut self, resumable: bool) -> Vec<SessionAction> {
        if self.state == ConnectionState::Identifying {
            tracing::warn!(
                delay_secs = IDENTIFY_RETRY_DELAY.as_secs(),
                "Identify rejected, probably rate limited"
            );
            return vec![encoded_after(IDENTIFY_RETRY_DELAY, self.identify_frame())];
        }

        let delay = Duration::from_millis(
            self.rng
                .gen_range(INVALID_SESSION_DELAY_MS.0..=INVALID_SESSION_DELAY_MS.1),
        );

        if resumable && self.session.is_some() {
            self.state = ConnectionState::Resuming;
            tracing::info!(delay_ms = delay.as_millis() as u64, "Session invalid, retrying resume");
            vec![encoded_after(delay, self.resume_frame())]
        } else {
            if let Some(session) = self.session.take() {
                tracing::info!(session_id = %session.session_id, "Session invalidated");
            }
            self.state = ConnectionState::Identifying;
            tracing::info!(delay_ms = delay.as_millis() as u64, "Re-identifying");
            vec![encoded_after(delay, self.identify_frame())]
        }
    }

    fn on_dispatch(&mut self, envelope: Envelope, now: Instant) -> Vec<SessionAction> {
        let Some(event_type) = envelope.t else {
            tracing::warn!(seq = ?envelope.s, "Dispatch without an event type dropped");
            return Vec::new();
        };
        let data = envelope.d.unwrap_or(Value::Null);
        let mut actions = Vec::new();

        if self.state == ConnectionState::Resuming {
            self.mark_connected(now);
            tracing::info!(session_id = ?self.session_id(), seq = ?self.sequence(), "Session resumed");
            actions.push(SessionAction::Notify(Lifecycle::Resumed));
        }

        let mut reconnected = false;
        if event_type == "READY" {
            match ReadySession::deserialize(&data) {
                Ok(ready) => {
                    if let Some(old) = self.session.take() {
                        tracing::debug!(old_session_id = %old.session_id, "Replacing session");
                    }
                    tracing::info!(session_id = %ready.session_id, "Session created");
                    self.session = Some(Session::new(ready.session_id, ready.resume_gateway_url));
                    reconnected = self.had_session;
                    self.had_session = true;
                    self.mark_connected(now);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "READY without a usable session id");
                }
            }
        }

        actions.push(SessionAction::Dispatch {
            event_type,
            sequence: envelope.s,
            data,
        });
        if reconnected {
            actions.push(SessionAction::Notify(Lifecycle::Reconnected));
        }
        actions
    }

    fn mark_connected(&mut self, now: Instant) {
        self.state = ConnectionState::Connected;
        self.connected_at = Some(now);
        if let Some(session) = self.session.as_mut() {
            session.dropped_at = None;
        }
    }

    /// Record that the dispatch with `sequence` was handed off
    pub fn commit_sequence(&mut self, sequence: u64) {
        if let Some(session) = self.session.as_mut() {
            session.sequence = Some(session.sequence.map_or(sequence, |s| s.max(sequence)));
        }
    }

    // === Timers ===

    pub fn heartbeat_tick(&mut self, now: Instant) -> Vec<SessionAction> {
        match self.heartbeat.on_tick(now) {
            HeartbeatTick::Beat => {
                tracing::trace!(seq = ?self.sequence(), "Sending heartbeat");
                vec![encoded(Envelope::heartbeat(self.sequence()))]
            }
            HeartbeatTick::Zombied => {
                tracing::warn!(
                    session_id = ?self.session_id(),
                    "Heartbeat not acknowledged, connection is zombied"
                );
                vec![SessionAction::Close(CloseCode::HeartbeatNotAnswered)]
            }
        }
    }

    // === Frames ===

    fn identify_frame(&self) -> Result<String, CodecError> {
        Envelope::identify(&IdentifyPayload {
            token: self.config.token.clone(),
            properties: self.config.properties.clone(),
            compress: false,
            large_threshold: self.config.large_threshold,
            shard: self.config.shard,
            presence: self.config.presence.clone(),
            intents: self.config.intents,
        })
    }

    fn resume_frame(&self) -> Result<String, CodecError> {
        let session_id = self.session_id().unwrap_or_default().to_string();
        Envelope::resume(&ResumePayload {
            token: self.config.token.clone(),
            session_id,
            seq: self.sequence(),
        })
    }
}

fn encoded(frame: Result<String, CodecError>) -> SessionAction {
    match frame {
        Ok(frame) => SessionAction::Send(frame),
        Err(e) => SessionAction::Fatal(e.into()),
    }
}

fn encoded_after(delay: Duration, frame: Result<String, CodecError>) -> SessionAction {
    match frame {
        Ok(frame) => SessionAction::SendAfter { delay, frame },
        Err(e) => SessionAction::Fatal(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> SessionConfig {
        SessionConfig {
            token: "token".to_string(),
            intents: Intents::GUILDS | Intents::GUILD_MESSAGES,
            shard: None,
            large_threshold: 250,
            properties: IdentifyProperties::new(),
            presence: None,
            resume_window: Duration::from_secs(120),
            reconnect: ReconnectConfig {
                base: Duration::from_secs(1),
                max: Duration::from_secs(60),
                stable_window: Duration::from_secs(60),
            },
        }
    }

    fn machine() -> SessionMachine {
        SessionMachine::new(config()).with_seed(42)
    }

    fn sent(actions: &[SessionAction]) -> Vec<Envelope> {
        actions
            .iter()
            .filter_map(|a| match a {
                SessionAction::Send(frame) | SessionAction::SendAfter { frame, .. } => {
                    Some(Envelope::decode(frame).unwrap())
                }
                _ => None,
            })
            .collect()
    }

    fn ready(session_id: &str) -> Envelope {
        Envelope::dispatch(
            "READY",
            1,
            json!({"session_id": session_id, "user": {"id": "1"}, "guilds": []}),
        )
    }

    /// Drive a fresh machine to Connected with one committed dispatch
    fn connected(now: Instant) -> SessionMachine {
        let mut m = machine();
        m.connecting();
        m.transport_open();
        m.handle(Envelope::hello(41_250), now);
        m.handle(ready("abc"), now);
        m.commit_sequence(1);
        m
    }

    #[test]
    fn test_hello_without_session_identifies() {
        let now = Instant::now();
        let mut m = machine();
        m.connecting();
        assert_eq!(m.state(), ConnectionState::Connecting);
        m.transport_open();
        assert_eq!(m.state(), ConnectionState::WaitingForHello);

        let actions = m.handle(Envelope::hello(41_250), now);
        let frames = sent(&actions);

        assert_eq!(m.state(), ConnectionState::Identifying);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].op, OpCode::Identify);
        let d = frames[0].d.as_ref().unwrap();
        assert_eq!(d["token"], "token");
        assert_eq!(d["large_threshold"], 250);
        assert!(d["properties"]["os"].is_string());

        let deadline = m.heartbeat_deadline().unwrap();
        assert!(deadline >= now && deadline < now + Duration::from_millis(41_250));
    }

    #[test]
    fn test_ready_connects_and_creates_session() {
        let now = Instant::now();
        let m = connected(now);
        assert_eq!(m.state(), ConnectionState::Connected);
        assert_eq!(m.session_id(), Some("abc"));
        assert_eq!(m.sequence(), Some(1));
    }

    #[test]
    fn test_ready_yields_dispatch() {
        let now = Instant::now();
        let mut m = machine();
        m.connecting();
        m.transport_open();
        m.handle(Envelope::hello(41_250), now);
        let actions = m.handle(ready("abc"), now);

        assert_eq!(actions.len(), 1);
        match &actions[0] {
            SessionAction::Dispatch {
                event_type,
                sequence,
                ..
            } => {
                assert_eq!(event_type, "READY");
                assert_eq!(*sequence, Some(1));
            }
            other => panic!("unexpected action {other:?}"),
        }
    }

    #[test]
    fn test_drop_then_resume_with_last_sequence() {
        let now = Instant::now();
        let mut m = connected(now);

        let actions = m.disconnected(Some(1006), now);
        assert!(matches!(
            actions[0],
            SessionAction::Notify(Lifecycle::ConnectionLost)
        ));
        assert!(matches!(actions[1], SessionAction::Reconnect { .. }));
        assert_eq!(m.state(), ConnectionState::Reconnecting);

        m.connecting();
        m.transport_open();
        let frames = sent(&m.handle(Envelope::hello(41_250), now + Duration::from_secs(2)));

        assert_eq!(m.state(), ConnectionState::Resuming);
        assert_eq!(frames[0].op, OpCode::Resume);
        let d = frames[0].d.as_ref().unwrap();
        assert_eq!(d["session_id"], "abc");
        assert_eq!(d["seq"], 1);
    }

    #[test]
    fn test_first_replayed_dispatch_completes_resume() {
        let now = Instant::now();
        let mut m = connected(now);
        m.disconnected(None, now);
        m.connecting();
        m.transport_open();
        m.handle(Envelope::hello(41_250), now);

        let actions = m.handle(
            Envelope::dispatch("MESSAGE_CREATE", 2, json!({})),
            now + Duration::from_secs(1),
        );

        assert_eq!(m.state(), ConnectionState::Connected);
        assert!(matches!(actions[0], SessionAction::Notify(Lifecycle::Resumed)));
        assert!(matches!(
            actions[1],
            SessionAction::Dispatch {
                sequence: Some(2),
                ..
            }
        ));
    }

    #[test]
    fn test_resume_window_elapsed_identifies() {
        let now = Instant::now();
        let mut m = connected(now);
        m.disconnected(None, now);
        m.connecting();
        m.transport_open();

        let later = now + Duration::from_secs(121);
        assert!(!m.is_resumable(later));
        let frames = sent(&m.handle(Envelope::hello(41_250), later));
        assert_eq!(frames[0].op, OpCode::Identify);
        assert!(m.session().is_none());
    }

    #[test]
    fn test_ready_after_earlier_session_notifies_reconnected() {
        let now = Instant::now();
        let mut m = connected(now);
        m.disconnected(Some(CloseCode::SessionTimeout.as_u16()), now);
        assert!(m.session().is_none());

        m.connecting();
        m.transport_open();
        let frames = sent(&m.handle(Envelope::hello(41_250), now));
        assert_eq!(frames[0].op, OpCode::Identify);

        let actions = m.handle(ready("def"), now);
        assert!(matches!(actions[0], SessionAction::Dispatch { .. }));
        assert!(matches!(
            actions[1],
            SessionAction::Notify(Lifecycle::Reconnected)
        ));
        assert_eq!(m.session_id(), Some("def"));
    }

    #[test]
    fn test_fatal_close_is_terminal() {
        let now = Instant::now();
        let mut m = connected(now);
        let actions = m.disconnected(Some(4004), now);

        assert!(matches!(
            actions.last(),
            Some(SessionAction::Fatal(GatewayError::AuthenticationFailed))
        ));
        assert_eq!(m.state(), ConnectionState::Disconnected);
        assert!(m.session().is_none());
        assert!(m.disconnected(None, now).is_empty());
    }

    #[test]
    fn test_invalid_session_while_identifying_waits_five_seconds() {
        let now = Instant::now();
        let mut m = machine();
        m.connecting();
        m.transport_open();
        m.handle(Envelope::hello(41_250), now);

        let actions = m.handle(Envelope::invalid_session(false), now);
        match &actions[0] {
            SessionAction::SendAfter { delay, frame } => {
                assert_eq!(*delay, Duration::from_secs(5));
                assert_eq!(Envelope::decode(frame).unwrap().op, OpCode::Identify);
            }
            other => panic!("unexpected action {other:?}"),
        }
    }

    #[test]
    fn test_invalid_session_not_resumable_discards_session() {
        let now = Instant::now();
        let mut m = connected(now);
        m.disconnected(None, now);
        m.connecting();
        m.transport_open();
        m.handle(Envelope::hello(41_250), now);
        assert_eq!(m.state(), ConnectionState::Resuming);

        let actions = m.handle(Envelope::invalid_session(false), now);
        match &actions[0] {
            SessionAction::SendAfter { delay, frame } => {
                assert!(*delay >= Duration::from_secs(1) && *delay <= Duration::from_secs(5));
                assert_eq!(Envelope::decode(frame).unwrap().op, OpCode::Identify);
            }
            other => panic!("unexpected action {other:?}"),
        }
        assert!(m.session().is_none());
        assert_eq!(m.state(), ConnectionState::Identifying);
    }

    #[test]
    fn test_invalid_session_resumable_retries_resume() {
        let now = Instant::now();
        let mut m = connected(now);
        m.disconnected(None, now);
        m.connecting();
        m.transport_open();
        m.handle(Envelope::hello(41_250), now);

        let frames = sent(&m.handle(Envelope::invalid_session(true), now));
        assert_eq!(frames[0].op, OpCode::Resume);
        assert_eq!(m.session_id(), Some("abc"));
    }

    #[test]
    fn test_heartbeat_carries_committed_sequence() {
        let now = Instant::now();
        let mut m = connected(now);
        m.commit_sequence(5);
        m.commit_sequence(3);

        let frames = sent(&m.heartbeat_tick(now));
        assert_eq!(frames[0].op, OpCode::Heartbeat);
        assert_eq!(frames[0].d, Some(json!(5)));
    }

    #[test]
    fn test_missing_ack_closes_with_heartbeat_code() {
        let now = Instant::now();
        let mut m = connected(now);

        m.heartbeat_tick(now);
        let actions = m.heartbeat_tick(now + Duration::from_millis(41_250));
        assert!(matches!(
            actions[0],
            SessionAction::Close(CloseCode::HeartbeatNotAnswered)
        ));

        // the session survives a zombie close
        m.disconnected(Some(CloseCode::HeartbeatNotAnswered.as_u16()), now);
        assert!(m.is_resumable(now));
    }

    #[test]
    fn test_server_heartbeat_request_answered_immediately() {
        let now = Instant::now();
        let mut m = connected(now);
        let deadline = m.heartbeat_deadline();

        let frames = sent(&m.handle(Envelope::decode(r#"{"op":1,"d":null}"#).unwrap(), now));
        assert_eq!(frames[0].op, OpCode::Heartbeat);
        assert_eq!(m.heartbeat_deadline(), deadline);
    }

    #[test]
    fn test_reconnect_op_closes_commanded() {
        let now = Instant::now();
        let mut m = connected(now);
        let actions = m.handle(Envelope::reconnect(), now);
        assert!(matches!(
            actions[0],
            SessionAction::Close(CloseCode::CommandedReconnect)
        ));
    }

    #[test]
    fn test_backoff_resets_after_stable_connection() {
        let now = Instant::now();
        let mut m = connected(now);

        m.disconnected(None, now);
        m.connect_failed();
        m.connect_failed();
        assert_eq!(m.backoff.attempt(), 3);

        m.connecting();
        m.transport_open();
        m.handle(Envelope::hello(41_250), now);
        m.handle(Envelope::dispatch("RESUMED", 2, json!({})), now);

        m.disconnected(None, now + Duration::from_secs(61));
        assert_eq!(m.backoff.attempt(), 1);
    }

    #[test]
    fn test_resume_url_used_when_resumable() {
        let now = Instant::now();
        let mut m = machine();
        m.connecting();
        m.transport_open();
        m.handle(Envelope::hello(41_250), now);
        m.handle(
            Envelope::dispatch(
                "READY",
                1,
                json!({"session_id": "abc", "resume_gateway_url": "wss://resume", "user": {"id": "1"}}),
            ),
            now,
        );
        m.disconnected(None, now);

        assert_eq!(m.connect_url("wss://default", now), "wss://resume");
        let later = now + Duration::from_secs(500);
        assert_eq!(m.connect_url("wss://default", later), "wss://default");
    }

    #[test]
    fn test_session_config_from_client_config() {
        let client = ClientConfig::new("t").with_shard(1, 4);
        let config = SessionConfig::from_client_config(&client);
        assert_eq!(config.shard, Some([1, 4]));

        let client = ClientConfig::new("t");
        assert_eq!(SessionConfig::from_client_config(&client).shard, None);
    }
}
