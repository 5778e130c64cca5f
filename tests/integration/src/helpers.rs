//! Test helpers for integration tests
//!
//! [`FakeGateway`] hands out one [`ServerConn`] per connect attempt of the
//! client. Tests play the server through it: push envelopes, read what
//! the client sent, close or drop the connection.

use async_trait::async_trait;
use concord_common::{ClientConfig, ReconnectConfig};
use concord_core::{RestClient, RestError, RestMethod, RestResponse, RestResult};
use concord_gateway::protocol::{Envelope, OpCode};
use concord_gateway::transport::{CloseFrame, Connector, Frame, Transport, TransportError};
use concord_gateway::{Event, EventListener, GatewayClient};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// How long a helper waits before declaring the client stuck
pub const STEP_TIMEOUT: Duration = Duration::from_secs(120);

/// Gateway URL every test client is configured with
pub const TEST_GATEWAY_URL: &str = "wss://gateway.test";

// ============================================================================
// Fake gateway
// ============================================================================

/// What the client wrote to a connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientFrame {
    Text(String),
    Close(u16),
}

/// Server side of one client connection
pub struct ServerConn {
    pub url: String,
    to_client: mpsc::UnboundedSender<Frame>,
    from_client: mpsc::UnboundedReceiver<ClientFrame>,
}

impl ServerConn {
    pub fn send(&self, envelope: &Envelope) {
        let text = envelope.to_json().expect("envelope encodes");
        self.send_raw(text);
    }

    pub fn send_raw(&self, text: impl Into<String>) {
        // the client may already be gone; tests assert on what it saw
        let _ = self.to_client.send(Frame::Text(text.into()));
    }

    /// Close the connection with a close frame
    pub fn close(&self, code: u16) {
        let _ = self.to_client.send(Frame::Close(Some(CloseFrame {
            code,
            reason: String::new(),
        })));
    }

    /// Next frame the client wrote
    pub async fn recv(&mut self) -> Option<ClientFrame> {
        tokio::time::timeout(STEP_TIMEOUT, self.from_client.recv())
            .await
            .expect("client wrote nothing")
    }

    /// Next envelope with `op`, skipping heartbeats unless asked for
    pub async fn expect_op(&mut self, op: OpCode) -> Envelope {
        loop {
            match self.recv().await {
                Some(ClientFrame::Text(text)) => {
                    let envelope = Envelope::decode(&text).expect("client sent valid JSON");
                    if envelope.op == op {
                        return envelope;
                    }
                    assert_eq!(
                        envelope.op,
                        OpCode::Heartbeat,
                        "expected {op}, client sent {envelope}"
                    );
                }
                Some(ClientFrame::Close(code)) => panic!("expected {op}, client closed with {code}"),
                None => panic!("expected {op}, client dropped the connection"),
            }
        }
    }

    /// Wait for the client to close, skipping anything it sends first
    pub async fn expect_close(&mut self) -> u16 {
        loop {
            match self.recv().await {
                Some(ClientFrame::Close(code)) => return code,
                Some(ClientFrame::Text(_)) => continue,
                None => panic!("client dropped without a close frame"),
            }
        }
    }
}

/// Accepts the connections a client opens through its [`FakeConnector`]
pub struct FakeGateway {
    connections: mpsc::UnboundedReceiver<ServerConn>,
    connector: Arc<FakeConnector>,
}

impl FakeGateway {
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            connections: rx,
            connector: Arc::new(FakeConnector {
                connections: tx,
                refuse: AtomicUsize::new(0),
                attempts: AtomicUsize::new(0),
                stall_close: AtomicBool::new(false),
            }),
        }
    }

    pub fn connector(&self) -> Arc<FakeConnector> {
        Arc::clone(&self.connector)
    }

    /// Next connection the client opened
    pub async fn accept(&mut self) -> ServerConn {
        tokio::time::timeout(STEP_TIMEOUT, self.connections.recv())
            .await
            .expect("client did not connect")
            .expect("connector dropped")
    }

    /// Refuse the next `count` connect attempts
    pub fn refuse_next(&self, count: usize) {
        self.connector.refuse.store(count, Ordering::SeqCst);
    }

    pub fn attempts(&self) -> usize {
        self.connector.attempts.load(Ordering::SeqCst)
    }

    /// Connections opened from now on never finish a client close
    pub fn stall_closes(&self) {
        self.connector.stall_close.store(true, Ordering::SeqCst);
    }
}

impl Default for FakeGateway {
    fn default() -> Self {
        Self::new()
    }
}

pub struct FakeConnector {
    connections: mpsc::UnboundedSender<ServerConn>,
    refuse: AtomicUsize,
    attempts: AtomicUsize,
    stall_close: AtomicBool,
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn Transport>, TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let refused = self
            .refuse
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(TransportError::Connect("connection refused".to_string()));
        }

        let (to_client, incoming) = mpsc::unbounded_channel();
        let (outgoing, from_client) = mpsc::unbounded_channel();
        self.connections
            .send(ServerConn {
                url: url.to_string(),
                to_client,
                from_client,
            })
            .map_err(|_| TransportError::Connect("gateway gone".to_string()))?;

        Ok(Box::new(FakeTransport {
            incoming,
            outgoing,
            stall_close: self.stall_close.load(Ordering::SeqCst),
        }))
    }
}

struct FakeTransport {
    incoming: mpsc::UnboundedReceiver<Frame>,
    outgoing: mpsc::UnboundedSender<ClientFrame>,
    stall_close: bool,
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        self.outgoing
            .send(ClientFrame::Text(text))
            .map_err(|_| TransportError::Closed)
    }

    async fn next_frame(&mut self) -> Option<Result<Frame, TransportError>> {
        self.incoming.recv().await.map(Ok)
    }

    async fn close(&mut self, code: u16, _reason: &str) -> Result<(), TransportError> {
        self.outgoing
            .send(ClientFrame::Close(code))
            .map_err(|_| TransportError::Closed)?;
        if self.stall_close {
            // peer never completes the closing handshake
            std::future::pending::<()>().await;
        }
        Ok(())
    }
}

// ============================================================================
// REST
// ============================================================================

/// REST client that records calls and answers 204
#[derive(Default)]
pub struct RecordingRest {
    calls: Mutex<Vec<(RestMethod, String)>>,
}

impl RecordingRest {
    pub fn calls(&self) -> Vec<(RestMethod, String)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl RestClient for RecordingRest {
    async fn send(
        &self,
        method: RestMethod,
        path: &str,
        _body: Option<Value>,
    ) -> RestResult<RestResponse> {
        self.calls.lock().push((method, path.to_string()));
        Ok(RestResponse::new(204, Value::Null))
    }
}

/// REST client serving `GET /gateway/bot` after `failures` transient errors
pub struct FlakyDiscovery {
    failures: AtomicUsize,
    calls: AtomicUsize,
}

impl FlakyDiscovery {
    #[must_use]
    pub fn new(failures: usize) -> Self {
        Self {
            failures: AtomicUsize::new(failures),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RestClient for FlakyDiscovery {
    async fn send(
        &self,
        _method: RestMethod,
        path: &str,
        _body: Option<Value>,
    ) -> RestResult<RestResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(RestError::Request("connection reset".to_string()));
        }
        assert_eq!(path, "/gateway/bot");
        Ok(RestResponse::new(200, serde_json::json!({ "url": TEST_GATEWAY_URL })))
    }
}

// ============================================================================
// Client
// ============================================================================

/// Configuration with short reconnect delays and a fixed gateway URL
pub fn test_config() -> ClientConfig {
    ClientConfig::new("test-token")
        .with_gateway_url(TEST_GATEWAY_URL)
        .with_reconnect(ReconnectConfig {
            base: Duration::from_millis(100),
            max: Duration::from_secs(2),
            stable_window: Duration::from_secs(60),
        })
}

/// Client wired to `gateway`
pub fn test_client(gateway: &FakeGateway) -> GatewayClient {
    test_client_with(gateway, test_config())
}

pub fn test_client_with(gateway: &FakeGateway, config: ClientConfig) -> GatewayClient {
    GatewayClient::builder(config)
        .connector(gateway.connector())
        .rest_client(Arc::new(RecordingRest::default()))
        .build()
        .expect("test client builds")
}

// ============================================================================
// Listeners
// ============================================================================

/// Listener forwarding every event it gets into a channel
pub struct Collector {
    tx: mpsc::UnboundedSender<Arc<Event>>,
}

impl Collector {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Arc<Event>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl EventListener for Collector {
    async fn on_event(&self, event: Arc<Event>) -> anyhow::Result<()> {
        let _ = self.tx.send(event);
        Ok(())
    }
}

/// Next collected event, failing the test if none arrives
pub async fn next_event(rx: &mut mpsc::UnboundedReceiver<Arc<Event>>) -> Arc<Event> {
    tokio::time::timeout(STEP_TIMEOUT, rx.recv())
        .await
        .expect("no event delivered")
        .expect("collector dropped")
}
