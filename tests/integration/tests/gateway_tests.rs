//! Gateway session integration tests
//!
//! Each test drives a real `GatewayClient` against the in-process fake
//! gateway. Timer-heavy scenarios run on paused tokio time.
//!
//! Run with: cargo test -p integration-tests --test gateway_tests

use async_trait::async_trait;
use concord_core::{ObjectKind, ObjectRef, Snowflake};
use concord_gateway::protocol::{Envelope, OpCode};
use concord_gateway::{
    listener_fn, ConnectionState, Event, EventCategories, EventListener, GatewayClient,
    GatewayError, Status,
};
use integration_tests::*;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Start a client and complete Hello → Identify → READY (seq 1)
async fn connected_client(
    gateway: &mut FakeGateway,
) -> (
    concord_gateway::GatewayClient,
    ServerConn,
    tokio::sync::mpsc::UnboundedReceiver<Arc<Event>>,
) {
    let client = test_client(gateway);
    let (collector, mut events) = Collector::new();
    client.add_listener(EventCategories::ALL, collector);
    client.start().unwrap();

    let mut conn = gateway.accept().await;
    conn.send(&hello());
    conn.expect_op(OpCode::Identify).await;
    conn.send(&ready(1, "session-1", &[]));

    assert!(matches!(next_event(&mut events).await.as_ref(), Event::Ready(_)));
    (client, conn, events)
}

// ============================================================================
// Session lifecycle
// ============================================================================

#[tokio::test]
async fn test_identify_carries_token_and_intents() {
    let mut gateway = FakeGateway::new();
    let client = test_client(&gateway);
    client.start().unwrap();

    let mut conn = gateway.accept().await;
    assert_eq!(conn.url, format!("{TEST_GATEWAY_URL}/?v=10&encoding=json"));

    conn.send(&hello());
    let identify = conn.expect_op(OpCode::Identify).await;
    let d = identify.d.unwrap();
    assert_eq!(d["token"], "test-token");
    assert_eq!(d["intents"], client.config().intents.bits());
    assert!(d.get("shard").is_none());

    client.shutdown();
    client.run().await.unwrap();
}

#[tokio::test]
async fn test_session_resumes_and_replays_after_drop() {
    let mut gateway = FakeGateway::new();
    let (client, conn, mut events) = connected_client(&mut gateway).await;
    assert_eq!(client.session_id().as_deref(), Some("session-1"));

    drop(conn);
    assert!(matches!(
        next_event(&mut events).await.as_ref(),
        Event::ConnectionLost
    ));

    let mut conn = gateway.accept().await;
    assert!(conn.url.starts_with("wss://resume.gateway.test/"));
    conn.send(&hello());

    let resume = conn.expect_op(OpCode::Resume).await;
    let d = resume.d.unwrap();
    assert_eq!(d["token"], "test-token");
    assert_eq!(d["session_id"], "session-1");
    assert_eq!(d["seq"], 1);

    conn.send(&message_create(2, 100, 10, "replayed"));
    conn.send(&resumed(3));

    assert!(matches!(next_event(&mut events).await.as_ref(), Event::Resumed));
    match next_event(&mut events).await.as_ref() {
        Event::MessageCreate(message) => assert_eq!(message.content, "replayed"),
        other => panic!("unexpected event {other}"),
    }
    assert_eq!(client.state(), ConnectionState::Connected);
    assert_eq!(client.session_id().as_deref(), Some("session-1"));

    client.shutdown();
    client.run().await.unwrap();
}

#[tokio::test]
async fn test_commanded_reconnect_resumes() {
    let mut gateway = FakeGateway::new();
    let (client, mut conn, mut events) = connected_client(&mut gateway).await;

    conn.send(&Envelope::reconnect());
    assert_eq!(conn.expect_close().await, 4999);
    assert!(matches!(
        next_event(&mut events).await.as_ref(),
        Event::ConnectionLost
    ));

    let mut conn = gateway.accept().await;
    conn.send(&hello());
    conn.expect_op(OpCode::Resume).await;

    client.shutdown();
    client.run().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_unacknowledged_heartbeat_closes_and_resumes() {
    let mut gateway = FakeGateway::new();
    let (client, mut conn, mut events) = connected_client(&mut gateway).await;

    let beat = conn.expect_op(OpCode::Heartbeat).await;
    assert_eq!(beat.d, Some(json!(1)));

    // no ACK: the next tick finds the previous beat unanswered
    assert_eq!(conn.expect_close().await, 4998);
    assert!(matches!(
        next_event(&mut events).await.as_ref(),
        Event::ConnectionLost
    ));

    let mut conn = gateway.accept().await;
    conn.send(&hello());
    let resume = conn.expect_op(OpCode::Resume).await;
    assert_eq!(resume.d.unwrap()["seq"], 1);

    client.shutdown();
    client.run().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_zombie_detected_while_frames_keep_arriving() {
    let mut gateway = FakeGateway::new();
    let (client, mut conn, _events) = connected_client(&mut gateway).await;

    conn.expect_op(OpCode::Heartbeat).await;
    // a backlog of dispatches but never an ACK
    for seq in 2..2002 {
        conn.send(&unknown_event(seq));
    }
    assert_eq!(conn.expect_close().await, 4998);

    let mut conn = gateway.accept().await;
    conn.send(&hello());
    let resume = conn.expect_op(OpCode::Resume).await;
    assert_eq!(resume.d.unwrap()["seq"], 1);

    client.shutdown();
    client.run().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_acknowledged_heartbeats_keep_connection() {
    let mut gateway = FakeGateway::new();
    let (client, mut conn, _events) = connected_client(&mut gateway).await;

    for _ in 0..3 {
        conn.expect_op(OpCode::Heartbeat).await;
        conn.send(&Envelope::heartbeat_ack());
    }

    assert_eq!(client.state(), ConnectionState::Connected);
    assert_eq!(gateway.attempts(), 1);

    client.shutdown();
    client.run().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_invalid_session_reidentifies_and_notifies_reconnect() {
    let mut gateway = FakeGateway::new();
    let (client, conn, mut events) = connected_client(&mut gateway).await;

    drop(conn);
    assert!(matches!(
        next_event(&mut events).await.as_ref(),
        Event::ConnectionLost
    ));

    let mut conn = gateway.accept().await;
    conn.send(&hello());
    conn.expect_op(OpCode::Resume).await;

    conn.send(&Envelope::invalid_session(false));
    conn.expect_op(OpCode::Identify).await;
    conn.send(&ready(1, "session-2", &[]));

    assert!(matches!(next_event(&mut events).await.as_ref(), Event::Ready(_)));
    assert!(matches!(
        next_event(&mut events).await.as_ref(),
        Event::Reconnected
    ));
    assert_eq!(client.session_id().as_deref(), Some("session-2"));

    client.shutdown();
    client.run().await.unwrap();
}

#[tokio::test]
async fn test_fatal_close_stops_the_client() {
    let mut gateway = FakeGateway::new();
    let client = test_client(&gateway);
    client.start().unwrap();

    let mut conn = gateway.accept().await;
    conn.send(&hello());
    conn.expect_op(OpCode::Identify).await;
    conn.close(4004);

    let result = client.run().await;
    assert!(matches!(result, Err(GatewayError::AuthenticationFailed)));
    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert_eq!(gateway.attempts(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_refused_connections_are_retried() {
    let mut gateway = FakeGateway::new();
    gateway.refuse_next(3);
    let client = test_client(&gateway);
    client.start().unwrap();

    let mut conn = gateway.accept().await;
    assert_eq!(gateway.attempts(), 4);
    conn.send(&hello());
    conn.expect_op(OpCode::Identify).await;

    client.shutdown();
    client.run().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_transient_discovery_failures_are_retried() {
    let mut gateway = FakeGateway::new();
    let rest = Arc::new(FlakyDiscovery::new(2));
    let mut config = test_config();
    config.gateway_url = None;
    let client = GatewayClient::builder(config)
        .connector(gateway.connector())
        .rest_client(rest.clone())
        .build()
        .unwrap();
    client.start().unwrap();

    let mut conn = gateway.accept().await;
    assert_eq!(conn.url, format!("{TEST_GATEWAY_URL}/?v=10&encoding=json"));
    assert_eq!(rest.calls(), 3);
    conn.send(&hello());
    conn.expect_op(OpCode::Identify).await;

    // the discovered URL is kept for reconnects
    drop(conn);
    let mut conn = gateway.accept().await;
    conn.send(&hello());
    conn.expect_op(OpCode::Identify).await;
    assert_eq!(rest.calls(), 3);

    client.shutdown();
    client.run().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_zombie_connection_is_replaced_when_close_stalls() {
    let mut gateway = FakeGateway::new();
    gateway.stall_closes();
    let (client, mut conn, mut events) = connected_client(&mut gateway).await;

    conn.expect_op(OpCode::Heartbeat).await;
    assert_eq!(conn.expect_close().await, 4998);
    assert!(matches!(
        next_event(&mut events).await.as_ref(),
        Event::ConnectionLost
    ));

    let mut conn = gateway.accept().await;
    assert_eq!(gateway.attempts(), 2);
    conn.send(&hello());
    conn.expect_op(OpCode::Resume).await;

    // the shutdown close stalls as well and must not hang the driver
    client.shutdown();
    assert_eq!(conn.expect_close().await, 1000);
    client.run().await.unwrap();
    assert_eq!(client.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_state_changes_are_published() {
    let mut gateway = FakeGateway::new();
    let (client, conn, _events) = connected_client(&mut gateway).await;

    let mut states = client.state_changes();
    assert_eq!(*states.borrow_and_update(), ConnectionState::Connected);

    drop(conn);
    states
        .wait_for(|s| *s != ConnectionState::Connected)
        .await
        .unwrap();

    client.shutdown();
    client.run().await.unwrap();
    assert_eq!(client.state(), ConnectionState::Disconnected);
}

// ============================================================================
// Dispatch
// ============================================================================

#[tokio::test]
async fn test_unknown_event_type_is_skipped_without_committing() {
    let mut gateway = FakeGateway::new();
    let (client, mut conn, mut events) = connected_client(&mut gateway).await;

    conn.send(&unknown_event(2));
    conn.send(&message_create(3, 100, 10, "after unknown"));
    conn.send(&unknown_event(4));

    match next_event(&mut events).await.as_ref() {
        Event::MessageCreate(message) => assert_eq!(message.content, "after unknown"),
        other => panic!("unexpected event {other}"),
    }

    // the heartbeat answer carries the last handed-off sequence
    conn.send(&Envelope::decode(r#"{"op":1,"d":null}"#).unwrap());
    loop {
        let beat = conn.expect_op(OpCode::Heartbeat).await;
        assert_ne!(beat.d, Some(json!(4)));
        if beat.d == Some(json!(3)) {
            break;
        }
    }

    client.shutdown();
    client.run().await.unwrap();
}

#[tokio::test]
async fn test_malformed_frames_are_dropped() {
    let mut gateway = FakeGateway::new();
    let (client, mut conn, mut events) = connected_client(&mut gateway).await;

    conn.send_raw("{not json");
    conn.send_raw(r#"{"op":0,"s":2,"t":"MESSAGE_CREATE","d":{"content":"no ids"}}"#);
    conn.send(&message_create(3, 100, 10, "still alive"));

    match next_event(&mut events).await.as_ref() {
        Event::MessageCreate(message) => assert_eq!(message.content, "still alive"),
        other => panic!("unexpected event {other}"),
    }
    assert_eq!(client.state(), ConnectionState::Connected);

    client.shutdown();
    client.run().await.unwrap();
}

#[tokio::test]
async fn test_message_cache_respects_configured_capacity() {
    let mut gateway = FakeGateway::new();
    let config = test_config().with_message_cache(2, Duration::from_secs(3600));
    let client = test_client_with(&gateway, config);
    let (collector, mut events) = Collector::new();
    client.add_listener(EventCategories::MESSAGE_CREATE, collector);
    client.start().unwrap();

    let mut conn = gateway.accept().await;
    conn.send(&hello());
    conn.expect_op(OpCode::Identify).await;
    conn.send(&ready(1, "session-1", &[]));

    for seq in 2..6 {
        conn.send(&message_create(seq, seq * 100, 10, &format!("m{seq}")));
    }
    for _ in 2..6 {
        next_event(&mut events).await;
    }

    let cached = |id: u64| client.cache().get(ObjectKind::Message, Snowflake::new(id));
    assert!(cached(200).is_none());
    assert!(cached(300).is_none());
    assert_eq!(cached(500).unwrap().str_field("content"), Some("m5"));
    assert!(cached(400).is_some());

    client.shutdown();
    client.run().await.unwrap();
}

struct Panics;

#[async_trait]
impl EventListener for Panics {
    async fn on_event(&self, _event: Arc<Event>) -> anyhow::Result<()> {
        panic!("listener bug");
    }
}

#[tokio::test]
async fn test_failing_listeners_do_not_affect_others() {
    let mut gateway = FakeGateway::new();
    let (client, mut conn, _events) = connected_client(&mut gateway).await;

    let mut healthy = Vec::new();
    for i in 0..6 {
        if i % 2 == 0 {
            if i == 2 {
                client.add_listener(EventCategories::MESSAGE_CREATE, Panics);
            } else {
                client.add_listener(
                    EventCategories::MESSAGE_CREATE,
                    listener_fn("fails", |_event: Arc<Event>| async {
                        Err(anyhow::anyhow!("listener failed"))
                    }),
                );
            }
        } else {
            let (collector, rx) = Collector::new();
            client.add_listener(EventCategories::MESSAGE_CREATE, collector);
            healthy.push(rx);
        }
    }

    // every message is authored by user 5
    let author = ObjectRef::user(Snowflake::new(5));
    client.add_object_listener(EventCategories::MESSAGE_CREATE, author, Panics);
    let (collector, targeted) = Collector::new();
    client.add_object_listener(EventCategories::MESSAGE_CREATE, author, collector);
    healthy.push(targeted);

    for seq in 2..6 {
        conn.send(&message_create(seq, seq * 100, 10, &format!("m{seq}")));
    }

    for rx in &mut healthy {
        // per-listener order holds, so m5 arriving fourth rules out repeats of m2..m4
        for seq in 2..6 {
            match next_event(rx).await.as_ref() {
                Event::MessageCreate(message) => assert_eq!(message.content, format!("m{seq}")),
                other => panic!("unexpected event {other}"),
            }
        }
        assert!(rx.try_recv().is_err());
    }

    client.shutdown();
    client.run().await.unwrap();
}

#[tokio::test]
async fn test_events_reach_each_listener_in_order() {
    let mut gateway = FakeGateway::new();
    let (client, mut conn, _events) = connected_client(&mut gateway).await;

    let (first, mut first_rx) = Collector::new();
    let (second, mut second_rx) = Collector::new();
    client.add_listener(EventCategories::ALL_MESSAGES, first);
    client.add_listener(EventCategories::ALL_MESSAGES, second);

    for seq in 2..22 {
        conn.send(&message_create(seq, seq, 10, &seq.to_string()));
    }

    for rx in [&mut first_rx, &mut second_rx] {
        for seq in 2..22u64 {
            match next_event(rx).await.as_ref() {
                Event::MessageCreate(message) => {
                    assert_eq!(message.message_id, Snowflake::new(seq));
                }
                other => panic!("unexpected event {other}"),
            }
        }
    }

    client.shutdown();
    client.run().await.unwrap();
}

#[tokio::test]
async fn test_removal_is_idempotent() {
    let mut gateway = FakeGateway::new();
    let (client, mut conn, mut events) = connected_client(&mut gateway).await;

    let (removed, mut removed_rx) = Collector::new();
    let handle = client.add_listener(EventCategories::MESSAGE_CREATE, removed);

    let removals = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&removals);
    handle.add_removal_handler(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    handle.remove();
    handle.remove();
    assert!(handle.is_removed());
    assert_eq!(removals.load(Ordering::SeqCst), 1);

    conn.send(&message_create(2, 200, 10, "after removal"));
    assert!(matches!(
        next_event(&mut events).await.as_ref(),
        Event::MessageCreate(_)
    ));
    assert!(removed_rx.try_recv().is_err());

    client.shutdown();
    client.run().await.unwrap();
}

#[tokio::test]
async fn test_channel_delete_drops_channel_listeners() {
    let mut gateway = FakeGateway::new();
    let (client, mut conn, mut events) = connected_client(&mut gateway).await;

    conn.send(&server_create(2, 1, &[10, 11]));
    assert!(matches!(
        next_event(&mut events).await.as_ref(),
        Event::ServerJoin(_)
    ));

    let channel = ObjectRef::new(ObjectKind::ServerTextChannel, Snowflake::new(10));
    let (collector, mut channel_rx) = Collector::new();
    let handle = client.add_object_listener(EventCategories::ALL_MESSAGES, channel, collector);

    conn.send(&message_create(3, 300, 11, "other channel"));
    conn.send(&message_create(4, 301, 10, "this channel"));
    match next_event(&mut channel_rx).await.as_ref() {
        Event::MessageCreate(message) => assert_eq!(message.content, "this channel"),
        other => panic!("unexpected event {other}"),
    }

    conn.send(&channel_delete(5, 10, 1));
    loop {
        if matches!(next_event(&mut events).await.as_ref(), Event::ChannelDelete(_)) {
            break;
        }
    }
    assert!(handle.is_removed());
    assert_eq!(client.listeners().object_count(channel), 0);

    client.shutdown();
    client.run().await.unwrap();
}

// ============================================================================
// Commands
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_presence_update_is_sent_and_kept() {
    let mut gateway = FakeGateway::new();
    let (client, mut conn, _events) = connected_client(&mut gateway).await;

    client.update_presence(Status::Dnd, None).unwrap();
    let presence = conn.expect_op(OpCode::PresenceUpdate).await;
    assert_eq!(presence.d.unwrap()["status"], "dnd");

    // a later Identify carries the new presence
    conn.send(&Envelope::invalid_session(false));
    let identify = conn.expect_op(OpCode::Identify).await;
    assert_eq!(identify.d.unwrap()["presence"]["status"], "dnd");

    client.shutdown();
    client.run().await.unwrap();
}

#[tokio::test]
async fn test_member_request_requires_connection() {
    let mut gateway = FakeGateway::new();
    let client = test_client(&gateway);
    assert!(matches!(
        client.request_server_members(Snowflake::new(1)),
        Err(GatewayError::NotConnected)
    ));

    client.start().unwrap();
    let mut conn = gateway.accept().await;
    conn.send(&hello());
    conn.expect_op(OpCode::Identify).await;
    conn.send(&ready(1, "session-1", &[1]));

    let mut states = client.state_changes();
    states
        .wait_for(|s| *s == ConnectionState::Connected)
        .await
        .unwrap();

    client.request_server_members(Snowflake::new(1)).unwrap();
    let request = conn.expect_op(OpCode::RequestGuildMembers).await;
    assert_eq!(request.d.unwrap()["guild_id"], "1");

    client.shutdown();
    client.run().await.unwrap();
}

#[tokio::test]
async fn test_shutdown_closes_normally() {
    let mut gateway = FakeGateway::new();
    let (client, mut conn, _events) = connected_client(&mut gateway).await;

    client.shutdown();
    assert_eq!(conn.expect_close().await, 1000);
    client.run().await.unwrap();
    assert!(client.session_id().is_none());
    assert!(!client.dispatcher().is_accepting());
}
