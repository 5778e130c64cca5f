//! Payload fixtures
//!
//! Builders for the server envelopes the scenarios replay. Only the fields
//! the client reads are filled in.

use concord_gateway::protocol::Envelope;
use serde_json::{json, Value};

/// Heartbeat interval announced by the fake gateway (41.25 s)
pub const HEARTBEAT_INTERVAL_MS: u64 = 41_250;

pub const BOT_USER_ID: u64 = 900;

pub fn hello() -> Envelope {
    Envelope::hello(HEARTBEAT_INTERVAL_MS)
}

pub fn ready(seq: u64, session_id: &str, servers: &[u64]) -> Envelope {
    let guilds: Vec<Value> = servers
        .iter()
        .map(|id| json!({"id": id.to_string(), "unavailable": true}))
        .collect();

    Envelope::dispatch(
        "READY",
        seq,
        json!({
            "v": 10,
            "session_id": session_id,
            "resume_gateway_url": "wss://resume.gateway.test",
            "user": {"id": BOT_USER_ID.to_string(), "username": "concord-bot"},
            "guilds": guilds,
        }),
    )
}

pub fn resumed(seq: u64) -> Envelope {
    Envelope::dispatch("RESUMED", seq, json!({}))
}

pub fn server_create(seq: u64, server_id: u64, channels: &[u64]) -> Envelope {
    let channels: Vec<Value> = channels
        .iter()
        .map(|id| json!({"id": id.to_string(), "type": 0, "name": format!("channel-{id}")}))
        .collect();

    Envelope::dispatch(
        "GUILD_CREATE",
        seq,
        json!({
            "id": server_id.to_string(),
            "name": format!("server-{server_id}"),
            "channels": channels,
            "roles": [],
            "members": [],
        }),
    )
}

pub fn message_create(seq: u64, message_id: u64, channel_id: u64, content: &str) -> Envelope {
    Envelope::dispatch(
        "MESSAGE_CREATE",
        seq,
        json!({
            "id": message_id.to_string(),
            "channel_id": channel_id.to_string(),
            "content": content,
            "author": {"id": "5", "username": "alice"},
        }),
    )
}

pub fn channel_delete(seq: u64, channel_id: u64, server_id: u64) -> Envelope {
    Envelope::dispatch(
        "CHANNEL_DELETE",
        seq,
        json!({
            "id": channel_id.to_string(),
            "type": 0,
            "guild_id": server_id.to_string(),
        }),
    )
}

/// Dispatch of an event type no handler knows
pub fn unknown_event(seq: u64) -> Envelope {
    Envelope::dispatch("SOME_FUTURE_EVENT", seq, json!({"anything": true}))
}
