//! Control payloads
//!
//! `d` of the non-dispatch ops: what the server sends on connect and what
//! the client sends to open, resume and steer a session.

use concord_core::{Intents, Snowflake};
use serde::{Deserialize, Serialize};

/// op 10, first frame on every connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloPayload {
    /// Milliseconds between heartbeats
    pub heartbeat_interval: u64,
}

impl HelloPayload {
    /// Used when a Hello arrives without a readable interval
    pub const DEFAULT_HEARTBEAT_INTERVAL: u64 = 41_250;
}

impl Default for HelloPayload {
    fn default() -> Self {
        Self {
            heartbeat_interval: Self::DEFAULT_HEARTBEAT_INTERVAL,
        }
    }
}

/// op 2, opens a fresh session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifyPayload {
    pub token: String,
    pub properties: IdentifyProperties,
    /// Frames are plain JSON, so this is always false
    #[serde(default)]
    pub compress: bool,
    pub large_threshold: u16,
    /// `[shard_id, shard_count]`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shard: Option<[u32; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence: Option<PresenceUpdatePayload>,
    pub intents: Intents,
}

/// What the client reports about itself in Identify
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifyProperties {
    pub os: String,
    /// Library name for bots
    pub browser: String,
    pub device: String,
}

impl IdentifyProperties {
    pub const LIBRARY_NAME: &'static str = "concord";

    #[must_use]
    pub fn new() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            browser: Self::LIBRARY_NAME.to_string(),
            device: Self::LIBRARY_NAME.to_string(),
        }
    }
}

impl Default for IdentifyProperties {
    fn default() -> Self {
        Self::new()
    }
}

/// Online status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Online,
    Idle,
    Dnd,
    Invisible,
    Offline,
}

/// Activity shown next to the status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub name: String,
    /// 0 playing, 1 streaming, 2 listening, 3 watching, 4 custom, 5 competing
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Activity {
    fn of_kind(kind: u8, name: impl Into<String>) -> Self {
        Activity {
            name: name.into(),
            kind,
            url: None,
        }
    }

    #[must_use]
    pub fn playing(name: impl Into<String>) -> Self {
        Self::of_kind(0, name)
    }

    /// Streaming needs a stream url to show as such
    #[must_use]
    pub fn streaming(name: impl Into<String>, url: impl Into<String>) -> Self {
        Activity {
            url: Some(url.into()),
            ..Self::of_kind(1, name)
        }
    }

    #[must_use]
    pub fn listening(name: impl Into<String>) -> Self {
        Self::of_kind(2, name)
    }

    #[must_use]
    pub fn watching(name: impl Into<String>) -> Self {
        Self::of_kind(3, name)
    }
}

/// op 3, also embedded in Identify
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceUpdatePayload {
    /// Unix millis since going idle
    pub since: Option<u64>,
    pub activities: Vec<Activity>,
    pub status: Status,
    pub afk: bool,
}

impl PresenceUpdatePayload {
    #[must_use]
    pub fn new(status: Status, activity: Option<Activity>) -> Self {
        PresenceUpdatePayload {
            since: None,
            activities: activity.into_iter().collect(),
            status,
            afk: false,
        }
    }
}

/// op 6, picks a dropped session back up
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumePayload {
    pub token: String,
    pub session_id: String,
    /// Last sequence handed to listeners
    pub seq: Option<u64>,
}

/// op 8
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestGuildMembersPayload {
    pub guild_id: Snowflake,
    /// Username prefix, empty for everyone
    pub query: String,
    /// 0 for no limit
    pub limit: u32,
    #[serde(default)]
    pub presences: bool,
    /// Echoed back in the member chunks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
}

impl RequestGuildMembersPayload {
    /// Every member of one server
    #[must_use]
    pub fn all(guild_id: Snowflake) -> Self {
        // simple() form is 32 chars, the nonce limit
        let nonce = uuid::Uuid::new_v4().simple().to_string();
        RequestGuildMembersPayload {
            guild_id,
            query: String::new(),
            limit: 0,
            presences: false,
            nonce: Some(nonce),
        }
    }
}

/// op 4
///
/// Only the gateway side of a voice connection; no voice transport follows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceStateUpdatePayload {
    pub guild_id: Snowflake,
    /// `None` leaves voice
    pub channel_id: Option<Snowflake>,
    pub self_mute: bool,
    pub self_deaf: bool,
}
