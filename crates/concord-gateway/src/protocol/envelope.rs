//! Gateway envelope codec
//!
//! Every frame in both directions is one JSON object `{op, s, t, d}`.
//! Decoding is lenient about what it does not know (extra keys, unknown op
//! codes) and strict about what it needs (a JSON object with an `op`).

use super::{
    HelloPayload, IdentifyPayload, OpCode, PresenceUpdatePayload, RequestGuildMembersPayload,
    ResumePayload, VoiceStateUpdatePayload,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Codec errors
#[derive(Debug, Error)]
pub enum CodecError {
    /// Frame is not a JSON envelope
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    /// Binary frame that is not UTF-8 text
    #[error("Binary frame is not valid UTF-8")]
    NotUtf8,

    /// Payload could not be serialized
    #[error("Failed to encode payload: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Gateway envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Operation code
    pub op: OpCode,

    /// Sequence number (only for op=0 Dispatch)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,

    /// Event type (only for op=0 Dispatch)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,

    /// Event data payload
    #[serde(default)]
    pub d: Option<Value>,
}

impl Envelope {
    /// Decode a text frame
    pub fn decode(raw: &str) -> Result<Self, CodecError> {
        serde_json::from_str(raw).map_err(|e| CodecError::MalformedFrame(e.to_string()))
    }

    /// Decode a binary frame carrying UTF-8 JSON
    pub fn decode_bytes(raw: &[u8]) -> Result<Self, CodecError> {
        let text = std::str::from_utf8(raw).map_err(|_| CodecError::NotUtf8)?;
        Self::decode(text)
    }

    /// Encode an outbound frame
    pub fn encode<T: Serialize>(op: OpCode, data: &T) -> Result<String, CodecError> {
        let d = serde_json::to_value(data).map_err(CodecError::Encode)?;
        Self {
            op,
            s: None,
            t: None,
            d: Some(d),
        }
        .to_json()
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, CodecError> {
        serde_json::to_string(self).map_err(CodecError::Encode)
    }

    // === Client Frames ===

    /// Heartbeat frame (op=1) carrying the last processed sequence
    pub fn heartbeat(last_sequence: Option<u64>) -> Result<String, CodecError> {
        Self::encode(OpCode::Heartbeat, &last_sequence)
    }

    /// Identify frame (op=2)
    pub fn identify(payload: &IdentifyPayload) -> Result<String, CodecError> {
        Self::encode(OpCode::Identify, payload)
    }

    /// Resume frame (op=6)
    pub fn resume(payload: &ResumePayload) -> Result<String, CodecError> {
        Self::encode(OpCode::Resume, payload)
    }

    /// Presence Update frame (op=3)
    pub fn presence_update(payload: &PresenceUpdatePayload) -> Result<String, CodecError> {
        Self::encode(OpCode::PresenceUpdate, payload)
    }

    /// Voice State Update frame (op=4)
    pub fn voice_state_update(payload: &VoiceStateUpdatePayload) -> Result<String, CodecError> {
        Self::encode(OpCode::VoiceStateUpdate, payload)
    }

    /// Request Guild Members frame (op=8)
    pub fn request_guild_members(
        payload: &RequestGuildMembersPayload,
    ) -> Result<String, CodecError> {
        Self::encode(OpCode::RequestGuildMembers, payload)
    }

    // === Server Frames ===

    /// Create a Dispatch envelope (op=0)
    #[must_use]
    pub fn dispatch(event_type: impl Into<String>, sequence: u64, data: Value) -> Self {
        Self {
            op: OpCode::Dispatch,
            s: Some(sequence),
            t: Some(event_type.into()),
            d: Some(data),
        }
    }

    /// Create a Hello envelope (op=10)
    #[must_use]
    pub fn hello(heartbeat_interval: u64) -> Self {
        Self::control(
            OpCode::Hello,
            serde_json::json!({ "heartbeat_interval": heartbeat_interval }),
        )
    }

    /// Create a Heartbeat ACK envelope (op=11)
    #[must_use]
    pub fn heartbeat_ack() -> Self {
        Self::control(OpCode::HeartbeatAck, Value::Null)
    }

    /// Create a Reconnect envelope (op=7)
    #[must_use]
    pub fn reconnect() -> Self {
        Self::control(OpCode::Reconnect, Value::Null)
    }

    /// Create an Invalid Session envelope (op=9)
    #[must_use]
    pub fn invalid_session(resumable: bool) -> Self {
        Self::control(OpCode::InvalidSession, Value::Bool(resumable))
    }

    fn control(op: OpCode, d: Value) -> Self {
        Self {
            op,
            s: None,
            t: None,
            d: if d.is_null() { None } else { Some(d) },
        }
    }

    // === Parsing ===

    /// Try to parse as a Hello payload (op=10)
    pub fn as_hello(&self) -> Option<HelloPayload> {
        if self.op != OpCode::Hello {
            return None;
        }
        self.d
            .as_ref()
            .and_then(|d| serde_json::from_value(d.clone()).ok())
    }

    /// Resumable flag of an Invalid Session (op=9); absent means false
    pub fn as_invalid_session(&self) -> Option<bool> {
        if self.op != OpCode::InvalidSession {
            return None;
        }
        Some(self.d.as_ref().and_then(Value::as_bool).unwrap_or(false))
    }

    /// Try to parse the heartbeat sequence number (op=1)
    pub fn as_heartbeat_seq(&self) -> Option<Option<u64>> {
        if self.op != OpCode::Heartbeat {
            return None;
        }
        Some(self.d.as_ref().and_then(Value::as_u64))
    }
}

impl std::fmt::Display for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(t) = &self.t {
            write!(f, "Envelope(op={}, t={}", self.op, t)?;
            if let Some(s) = self.s {
                write!(f, ", s={s}")?;
            }
            write!(f, ")")
        } else {
            write!(f, "Envelope(op={})", self.op)
        }
    }
}
