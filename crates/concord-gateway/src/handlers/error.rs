//! Handler error types

use thiserror::Error;

/// Error raised inside a single packet handler unit
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Payload did not match the event's layout
    #[error("Failed to decode payload: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Handler result type
pub type HandlerResult<T> = Result<T, HandlerError>;

/// Outcome of routing one dispatch frame
#[derive(Debug, Error)]
pub enum PacketError {
    /// No unit registered for this event type; skipped
    #[error("Unknown event type: {0}")]
    UnknownEventType(String),

    /// The unit rejected the payload; the frame is dropped
    #[error("Handler for {event_type} failed: {source}")]
    Handler {
        event_type: String,
        #[source]
        source: HandlerError,
    },
}

impl PacketError {
    pub fn is_unknown_event(&self) -> bool {
        matches!(self, Self::UnknownEventType(_))
    }
}
