//! Connection state

use serde::{Deserialize, Serialize};
use std::fmt;

/// Session connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ConnectionState {
    /// Not connected; initial and terminal state
    #[default]
    Disconnected,
    /// Opening the transport
    Connecting,
    /// Transport open, waiting for Hello
    WaitingForHello,
    /// Identify sent, waiting for READY
    Identifying,
    /// Session live, dispatches flowing
    Connected,
    /// Connection lost, waiting out the backoff
    Reconnecting,
    /// Resume sent, waiting for RESUMED or replayed dispatches
    Resuming,
}

impl ConnectionState {
    /// Transport is open (heartbeating may run)
    #[must_use]
    pub const fn is_live(self) -> bool {
        matches!(
            self,
            Self::WaitingForHello | Self::Identifying | Self::Connected | Self::Resuming
        )
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Disconnected => "Disconnected",
            Self::Connecting => "Connecting",
            Self::WaitingForHello => "WaitingForHello",
            Self::Identifying => "Identifying",
            Self::Connected => "Connected",
            Self::Reconnecting => "Reconnecting",
            Self::Resuming => "Resuming",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
