//! Gateway operation codes
//!
//! Unrecognized codes decode to [`OpCode::Unknown`] so a newer server
//! never breaks frame decoding.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

macro_rules! op_codes {
    ($($(#[$doc:meta])* $variant:ident = $value:literal,)*) => {
        /// Gateway operation codes
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum OpCode {
            $($(#[$doc])* $variant,)*
            /// Anything else
            Unknown(u8),
        }

        impl OpCode {
            #[must_use]
            pub const fn from_u8(value: u8) -> Self {
                match value {
                    $($value => OpCode::$variant,)*
                    other => OpCode::Unknown(other),
                }
            }

            #[must_use]
            pub const fn as_u8(self) -> u8 {
                match self {
                    $(OpCode::$variant => $value,)*
                    OpCode::Unknown(value) => value,
                }
            }

            #[must_use]
            pub const fn name(self) -> &'static str {
                match self {
                    $(OpCode::$variant => stringify!($variant),)*
                    OpCode::Unknown(_) => "Unknown",
                }
            }
        }
    };
}

op_codes! {
    /// Event delivery, carries `s` and `t`
    Dispatch = 0,
    /// Sent both ways; the server may request one early
    Heartbeat = 1,
    Identify = 2,
    PresenceUpdate = 3,
    VoiceStateUpdate = 4,
    Resume = 6,
    /// Server asks for a resume on a fresh connection
    Reconnect = 7,
    RequestGuildMembers = 8,
    /// `d` says whether the session may be resumed
    InvalidSession = 9,
    /// First frame on every connection, carries the heartbeat interval
    Hello = 10,
    HeartbeatAck = 11,
}

impl OpCode {
    #[must_use]
    pub const fn is_known(self) -> bool {
        !matches!(self, OpCode::Unknown(_))
    }

    /// Ops this client is allowed to send
    #[must_use]
    pub const fn is_client_op(self) -> bool {
        matches!(
            self,
            OpCode::Heartbeat
                | OpCode::Identify
                | OpCode::PresenceUpdate
                | OpCode::VoiceStateUpdate
                | OpCode::Resume
                | OpCode::RequestGuildMembers
        )
    }
}

impl Serialize for OpCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for OpCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        u8::deserialize(deserializer).map(OpCode::from_u8)
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.as_u8())
    }
}
