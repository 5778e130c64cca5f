//! WebSocket close codes
//!
//! A normal closure (1000) makes the server discard the session. The two
//! codes in the 49xx range are only ever sent by this client and keep the
//! session resumable.

use std::fmt;

macro_rules! close_codes {
    ($($variant:ident = $value:literal => $text:literal,)*) => {
        /// Close codes the gateway and this client use
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u16)]
        pub enum CloseCode {
            $($variant = $value,)*
        }

        impl CloseCode {
            /// Every known code, in numeric order
            pub const ALL: &'static [CloseCode] = &[$(CloseCode::$variant,)*];

            #[must_use]
            pub fn from_u16(value: u16) -> Option<Self> {
                match value {
                    $($value => Some(CloseCode::$variant),)*
                    _ => None,
                }
            }

            /// Human readable reason, also used as the close frame reason
            #[must_use]
            pub const fn description(self) -> &'static str {
                match self {
                    $(CloseCode::$variant => $text,)*
                }
            }

            #[must_use]
            pub const fn name(self) -> &'static str {
                match self {
                    $(CloseCode::$variant => stringify!($variant),)*
                }
            }
        }
    };
}

close_codes! {
    NormalClosure = 1000 => "Normal closure",
    UnknownError = 4000 => "Unknown error occurred",
    UnknownOpcode = 4001 => "Invalid opcode sent",
    DecodeError = 4002 => "Invalid payload sent",
    NotAuthenticated = 4003 => "Payload sent before identifying",
    AuthenticationFailed = 4004 => "Authentication failed",
    AlreadyAuthenticated = 4005 => "Identified more than once",
    InvalidSequence = 4007 => "Invalid resume sequence",
    RateLimited = 4008 => "Rate limited",
    SessionTimeout = 4009 => "Session timed out",
    InvalidShard = 4010 => "Invalid shard",
    ShardingRequired = 4011 => "Sharding required",
    InvalidApiVersion = 4012 => "Invalid gateway version",
    InvalidIntents = 4013 => "Invalid intents",
    DisallowedIntents = 4014 => "Disallowed intents",
    HeartbeatNotAnswered = 4998 => "Heartbeat not acknowledged",
    CommandedReconnect = 4999 => "Reconnect requested by server",
}

impl CloseCode {
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Retrying with the same token, shard and intents can never succeed
    #[must_use]
    pub const fn is_fatal(self) -> bool {
        matches!(
            self,
            CloseCode::AuthenticationFailed
                | CloseCode::InvalidShard
                | CloseCode::ShardingRequired
                | CloseCode::InvalidApiVersion
                | CloseCode::InvalidIntents
                | CloseCode::DisallowedIntents
        )
    }

    /// The next connection has to identify instead of resuming
    #[must_use]
    pub const fn invalidates_session(self) -> bool {
        matches!(
            self,
            CloseCode::NormalClosure | CloseCode::InvalidSequence | CloseCode::SessionTimeout
        )
    }
}

impl fmt::Display for CloseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.as_u16(), self.name(), self.description())
    }
}

impl From<CloseCode> for u16 {
    fn from(code: CloseCode) -> Self {
        code.as_u16()
    }
}
