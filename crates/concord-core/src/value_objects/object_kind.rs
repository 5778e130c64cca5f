//! Object kinds and their capability sets
//!
//! Listeners can be attached to a concrete object (a channel, a server, a
//! user). A text channel inside a server is at the same time a
//! "server text channel", a "server channel", a "text channel" and a
//! "channel"; a listener attached under any of those kinds must see events
//! for it. `ObjectKind::capabilities` is that set.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::Snowflake;

/// Kind of a platform object that can own listeners
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Server,
    Channel,
    TextChannel,
    VoiceChannel,
    PrivateChannel,
    ServerChannel,
    ServerTextChannel,
    ServerVoiceChannel,
    ServerThreadChannel,
    ChannelCategory,
    User,
    Message,
    Role,
    Emoji,
}

impl ObjectKind {
    /// Every kind this kind also is, most specific first (includes itself)
    pub fn capabilities(self) -> &'static [ObjectKind] {
        use ObjectKind::*;
        match self {
            Server => &[Server],
            Channel => &[Channel],
            TextChannel => &[TextChannel, Channel],
            VoiceChannel => &[VoiceChannel, Channel],
            PrivateChannel => &[PrivateChannel, TextChannel, Channel],
            ServerChannel => &[ServerChannel, Channel],
            ServerTextChannel => &[ServerTextChannel, ServerChannel, TextChannel, Channel],
            ServerVoiceChannel => &[ServerVoiceChannel, ServerChannel, VoiceChannel, Channel],
            ServerThreadChannel => &[
                ServerThreadChannel,
                ServerTextChannel,
                ServerChannel,
                TextChannel,
                Channel,
            ],
            ChannelCategory => &[ChannelCategory, ServerChannel, Channel],
            User => &[User],
            Message => &[Message],
            Role => &[Role],
            Emoji => &[Emoji],
        }
    }

    /// Check whether an object of this kind is also of `other` kind
    #[inline]
    pub fn is_a(self, other: ObjectKind) -> bool {
        self.capabilities().contains(&other)
    }

    /// Map a platform channel type number to the most specific kind
    ///
    /// Unknown channel types fall back to the generic server channel, so
    /// new channel types still reach `Channel` and `ServerChannel` listeners.
    pub fn from_channel_type(channel_type: u8) -> Self {
        match channel_type {
            0 | 5 => ObjectKind::ServerTextChannel,
            1 | 3 => ObjectKind::PrivateChannel,
            2 | 13 => ObjectKind::ServerVoiceChannel,
            4 => ObjectKind::ChannelCategory,
            10..=12 => ObjectKind::ServerThreadChannel,
            _ => ObjectKind::ServerChannel,
        }
    }

    /// Check if this kind is some kind of channel
    #[inline]
    pub fn is_channel(self) -> bool {
        self.is_a(ObjectKind::Channel)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Server => "Server",
            Self::Channel => "Channel",
            Self::TextChannel => "TextChannel",
            Self::VoiceChannel => "VoiceChannel",
            Self::PrivateChannel => "PrivateChannel",
            Self::ServerChannel => "ServerChannel",
            Self::ServerTextChannel => "ServerTextChannel",
            Self::ServerVoiceChannel => "ServerVoiceChannel",
            Self::ServerThreadChannel => "ServerThreadChannel",
            Self::ChannelCategory => "ChannelCategory",
            Self::User => "User",
            Self::Message => "Message",
            Self::Role => "Role",
            Self::Emoji => "Emoji",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Identity of a concrete object: its kind plus its snowflake
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    pub kind: ObjectKind,
    pub id: Snowflake,
}

impl ObjectRef {
    #[must_use]
    pub const fn new(kind: ObjectKind, id: Snowflake) -> Self {
        Self { kind, id }
    }

    #[must_use]
    pub const fn server(id: Snowflake) -> Self {
        Self::new(ObjectKind::Server, id)
    }

    #[must_use]
    pub const fn user(id: Snowflake) -> Self {
        Self::new(ObjectKind::User, id)
    }

    #[must_use]
    pub const fn message(id: Snowflake) -> Self {
        Self::new(ObjectKind::Message, id)
    }

    #[must_use]
    pub const fn role(id: Snowflake) -> Self {
        Self::new(ObjectKind::Role, id)
    }

    /// The same object viewed under each kind of its capability set
    pub fn views(self) -> impl Iterator<Item = ObjectRef> {
        self.kind
            .capabilities()
            .iter()
            .map(move |&kind| ObjectRef::new(kind, self.id))
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind, self.id)
    }
}
