//! Gateway events
//!
//! Decoded dispatch events as handed to listeners, plus the connection
//! lifecycle events the session machine emits on its own.

mod categories;
mod event_types;
mod payloads;

pub use categories::EventCategories;
pub use event_types::GatewayEventType;
pub use payloads::{
    BanEvent, ChannelChangeEvent, ChannelEvent, ChannelPinsUpdateEvent, MemberChangeEvent,
    MemberEvent, MessageDeleteEvent, MessageEditEvent, MessageEvent, PresenceEvent,
    ReactionEmoji, ReactionEvent, ReactionRemoveAllEvent, ReadyEvent, RoleChangeEvent,
    RoleDeleteEvent, RoleEvent, ServerChangeEvent, ServerEvent, ThreadMember,
    ThreadMembersUpdateEvent, TypingEvent, UnavailableServer, UserChangeEvent,
    WebhooksUpdateEvent,
};

use std::fmt;

/// Session lifecycle notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    /// The live connection dropped; recovery follows
    ConnectionLost,
    /// An interrupted session was resumed without loss
    Resumed,
    /// A fresh session replaced an earlier one
    Reconnected,
}

impl Lifecycle {
    pub fn category(self) -> EventCategories {
        match self {
            Self::ConnectionLost => EventCategories::CONNECTION_LOST,
            Self::Resumed => EventCategories::RESUMED,
            Self::Reconnected => EventCategories::RECONNECTED,
        }
    }
}

/// An event delivered to listeners
#[derive(Debug, Clone)]
pub enum Event {
    // Lifecycle
    ConnectionLost,
    Resumed,
    Reconnected,
    Ready(ReadyEvent),

    // Servers
    ServerAvailable(ServerEvent),
    ServerJoin(ServerEvent),
    ServerChange(ServerChangeEvent),
    ServerLeave(ServerEvent),
    ServerUnavailable(ServerEvent),

    // Bans and members
    UserBan(BanEvent),
    UserUnban(BanEvent),
    MemberJoin(MemberEvent),
    MemberChange(MemberChangeEvent),
    MemberLeave(MemberEvent),

    // Roles
    RoleCreate(RoleEvent),
    RoleChange(RoleChangeEvent),
    RoleDelete(RoleDeleteEvent),

    // Channels
    ChannelCreate(ChannelEvent),
    ChannelChange(ChannelChangeEvent),
    ChannelDelete(ChannelEvent),
    ChannelPinsUpdate(ChannelPinsUpdateEvent),
    ThreadMembersUpdate(ThreadMembersUpdateEvent),

    // Messages
    MessageCreate(MessageEvent),
    MessageEdit(MessageEditEvent),
    MessageDelete(MessageDeleteEvent),

    // Reactions
    ReactionAdd(ReactionEvent),
    ReactionRemove(ReactionEvent),
    ReactionRemoveAll(ReactionRemoveAllEvent),

    // Users
    UserStatusChange(PresenceEvent),
    UserTyping(TypingEvent),
    UserChange(UserChangeEvent),
    WebhooksUpdate(WebhooksUpdateEvent),
}

impl From<Lifecycle> for Event {
    fn from(lifecycle: Lifecycle) -> Self {
        match lifecycle {
            Lifecycle::ConnectionLost => Event::ConnectionLost,
            Lifecycle::Resumed => Event::Resumed,
            Lifecycle::Reconnected => Event::Reconnected,
        }
    }
}

impl Event {
    /// The single category this event belongs to
    pub fn category(&self) -> EventCategories {
        match self {
            Self::ConnectionLost => EventCategories::CONNECTION_LOST,
            Self::Resumed => EventCategories::RESUMED,
            Self::Reconnected => EventCategories::RECONNECTED,
            Self::Ready(_) => EventCategories::READY,
            Self::ServerAvailable(_) => EventCategories::SERVER_AVAILABLE,
            Self::ServerJoin(_) => EventCategories::SERVER_JOIN,
            Self::ServerChange(_) => EventCategories::SERVER_CHANGE,
            Self::ServerLeave(_) => EventCategories::SERVER_LEAVE,
            Self::ServerUnavailable(_) => EventCategories::SERVER_UNAVAILABLE,
            Self::UserBan(_) => EventCategories::USER_BAN,
            Self::UserUnban(_) => EventCategories::USER_UNBAN,
            Self::MemberJoin(_) => EventCategories::MEMBER_JOIN,
            Self::MemberChange(_) => EventCategories::MEMBER_CHANGE,
            Self::MemberLeave(_) => EventCategories::MEMBER_LEAVE,
            Self::RoleCreate(_) => EventCategories::ROLE_CREATE,
            Self::RoleChange(_) => EventCategories::ROLE_CHANGE,
            Self::RoleDelete(_) => EventCategories::ROLE_DELETE,
            Self::ChannelCreate(_) => EventCategories::CHANNEL_CREATE,
            Self::ChannelChange(_) => EventCategories::CHANNEL_CHANGE,
            Self::ChannelDelete(_) => EventCategories::CHANNEL_DELETE,
            Self::ChannelPinsUpdate(_) => EventCategories::CHANNEL_PINS_UPDATE,
            Self::ThreadMembersUpdate(_) => EventCategories::THREAD_MEMBERS_UPDATE,
            Self::MessageCreate(_) => EventCategories::MESSAGE_CREATE,
            Self::MessageEdit(_) => EventCategories::MESSAGE_EDIT,
            Self::MessageDelete(_) => EventCategories::MESSAGE_DELETE,
            Self::ReactionAdd(_) => EventCategories::REACTION_ADD,
            Self::ReactionRemove(_) => EventCategories::REACTION_REMOVE,
            Self::ReactionRemoveAll(_) => EventCategories::REACTION_REMOVE_ALL,
            Self::UserStatusChange(_) => EventCategories::USER_STATUS_CHANGE,
            Self::UserTyping(_) => EventCategories::USER_TYPING,
            Self::UserChange(_) => EventCategories::USER_CHANGE,
            Self::WebhooksUpdate(_) => EventCategories::WEBHOOKS_UPDATE,
        }
    }

    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::ConnectionLost => "ConnectionLost",
            Self::Resumed => "Resumed",
            Self::Reconnected => "Reconnected",
            Self::Ready(_) => "Ready",
            Self::ServerAvailable(_) => "ServerAvailable",
            Self::ServerJoin(_) => "ServerJoin",
            Self::ServerChange(_) => "ServerChange",
            Self::ServerLeave(_) => "ServerLeave",
            Self::ServerUnavailable(_) => "ServerUnavailable",
            Self::UserBan(_) => "UserBan",
            Self::UserUnban(_) => "UserUnban",
            Self::MemberJoin(_) => "MemberJoin",
            Self::MemberChange(_) => "MemberChange",
            Self::MemberLeave(_) => "MemberLeave",
            Self::RoleCreate(_) => "RoleCreate",
            Self::RoleChange(_) => "RoleChange",
            Self::RoleDelete(_) => "RoleDelete",
            Self::ChannelCreate(_) => "ChannelCreate",
            Self::ChannelChange(_) => "ChannelChange",
            Self::ChannelDelete(_) => "ChannelDelete",
            Self::ChannelPinsUpdate(_) => "ChannelPinsUpdate",
            Self::ThreadMembersUpdate(_) => "ThreadMembersUpdate",
            Self::MessageCreate(_) => "MessageCreate",
            Self::MessageEdit(_) => "MessageEdit",
            Self::MessageDelete(_) => "MessageDelete",
            Self::ReactionAdd(_) => "ReactionAdd",
            Self::ReactionRemove(_) => "ReactionRemove",
            Self::ReactionRemoveAll(_) => "ReactionRemoveAll",
            Self::UserStatusChange(_) => "UserStatusChange",
            Self::UserTyping(_) => "UserTyping",
            Self::UserChange(_) => "UserChange",
            Self::WebhooksUpdate(_) => "WebhooksUpdate",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
