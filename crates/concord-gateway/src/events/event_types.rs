//! Dispatch event names
//!
//! The `t` field of a dispatch envelope. Each name has exactly one built-in
//! packet handler unit.

use std::fmt;

macro_rules! event_types {
    ($($variant:ident => $wire:literal,)*) => {
        /// Dispatch event types with a built-in handler
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum GatewayEventType {
            $($variant,)*
        }

        impl GatewayEventType {
            /// Every event type, in registration order
            pub const ALL: &'static [GatewayEventType] = &[$(GatewayEventType::$variant,)*];

            /// Name as it appears on the wire
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(GatewayEventType::$variant => $wire,)*
                }
            }

            #[must_use]
            pub fn from_wire(name: &str) -> Option<Self> {
                match name {
                    $($wire => Some(GatewayEventType::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

event_types! {
    Ready => "READY",
    Resumed => "RESUMED",

    GuildCreate => "GUILD_CREATE",
    GuildUpdate => "GUILD_UPDATE",
    GuildDelete => "GUILD_DELETE",
    GuildBanAdd => "GUILD_BAN_ADD",
    GuildBanRemove => "GUILD_BAN_REMOVE",
    GuildMemberAdd => "GUILD_MEMBER_ADD",
    GuildMemberUpdate => "GUILD_MEMBER_UPDATE",
    GuildMemberRemove => "GUILD_MEMBER_REMOVE",
    GuildRoleCreate => "GUILD_ROLE_CREATE",
    GuildRoleUpdate => "GUILD_ROLE_UPDATE",
    GuildRoleDelete => "GUILD_ROLE_DELETE",

    ChannelCreate => "CHANNEL_CREATE",
    ChannelUpdate => "CHANNEL_UPDATE",
    ChannelDelete => "CHANNEL_DELETE",
    ChannelPinsUpdate => "CHANNEL_PINS_UPDATE",
    ThreadMembersUpdate => "THREAD_MEMBERS_UPDATE",

    MessageCreate => "MESSAGE_CREATE",
    MessageUpdate => "MESSAGE_UPDATE",
    MessageDelete => "MESSAGE_DELETE",
    MessageDeleteBulk => "MESSAGE_DELETE_BULK",
    MessageReactionAdd => "MESSAGE_REACTION_ADD",
    MessageReactionRemove => "MESSAGE_REACTION_REMOVE",
    MessageReactionRemoveAll => "MESSAGE_REACTION_REMOVE_ALL",

    PresenceUpdate => "PRESENCE_UPDATE",
    TypingStart => "TYPING_START",
    UserUpdate => "USER_UPDATE",
    WebhooksUpdate => "WEBHOOKS_UPDATE",
}

impl fmt::Display for GatewayEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
