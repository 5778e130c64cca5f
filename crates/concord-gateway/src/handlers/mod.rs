//! Packet handlers
//!
//! One decode unit per dispatch event type. Units are registered by name
//! into an immutable [`PacketHandlerRegistry`]; each unit decodes its
//! payload, materialises referenced entities through the cache, computes
//! dispatch targets and hands the event to the dispatcher.

mod channel;
mod connection;
mod context;
mod error;
mod member;
mod message;
mod reaction;
mod role;
mod server;
mod user;

pub use context::HandlerContext;
pub use error::{HandlerError, HandlerResult, PacketError};

use crate::events::GatewayEventType;
use serde_json::Value;
use std::collections::HashMap;

/// A packet handler unit
pub type PacketHandlerFn = fn(Value, &HandlerContext) -> HandlerResult<()>;

/// Immutable event type → handler map
pub struct PacketHandlerRegistry {
    handlers: HashMap<&'static str, PacketHandlerFn>,
}

impl PacketHandlerRegistry {
    #[must_use]
    pub fn builder() -> PacketHandlerRegistryBuilder {
        PacketHandlerRegistryBuilder {
            handlers: HashMap::new(),
        }
    }

    /// Registry with a unit for every known event type
    #[must_use]
    pub fn with_default_handlers() -> Self {
        Self::builder().with_default_handlers().build()
    }

    /// Route one dispatch payload to its unit
    pub fn handle(
        &self,
        event_type: &str,
        payload: Value,
        ctx: &HandlerContext,
    ) -> Result<(), PacketError> {
        let handler = self
            .handlers
            .get(event_type)
            .ok_or_else(|| PacketError::UnknownEventType(event_type.to_string()))?;

        handler(payload, ctx).map_err(|source| PacketError::Handler {
            event_type: event_type.to_string(),
            source,
        })
    }

    pub fn contains(&self, event_type: &str) -> bool {
        self.handlers.contains_key(event_type)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl Default for PacketHandlerRegistry {
    fn default() -> Self {
        Self::with_default_handlers()
    }
}

/// Builder for [`PacketHandlerRegistry`]
pub struct PacketHandlerRegistryBuilder {
    handlers: HashMap<&'static str, PacketHandlerFn>,
}

impl PacketHandlerRegistryBuilder {
    /// Register (or replace) the unit for `event_type`
    #[must_use]
    pub fn register(mut self, event_type: &'static str, handler: PacketHandlerFn) -> Self {
        self.handlers.insert(event_type, handler);
        self
    }

    fn register_type(self, event_type: GatewayEventType, handler: PacketHandlerFn) -> Self {
        self.register(event_type.as_str(), handler)
    }

    /// Register the built-in unit for every known event type
    #[must_use]
    pub fn with_default_handlers(self) -> Self {
        use GatewayEventType as T;

        self.register_type(T::Ready, connection::ready)
            .register_type(T::Resumed, connection::resumed)
            .register_type(T::GuildCreate, server::create)
            .register_type(T::GuildUpdate, server::update)
            .register_type(T::GuildDelete, server::delete)
            .register_type(T::GuildBanAdd, server::ban_add)
            .register_type(T::GuildBanRemove, server::ban_remove)
            .register_type(T::GuildMemberAdd, member::add)
            .register_type(T::GuildMemberUpdate, member::update)
            .register_type(T::GuildMemberRemove, member::remove)
            .register_type(T::GuildRoleCreate, role::create)
            .register_type(T::GuildRoleUpdate, role::update)
            .register_type(T::GuildRoleDelete, role::delete)
            .register_type(T::ChannelCreate, channel::create)
            .register_type(T::ChannelUpdate, channel::update)
            .register_type(T::ChannelDelete, channel::delete)
            .register_type(T::ChannelPinsUpdate, channel::pins_update)
            .register_type(T::ThreadMembersUpdate, channel::thread_members_update)
            .register_type(T::MessageCreate, message::create)
            .register_type(T::MessageUpdate, message::update)
            .register_type(T::MessageDelete, message::delete)
            .register_type(T::MessageDeleteBulk, message::delete_bulk)
            .register_type(T::MessageReactionAdd, reaction::add)
            .register_type(T::MessageReactionRemove, reaction::remove)
            .register_type(T::MessageReactionRemoveAll, reaction::remove_all)
            .register_type(T::PresenceUpdate, user::presence_update)
            .register_type(T::TypingStart, user::typing_start)
            .register_type(T::UserUpdate, user::update)
            .register_type(T::WebhooksUpdate, user::webhooks_update)
    }

    #[must_use]
    pub fn build(self) -> PacketHandlerRegistry {
        PacketHandlerRegistry {
            handlers: self.handlers,
        }
    }
}
