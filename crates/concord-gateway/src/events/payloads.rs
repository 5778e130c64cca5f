//! Event payload definitions
//!
//! Each dispatch event type decodes into one of these structs. Wire fields
//! are deserialized from the `d` payload (unknown keys ignored); the entity
//! fields are `#[serde(skip)]` and filled from the cache by the handler.
//! A failed cache lookup leaves an entity field `None`.

use crate::protocol::Status;
use concord_core::{Entity, ObjectKind, RestClient, RestMethod, RestResult, Snowflake};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Deserialize `{ "id": ..., ... }` into just the id
fn nested_id<'de, D>(deserializer: D) -> Result<Snowflake, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct IdOnly {
        id: Snowflake,
    }
    IdOnly::deserialize(deserializer).map(|o| o.id)
}

fn opt_nested_id<'de, D>(deserializer: D) -> Result<Option<Snowflake>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct IdOnly {
        id: Snowflake,
    }
    Option::<IdOnly>::deserialize(deserializer).map(|o| o.map(|o| o.id))
}

// === Connection Events ===

/// READY event payload
#[derive(Debug, Clone, Deserialize)]
pub struct ReadyEvent {
    /// Session ID for resuming
    pub session_id: String,

    /// Gateway URL to use when resuming
    #[serde(default)]
    pub resume_gateway_url: Option<String>,

    #[serde(rename = "user", deserialize_with = "nested_id")]
    pub user_id: Snowflake,

    /// Servers of the session, initially unavailable
    #[serde(rename = "guilds", default)]
    pub servers: Vec<UnavailableServer>,

    /// The connected account
    #[serde(skip)]
    pub user: Option<Entity>,
}

/// Server stub in READY
#[derive(Debug, Clone, Deserialize)]
pub struct UnavailableServer {
    pub id: Snowflake,
    #[serde(default)]
    pub unavailable: bool,
}

// === Server Events ===

/// Server became available, was joined, left, or went unavailable
#[derive(Debug, Clone, Deserialize)]
pub struct ServerEvent {
    #[serde(rename = "id")]
    pub server_id: Snowflake,

    #[serde(default)]
    pub unavailable: bool,

    #[serde(skip)]
    pub server: Option<Entity>,
}

/// GUILD_UPDATE
#[derive(Debug, Clone, Deserialize)]
pub struct ServerChangeEvent {
    #[serde(rename = "id")]
    pub server_id: Snowflake,

    #[serde(skip)]
    pub server: Option<Entity>,

    /// Cached state before the update
    #[serde(skip)]
    pub old: Option<Entity>,
}

/// GUILD_BAN_ADD / GUILD_BAN_REMOVE
#[derive(Debug, Clone, Deserialize)]
pub struct BanEvent {
    #[serde(rename = "guild_id")]
    pub server_id: Snowflake,

    #[serde(rename = "user", deserialize_with = "nested_id")]
    pub user_id: Snowflake,

    #[serde(skip)]
    pub server: Option<Entity>,

    #[serde(skip)]
    pub user: Option<Entity>,
}

// === Member Events ===

/// GUILD_MEMBER_ADD / GUILD_MEMBER_REMOVE
#[derive(Debug, Clone, Deserialize)]
pub struct MemberEvent {
    #[serde(rename = "guild_id")]
    pub server_id: Snowflake,

    #[serde(rename = "user", deserialize_with = "nested_id")]
    pub user_id: Snowflake,

    #[serde(skip)]
    pub server: Option<Entity>,

    #[serde(skip)]
    pub user: Option<Entity>,
}

/// GUILD_MEMBER_UPDATE
#[derive(Debug, Clone, Deserialize)]
pub struct MemberChangeEvent {
    #[serde(rename = "guild_id")]
    pub server_id: Snowflake,

    #[serde(rename = "user", deserialize_with = "nested_id")]
    pub user_id: Snowflake,

    #[serde(default)]
    pub nick: Option<String>,

    #[serde(default)]
    pub roles: Vec<Snowflake>,

    #[serde(skip)]
    pub server: Option<Entity>,

    #[serde(skip)]
    pub user: Option<Entity>,

    #[serde(skip)]
    pub old: Option<Entity>,
}

// === Role Events ===

/// GUILD_ROLE_CREATE
#[derive(Debug, Clone, Deserialize)]
pub struct RoleEvent {
    #[serde(rename = "guild_id")]
    pub server_id: Snowflake,

    #[serde(rename = "role", deserialize_with = "nested_id")]
    pub role_id: Snowflake,

    #[serde(skip)]
    pub server: Option<Entity>,

    #[serde(skip)]
    pub role: Option<Entity>,
}

/// GUILD_ROLE_UPDATE
#[derive(Debug, Clone, Deserialize)]
pub struct RoleChangeEvent {
    #[serde(rename = "guild_id")]
    pub server_id: Snowflake,

    #[serde(rename = "role", deserialize_with = "nested_id")]
    pub role_id: Snowflake,

    #[serde(skip)]
    pub server: Option<Entity>,

    #[serde(skip)]
    pub role: Option<Entity>,

    #[serde(skip)]
    pub old: Option<Entity>,
}

/// GUILD_ROLE_DELETE
#[derive(Debug, Clone, Deserialize)]
pub struct RoleDeleteEvent {
    #[serde(rename = "guild_id")]
    pub server_id: Snowflake,

    pub role_id: Snowflake,

    #[serde(skip)]
    pub server: Option<Entity>,

    /// Last cached state of the deleted role
    #[serde(skip)]
    pub role: Option<Entity>,
}

// === Channel Events ===

/// CHANNEL_CREATE / CHANNEL_DELETE
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelEvent {
    #[serde(rename = "id")]
    pub channel_id: Snowflake,

    #[serde(rename = "type", default)]
    pub channel_type: u8,

    #[serde(rename = "guild_id", default)]
    pub server_id: Option<Snowflake>,

    #[serde(skip)]
    pub channel: Option<Entity>,

    #[serde(skip)]
    pub server: Option<Entity>,
}

impl ChannelEvent {
    /// Concrete kind of the channel
    pub fn kind(&self) -> ObjectKind {
        ObjectKind::from_channel_type(self.channel_type)
    }
}

/// CHANNEL_UPDATE
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelChangeEvent {
    #[serde(rename = "id")]
    pub channel_id: Snowflake,

    #[serde(rename = "type", default)]
    pub channel_type: u8,

    #[serde(rename = "guild_id", default)]
    pub server_id: Option<Snowflake>,

    #[serde(skip)]
    pub channel: Option<Entity>,

    #[serde(skip)]
    pub server: Option<Entity>,

    #[serde(skip)]
    pub old: Option<Entity>,
}

impl ChannelChangeEvent {
    pub fn kind(&self) -> ObjectKind {
        ObjectKind::from_channel_type(self.channel_type)
    }
}

/// CHANNEL_PINS_UPDATE
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelPinsUpdateEvent {
    pub channel_id: Snowflake,

    #[serde(rename = "guild_id", default)]
    pub server_id: Option<Snowflake>,

    #[serde(default)]
    pub last_pin_timestamp: Option<String>,

    #[serde(skip)]
    pub channel: Option<Entity>,
}

/// THREAD_MEMBERS_UPDATE
///
/// `member_count` is capped by the platform at 50 and only advisory.
#[derive(Debug, Clone, Deserialize)]
pub struct ThreadMembersUpdateEvent {
    #[serde(rename = "id")]
    pub thread_id: Snowflake,

    #[serde(rename = "guild_id")]
    pub server_id: Snowflake,

    #[serde(default)]
    pub member_count: u32,

    #[serde(default)]
    pub added_members: Vec<ThreadMember>,

    #[serde(default)]
    pub removed_member_ids: Vec<Snowflake>,

    #[serde(skip)]
    pub thread: Option<Entity>,
}

/// Member entry of a thread
#[derive(Debug, Clone, Deserialize)]
pub struct ThreadMember {
    #[serde(default)]
    pub user_id: Option<Snowflake>,
}

// === Message Events ===

/// MESSAGE_CREATE
#[derive(Debug, Clone, Deserialize)]
pub struct MessageEvent {
    #[serde(rename = "id")]
    pub message_id: Snowflake,

    pub channel_id: Snowflake,

    #[serde(rename = "guild_id", default)]
    pub server_id: Option<Snowflake>,

    #[serde(default)]
    pub content: String,

    #[serde(rename = "author", default, deserialize_with = "opt_nested_id")]
    pub author_id: Option<Snowflake>,

    #[serde(skip)]
    pub message: Option<Entity>,

    #[serde(skip)]
    pub channel: Option<Entity>,

    #[serde(skip)]
    pub author: Option<Entity>,
}

/// MESSAGE_UPDATE
///
/// Partial payload: only changed fields besides the ids.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageEditEvent {
    #[serde(rename = "id")]
    pub message_id: Snowflake,

    pub channel_id: Snowflake,

    #[serde(rename = "guild_id", default)]
    pub server_id: Option<Snowflake>,

    #[serde(default)]
    pub content: Option<String>,

    #[serde(skip)]
    pub message: Option<Entity>,

    #[serde(skip)]
    pub channel: Option<Entity>,

    #[serde(skip)]
    pub old: Option<Entity>,
}

/// MESSAGE_DELETE, also emitted once per id of MESSAGE_DELETE_BULK
#[derive(Debug, Clone, Deserialize)]
pub struct MessageDeleteEvent {
    #[serde(rename = "id")]
    pub message_id: Snowflake,

    pub channel_id: Snowflake,

    #[serde(rename = "guild_id", default)]
    pub server_id: Option<Snowflake>,

    /// Last cached state of the deleted message
    #[serde(skip)]
    pub message: Option<Entity>,

    #[serde(skip)]
    pub channel: Option<Entity>,
}

// === Reaction Events ===

/// Emoji of a reaction
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReactionEmoji {
    #[serde(default)]
    pub id: Option<Snowflake>,

    /// Unicode emoji, or the custom emoji's name
    #[serde(default)]
    pub name: Option<String>,
}

impl ReactionEmoji {
    /// Form used in REST paths: `name:id` for custom emojis, the unicode
    /// character otherwise
    pub fn api_name(&self) -> String {
        match (&self.name, self.id) {
            (Some(name), Some(id)) => format!("{name}:{id}"),
            (None, Some(id)) => format!("_:{id}"),
            (Some(name), None) => name.clone(),
            (None, None) => String::new(),
        }
    }
}

/// MESSAGE_REACTION_ADD / MESSAGE_REACTION_REMOVE
#[derive(Debug, Clone, Deserialize)]
pub struct ReactionEvent {
    pub user_id: Snowflake,

    pub channel_id: Snowflake,

    pub message_id: Snowflake,

    #[serde(rename = "guild_id", default)]
    pub server_id: Option<Snowflake>,

    pub emoji: ReactionEmoji,

    #[serde(skip)]
    pub user: Option<Entity>,

    #[serde(skip)]
    pub channel: Option<Entity>,

    #[serde(skip)]
    pub message: Option<Entity>,
}

impl ReactionEvent {
    /// Remove this user's reaction through the REST collaborator
    pub async fn remove(&self, rest: &dyn RestClient) -> RestResult<()> {
        let path = format!(
            "/channels/{}/messages/{}/reactions/{}/{}",
            self.channel_id,
            self.message_id,
            self.emoji.api_name(),
            self.user_id
        );
        rest.send(RestMethod::Delete, &path, None).await?;
        Ok(())
    }
}

/// MESSAGE_REACTION_REMOVE_ALL
#[derive(Debug, Clone, Deserialize)]
pub struct ReactionRemoveAllEvent {
    pub channel_id: Snowflake,

    pub message_id: Snowflake,

    #[serde(rename = "guild_id", default)]
    pub server_id: Option<Snowflake>,

    #[serde(skip)]
    pub channel: Option<Entity>,

    #[serde(skip)]
    pub message: Option<Entity>,
}

// === User Events ===

/// PRESENCE_UPDATE
#[derive(Debug, Clone, Deserialize)]
pub struct PresenceEvent {
    #[serde(rename = "user", deserialize_with = "nested_id")]
    pub user_id: Snowflake,

    #[serde(rename = "guild_id", default)]
    pub server_id: Option<Snowflake>,

    #[serde(default)]
    pub status: Status,

    #[serde(default)]
    pub activities: Vec<Value>,

    #[serde(skip)]
    pub user: Option<Entity>,
}

/// TYPING_START
#[derive(Debug, Clone, Deserialize)]
pub struct TypingEvent {
    pub channel_id: Snowflake,

    pub user_id: Snowflake,

    #[serde(rename = "guild_id", default)]
    pub server_id: Option<Snowflake>,

    /// Unix time in seconds
    #[serde(default)]
    pub timestamp: u64,

    #[serde(skip)]
    pub channel: Option<Entity>,

    #[serde(skip)]
    pub user: Option<Entity>,
}

/// USER_UPDATE (the connected account changed)
#[derive(Debug, Clone, Deserialize)]
pub struct UserChangeEvent {
    #[serde(rename = "id")]
    pub user_id: Snowflake,

    #[serde(skip)]
    pub user: Option<Entity>,

    #[serde(skip)]
    pub old: Option<Entity>,
}

/// WEBHOOKS_UPDATE
#[derive(Debug, Clone, Deserialize)]
pub struct WebhooksUpdateEvent {
    #[serde(rename = "guild_id")]
    pub server_id: Snowflake,

    pub channel_id: Snowflake,

    #[serde(skip)]
    pub server: Option<Entity>,

    #[serde(skip)]
    pub channel: Option<Entity>,
}
