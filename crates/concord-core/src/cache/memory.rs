//! In-memory entity cache backed by `DashMap`
//!
//! Messages are the only entities that keep arriving for the lifetime of a
//! session, so they are bounded: each channel keeps at most
//! `capacity` of them, oldest first out, and a message whose payload is
//! older than `max_age` is dropped on the next insert into its channel or
//! on lookup.

use std::collections::VecDeque;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use serde_json::Value;

use crate::traits::{Entity, EntityCache};
use crate::value_objects::{ObjectKind, ObjectRef, Snowflake};

/// Messages kept per channel by [`MemoryCache::new`]
pub const DEFAULT_MESSAGE_CAPACITY: usize = 50;

/// Message lifetime used by [`MemoryCache::new`]
pub const DEFAULT_MESSAGE_MAX_AGE: Duration = Duration::from_secs(12 * 60 * 60);

/// Concurrent in-memory cache, one per client
#[derive(Debug)]
pub struct MemoryCache {
    entities: DashMap<Snowflake, Entity>,
    /// Cached message ids per channel, oldest first
    messages: DashMap<Option<Snowflake>, VecDeque<Snowflake>>,
    message_capacity: usize,
    message_max_age: Option<chrono::Duration>,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::with_message_limits(DEFAULT_MESSAGE_CAPACITY, DEFAULT_MESSAGE_MAX_AGE)
    }
}

impl MemoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache keeping at most `capacity` messages per channel, none older
    /// than `max_age`
    ///
    /// A capacity of zero disables message caching; a zero `max_age`
    /// disables the age limit.
    #[must_use]
    pub fn with_message_limits(capacity: usize, max_age: Duration) -> Self {
        let message_max_age = if max_age.is_zero() {
            None
        } else {
            chrono::Duration::from_std(max_age).ok()
        };
        Self {
            entities: DashMap::new(),
            messages: DashMap::new(),
            message_capacity: capacity,
            message_max_age,
        }
    }

    /// Count cached entities that are (or specialize) `kind`
    pub fn count_of(&self, kind: ObjectKind) -> usize {
        self.entities
            .iter()
            .filter(|entry| entry.value().kind().is_a(kind))
            .count()
    }

    fn is_expired(&self, entity: &Entity) -> bool {
        entity.kind() == ObjectKind::Message
            && self
                .message_max_age
                .is_some_and(|max_age| Utc::now() - entity.updated_at() > max_age)
    }

    /// Store a message and evict what its channel no longer has room for
    fn insert_message(&self, id: Snowflake, entity: Entity) {
        if self.message_capacity == 0 {
            return;
        }
        let channel = entity
            .str_field("channel_id")
            .and_then(|raw| raw.parse::<Snowflake>().ok());
        let is_new = self.entities.insert(id, entity).is_none();

        let mut queue = self.messages.entry(channel).or_default();
        if is_new {
            queue.push_back(id);
        }

        let mut evicted = 0usize;
        while queue.len() > self.message_capacity {
            if let Some(oldest) = queue.pop_front() {
                self.entities.remove(&oldest);
                evicted += 1;
            }
        }
        while let Some(&oldest) = queue.front() {
            let stale = match self.entities.get(&oldest) {
                Some(entry) => self.is_expired(entry.value()),
                None => true,
            };
            if !stale {
                break;
            }
            queue.pop_front();
            self.entities.remove(&oldest);
            evicted += 1;
        }

        if evicted > 0 {
            tracing::trace!(channel = ?channel, evicted, kept = queue.len(), "Messages evicted");
        }
    }
}

impl EntityCache for MemoryCache {
    fn get_or_create(&self, kind: ObjectKind, id: Snowflake, raw: &Value) -> Option<Entity> {
        if let Some(existing) = self.get(kind, id) {
            return Some(existing);
        }
        if !raw.is_object() {
            return None;
        }
        if kind == ObjectKind::Message {
            let entity = Entity::new(ObjectRef::new(kind, id), raw.clone());
            self.insert_message(id, entity.clone());
            return Some(entity);
        }

        let entity = self
            .entities
            .entry(id)
            .or_insert_with(|| Entity::new(ObjectRef::new(kind, id), raw.clone()))
            .clone();
        Some(entity)
    }

    fn upsert(&self, kind: ObjectKind, id: Snowflake, raw: Value) -> Entity {
        let entity = Entity::new(ObjectRef::new(kind, id), raw);
        if kind == ObjectKind::Message {
            self.insert_message(id, entity.clone());
        } else {
            self.entities.insert(id, entity.clone());
        }
        entity
    }

    fn get(&self, kind: ObjectKind, id: Snowflake) -> Option<Entity> {
        let entity = self
            .entities
            .get(&id)
            .filter(|entry| entry.kind().is_a(kind))
            .map(|entry| entry.value().clone())?;
        if self.is_expired(&entity) {
            self.remove(ObjectKind::Message, id);
            return None;
        }
        Some(entity)
    }

    fn remove(&self, kind: ObjectKind, id: Snowflake) -> Option<Entity> {
        let (_, entity) = self
            .entities
            .remove_if(&id, |_, entity| entity.kind().is_a(kind))?;
        if entity.kind() == ObjectKind::Message {
            let channel = entity
                .str_field("channel_id")
                .and_then(|raw| raw.parse::<Snowflake>().ok());
            if let Some(mut queue) = self.messages.get_mut(&channel) {
                queue.retain(|cached| *cached != id);
            }
        }
        Some(entity)
    }

    fn len(&self) -> usize {
        self.entities.len()
    }

    fn clear(&self) {
        self.entities.clear();
        self.messages.clear();
        tracing::debug!("Entity cache cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_or_create_inserts_once() {
        let cache = MemoryCache::new();
        let id = Snowflake::new(10);

        let first = cache
            .get_or_create(ObjectKind::User, id, &json!({"username": "a"}))
            .unwrap();
        let second = cache
            .get_or_create(ObjectKind::User, id, &json!({"username": "b"}))
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(second.str_field("username"), Some("a"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_get_or_create_rejects_non_object() {
        let cache = MemoryCache::new();
        assert!(cache
            .get_or_create(ObjectKind::User, Snowflake::new(1), &Value::Null)
            .is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_lookup_under_broader_kind() {
        let cache = MemoryCache::new();
        let id = Snowflake::new(5);
        cache.upsert(ObjectKind::ServerTextChannel, id, json!({"name": "general"}));

        assert!(cache.get(ObjectKind::Channel, id).is_some());
        assert!(cache.get(ObjectKind::TextChannel, id).is_some());
        assert!(cache.get(ObjectKind::VoiceChannel, id).is_none());
        assert_eq!(cache.count_of(ObjectKind::Channel), 1);
        assert_eq!(cache.count_of(ObjectKind::User), 0);
    }

    #[test]
    fn test_upsert_replaces_payload() {
        let cache = MemoryCache::new();
        let id = Snowflake::new(5);
        cache.upsert(ObjectKind::Role, id, json!({"name": "old"}));
        cache.upsert(ObjectKind::Role, id, json!({"name": "new"}));

        let role = cache.get(ObjectKind::Role, id).unwrap();
        assert_eq!(role.str_field("name"), Some("new"));
    }

    fn message(channel: u64, content: &str) -> Value {
        json!({"channel_id": channel.to_string(), "content": content})
    }

    #[test]
    fn test_messages_bounded_per_channel() {
        let cache = MemoryCache::with_message_limits(3, DEFAULT_MESSAGE_MAX_AGE);
        for id in 1..=10 {
            cache.upsert(ObjectKind::Message, Snowflake::new(id), message(7, "a"));
        }
        cache.upsert(ObjectKind::Message, Snowflake::new(100), message(8, "b"));

        assert_eq!(cache.count_of(ObjectKind::Message), 4);
        assert!(cache.get(ObjectKind::Message, Snowflake::new(7)).is_none());
        for id in 8..=10 {
            assert!(cache.get(ObjectKind::Message, Snowflake::new(id)).is_some());
        }
        assert!(cache.get(ObjectKind::Message, Snowflake::new(100)).is_some());
    }

    #[test]
    fn test_message_edit_keeps_position() {
        let cache = MemoryCache::with_message_limits(2, DEFAULT_MESSAGE_MAX_AGE);
        cache.upsert(ObjectKind::Message, Snowflake::new(1), message(7, "first"));
        cache.upsert(ObjectKind::Message, Snowflake::new(2), message(7, "second"));
        cache.upsert(ObjectKind::Message, Snowflake::new(1), message(7, "edited"));
        assert_eq!(cache.count_of(ObjectKind::Message), 2);

        cache.upsert(ObjectKind::Message, Snowflake::new(3), message(7, "third"));
        assert!(cache.get(ObjectKind::Message, Snowflake::new(1)).is_none());
        assert_eq!(cache.count_of(ObjectKind::Message), 2);
    }

    #[test]
    fn test_removed_message_frees_its_slot() {
        let cache = MemoryCache::with_message_limits(2, DEFAULT_MESSAGE_MAX_AGE);
        cache.upsert(ObjectKind::Message, Snowflake::new(1), message(7, "a"));
        cache.upsert(ObjectKind::Message, Snowflake::new(2), message(7, "b"));
        cache.remove(ObjectKind::Message, Snowflake::new(2));
        cache.upsert(ObjectKind::Message, Snowflake::new(3), message(7, "c"));

        assert!(cache.get(ObjectKind::Message, Snowflake::new(1)).is_some());
        assert!(cache.get(ObjectKind::Message, Snowflake::new(3)).is_some());
    }

    #[test]
    fn test_expired_messages_dropped() {
        let cache = MemoryCache::with_message_limits(10, Duration::from_millis(1));
        cache.upsert(ObjectKind::Message, Snowflake::new(1), message(7, "old"));
        cache.upsert(ObjectKind::Message, Snowflake::new(2), message(8, "old"));
        std::thread::sleep(Duration::from_millis(20));

        cache.upsert(ObjectKind::Message, Snowflake::new(3), message(7, "new"));
        // evicted on insert into its channel
        assert!(!cache.entities.contains_key(&Snowflake::new(1)));
        // and on lookup elsewhere
        assert!(cache.get(ObjectKind::Message, Snowflake::new(2)).is_none());
        assert_eq!(cache.count_of(ObjectKind::Message), 1);
    }

    #[test]
    fn test_zero_capacity_disables_message_cache() {
        let cache = MemoryCache::with_message_limits(0, DEFAULT_MESSAGE_MAX_AGE);
        let entity = cache.upsert(ObjectKind::Message, Snowflake::new(1), message(7, "a"));
        assert_eq!(entity.str_field("content"), Some("a"));
        assert!(cache.get(ObjectKind::Message, Snowflake::new(1)).is_none());

        cache.upsert(ObjectKind::User, Snowflake::new(2), json!({"username": "u"}));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_remove_respects_kind() {
        let cache = MemoryCache::new();
        let id = Snowflake::new(5);
        cache.upsert(ObjectKind::ServerVoiceChannel, id, json!({}));

        assert!(cache.remove(ObjectKind::TextChannel, id).is_none());
        assert!(cache.remove(ObjectKind::Channel, id).is_some());
        assert!(cache.is_empty());
    }
}
