use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::value_objects::{ObjectKind, ObjectRef, Snowflake};

/// A cached platform object
///
/// The gateway does not model entity fields; an entity is its identity plus
/// the last raw payload seen for it. Cloning is cheap.
#[derive(Clone)]
pub struct Entity {
    reference: ObjectRef,
    raw: Arc<Value>,
    updated_at: DateTime<Utc>,
}

impl Entity {
    #[must_use]
    pub fn new(reference: ObjectRef, raw: Value) -> Self {
        Self {
            reference,
            raw: Arc::new(raw),
            updated_at: Utc::now(),
        }
    }

    pub fn reference(&self) -> ObjectRef {
        self.reference
    }

    pub fn kind(&self) -> ObjectKind {
        self.reference.kind
    }

    pub fn id(&self) -> Snowflake {
        self.reference.id
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Read a string field of the raw payload
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.raw.get(key).and_then(Value::as_str)
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("reference", &self.reference)
            .field("updated_at", &self.updated_at)
            .finish_non_exhaustive()
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.reference == other.reference && self.raw == other.raw
    }
}

/// Per-client entity cache
///
/// Snowflakes are unique across kinds, so implementations may key by id
/// alone; lookups under a broader kind (`Channel` for a
/// `ServerTextChannel`) must still hit.
pub trait EntityCache: Send + Sync {
    /// Return the cached entity, creating it from `raw` when absent.
    ///
    /// Returns `None` when `raw` cannot describe an entity (null or not an
    /// object); callers treat that as an absent optional field.
    fn get_or_create(&self, kind: ObjectKind, id: Snowflake, raw: &Value) -> Option<Entity>;

    /// Replace the cached payload, creating the entry if needed
    fn upsert(&self, kind: ObjectKind, id: Snowflake, raw: Value) -> Entity;

    /// Look up an entity whose kind is (or specializes) `kind`
    fn get(&self, kind: ObjectKind, id: Snowflake) -> Option<Entity>;

    /// Evict an entity
    fn remove(&self, kind: ObjectKind, id: Snowflake) -> Option<Entity>;

    /// Number of cached entities
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop everything (used when a session is replaced)
    fn clear(&self);
}
