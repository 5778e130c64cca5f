//! Shared state handed to every packet handler unit

use crate::broadcast::EventDispatcher;
use crate::events::Event;
use concord_core::{Entity, EntityCache, ObjectKind, ObjectRef, Snowflake};
use serde_json::Value;
use std::sync::Arc;

/// Cache and dispatcher access for handler units
#[derive(Clone)]
pub struct HandlerContext {
    cache: Arc<dyn EntityCache>,
    dispatcher: Arc<EventDispatcher>,
}

impl HandlerContext {
    #[must_use]
    pub fn new(cache: Arc<dyn EntityCache>, dispatcher: Arc<EventDispatcher>) -> Self {
        Self { cache, dispatcher }
    }

    pub fn cache(&self) -> &dyn EntityCache {
        self.cache.as_ref()
    }

    pub fn dispatcher(&self) -> &Arc<EventDispatcher> {
        &self.dispatcher
    }

    /// Hand an event to the dispatcher
    pub fn emit(&self, event: Event, targets: &[ObjectRef]) -> usize {
        self.dispatcher.dispatch(event, targets)
    }

    /// Drop listeners bound to a deleted object
    pub fn remove_object_listeners(&self, target: ObjectRef) -> usize {
        self.dispatcher.registry().remove_object_listeners(target)
    }

    pub fn cached(&self, kind: ObjectKind, id: Snowflake) -> Option<Entity> {
        self.cache.get(kind, id)
    }

    /// Refresh the cache from a nested object payload (`{"id": ..}`)
    ///
    /// Returns `None` when the payload is absent or carries no usable id.
    pub fn upsert_nested(&self, kind: ObjectKind, raw: Option<&Value>) -> Option<Entity> {
        let raw = raw.filter(|v| v.is_object())?;
        let id = raw
            .get("id")
            .and_then(|id| serde_json::from_value::<Snowflake>(id.clone()).ok())?;
        Some(self.cache.upsert(kind, id, raw.clone()))
    }

    /// Cached user, falling back to a nested user object in the payload
    pub fn user(&self, id: Snowflake, raw: Option<&Value>) -> Option<Entity> {
        match raw {
            Some(raw) => self.cache.get_or_create(ObjectKind::User, id, raw),
            None => self.cache.get(ObjectKind::User, id),
        }
    }

    /// Server reference plus its cached entity
    pub fn server(&self, id: Option<Snowflake>) -> (Option<ObjectRef>, Option<Entity>) {
        match id {
            Some(id) => (
                Some(ObjectRef::server(id)),
                self.cache.get(ObjectKind::Server, id),
            ),
            None => (None, None),
        }
    }

    /// Reference to a channel under its most specific known kind
    ///
    /// Uncached channels are assumed to be text channels of a server when a
    /// server id is known, and private channels otherwise.
    pub fn channel_ref(&self, id: Snowflake, server_id: Option<Snowflake>) -> ObjectRef {
        match self.cache.get(ObjectKind::Channel, id) {
            Some(entity) => entity.reference(),
            None if server_id.is_some() => ObjectRef::new(ObjectKind::ServerTextChannel, id),
            None => ObjectRef::new(ObjectKind::PrivateChannel, id),
        }
    }
}

/// Collect the present references into a target list
pub(crate) fn targets<const N: usize>(refs: [Option<ObjectRef>; N]) -> Vec<ObjectRef> {
    refs.into_iter().flatten().collect()
}
