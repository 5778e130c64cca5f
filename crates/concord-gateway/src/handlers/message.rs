//! Messages

use super::context::targets;
use super::{HandlerContext, HandlerResult};
use crate::events::{Event, MessageDeleteEvent, MessageEditEvent, MessageEvent};
use concord_core::{ObjectKind, ObjectRef, Snowflake};
use serde::Deserialize;
use serde_json::Value;

pub(super) fn create(payload: Value, ctx: &HandlerContext) -> HandlerResult<()> {
    let mut event: MessageEvent = serde_json::from_value(payload.clone())?;
    event.author = ctx.upsert_nested(ObjectKind::User, payload.get("author"));
    event.channel = ctx.cached(ObjectKind::Channel, event.channel_id);
    event.message = Some(
        ctx.cache()
            .upsert(ObjectKind::Message, event.message_id, payload),
    );

    let targets = targets([
        Some(ctx.channel_ref(event.channel_id, event.server_id)),
        event.server_id.map(ObjectRef::server),
        event.author_id.map(ObjectRef::user),
    ]);
    ctx.emit(Event::MessageCreate(event), &targets);
    Ok(())
}

/// Overlay the fields of a partial update onto the cached payload
fn merge(old: &Value, update: &Value) -> Value {
    match (old, update) {
        (Value::Object(old), Value::Object(fields)) => {
            let mut merged = old.clone();
            for (key, value) in fields {
                merged.insert(key.clone(), value.clone());
            }
            Value::Object(merged)
        }
        _ => update.clone(),
    }
}

pub(super) fn update(payload: Value, ctx: &HandlerContext) -> HandlerResult<()> {
    let mut event: MessageEditEvent = serde_json::from_value(payload.clone())?;
    event.channel = ctx.cached(ObjectKind::Channel, event.channel_id);
    event.old = ctx.cached(ObjectKind::Message, event.message_id);

    let raw = match &event.old {
        Some(old) => merge(old.raw(), &payload),
        None => payload,
    };
    event.message = Some(ctx.cache().upsert(ObjectKind::Message, event.message_id, raw));

    let targets = targets([
        Some(ctx.channel_ref(event.channel_id, event.server_id)),
        event.server_id.map(ObjectRef::server),
        Some(ObjectRef::message(event.message_id)),
    ]);
    ctx.emit(Event::MessageEdit(event), &targets);
    Ok(())
}

fn emit_delete(mut event: MessageDeleteEvent, ctx: &HandlerContext) {
    event.channel = ctx.cached(ObjectKind::Channel, event.channel_id);
    event.message = ctx.cache().remove(ObjectKind::Message, event.message_id);

    let message_ref = ObjectRef::message(event.message_id);
    let targets = targets([
        Some(ctx.channel_ref(event.channel_id, event.server_id)),
        event.server_id.map(ObjectRef::server),
        Some(message_ref),
    ]);
    ctx.emit(Event::MessageDelete(event), &targets);
    ctx.remove_object_listeners(message_ref);
}

pub(super) fn delete(payload: Value, ctx: &HandlerContext) -> HandlerResult<()> {
    let event: MessageDeleteEvent = serde_json::from_value(payload)?;
    emit_delete(event, ctx);
    Ok(())
}

#[derive(Deserialize)]
struct BulkDelete {
    ids: Vec<Snowflake>,
    channel_id: Snowflake,
    #[serde(default)]
    guild_id: Option<Snowflake>,
}

pub(super) fn delete_bulk(payload: Value, ctx: &HandlerContext) -> HandlerResult<()> {
    let bulk: BulkDelete = serde_json::from_value(payload)?;
    tracing::debug!(
        channel_id = %bulk.channel_id,
        count = bulk.ids.len(),
        "Bulk message delete"
    );

    for message_id in bulk.ids {
        emit_delete(
            MessageDeleteEvent {
                message_id,
                channel_id: bulk.channel_id,
                server_id: bulk.guild_id,
                message: None,
                channel: None,
            },
            ctx,
        );
    }
    Ok(())
}
