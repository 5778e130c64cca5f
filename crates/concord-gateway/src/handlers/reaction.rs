//! Message reactions

use super::context::targets;
use super::{HandlerContext, HandlerResult};
use crate::events::{Event, ReactionEvent, ReactionRemoveAllEvent};
use concord_core::{ObjectKind, ObjectRef};
use serde_json::Value;

fn decode(payload: Value, ctx: &HandlerContext) -> HandlerResult<(ReactionEvent, Vec<ObjectRef>)> {
    let mut event: ReactionEvent = serde_json::from_value(payload.clone())?;
    let member_user = payload.get("member").and_then(|m| m.get("user"));
    event.user = ctx.user(event.user_id, member_user);
    event.channel = ctx.cached(ObjectKind::Channel, event.channel_id);
    event.message = ctx.cached(ObjectKind::Message, event.message_id);

    let targets = targets([
        Some(ctx.channel_ref(event.channel_id, event.server_id)),
        event.server_id.map(ObjectRef::server),
        Some(ObjectRef::message(event.message_id)),
        Some(ObjectRef::user(event.user_id)),
    ]);
    Ok((event, targets))
}

pub(super) fn add(payload: Value, ctx: &HandlerContext) -> HandlerResult<()> {
    let (event, targets) = decode(payload, ctx)?;
    ctx.emit(Event::ReactionAdd(event), &targets);
    Ok(())
}

pub(super) fn remove(payload: Value, ctx: &HandlerContext) -> HandlerResult<()> {
    let (event, targets) = decode(payload, ctx)?;
    ctx.emit(Event::ReactionRemove(event), &targets);
    Ok(())
}

pub(super) fn remove_all(payload: Value, ctx: &HandlerContext) -> HandlerResult<()> {
    let mut event: ReactionRemoveAllEvent = serde_json::from_value(payload)?;
    event.channel = ctx.cached(ObjectKind::Channel, event.channel_id);
    event.message = ctx.cached(ObjectKind::Message, event.message_id);

    let targets = targets([
        Some(ctx.channel_ref(event.channel_id, event.server_id)),
        event.server_id.map(ObjectRef::server),
        Some(ObjectRef::message(event.message_id)),
    ]);
    ctx.emit(Event::ReactionRemoveAll(event), &targets);
    Ok(())
}
