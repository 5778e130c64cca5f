//! Presence, typing, account updates, webhooks

use super::context::targets;
use super::{HandlerContext, HandlerResult};
use crate::events::{Event, PresenceEvent, TypingEvent, UserChangeEvent, WebhooksUpdateEvent};
use concord_core::{ObjectKind, ObjectRef};
use serde_json::Value;

pub(super) fn presence_update(payload: Value, ctx: &HandlerContext) -> HandlerResult<()> {
    let mut event: PresenceEvent = serde_json::from_value(payload.clone())?;
    event.user = ctx.user(event.user_id, payload.get("user"));

    let targets = targets([
        Some(ObjectRef::user(event.user_id)),
        event.server_id.map(ObjectRef::server),
    ]);
    ctx.emit(Event::UserStatusChange(event), &targets);
    Ok(())
}

pub(super) fn typing_start(payload: Value, ctx: &HandlerContext) -> HandlerResult<()> {
    let mut event: TypingEvent = serde_json::from_value(payload.clone())?;
    let member_user = payload.get("member").and_then(|m| m.get("user"));
    event.user = ctx.user(event.user_id, member_user);
    event.channel = ctx.cached(ObjectKind::Channel, event.channel_id);

    let targets = targets([
        Some(ctx.channel_ref(event.channel_id, event.server_id)),
        event.server_id.map(ObjectRef::server),
        Some(ObjectRef::user(event.user_id)),
    ]);
    ctx.emit(Event::UserTyping(event), &targets);
    Ok(())
}

pub(super) fn update(payload: Value, ctx: &HandlerContext) -> HandlerResult<()> {
    let mut event: UserChangeEvent = serde_json::from_value(payload.clone())?;
    event.old = ctx.cached(ObjectKind::User, event.user_id);
    event.user = Some(ctx.cache().upsert(ObjectKind::User, event.user_id, payload));

    let target = ObjectRef::user(event.user_id);
    ctx.emit(Event::UserChange(event), &[target]);
    Ok(())
}

pub(super) fn webhooks_update(payload: Value, ctx: &HandlerContext) -> HandlerResult<()> {
    let mut event: WebhooksUpdateEvent = serde_json::from_value(payload)?;
    let (server_ref, server) = ctx.server(Some(event.server_id));
    event.server = server;
    event.channel = ctx.cached(ObjectKind::Channel, event.channel_id);

    let channel_ref = ctx.channel_ref(event.channel_id, Some(event.server_id));
    ctx.emit(Event::WebhooksUpdate(event), &targets([Some(channel_ref), server_ref]));
    Ok(())
}
