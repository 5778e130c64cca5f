//! Channels, pins, thread membership

use super::context::targets;
use super::{HandlerContext, HandlerResult};
use crate::events::{
    ChannelChangeEvent, ChannelEvent, ChannelPinsUpdateEvent, Event, ThreadMembersUpdateEvent,
};
use concord_core::{ObjectKind, ObjectRef};
use serde_json::Value;

pub(super) fn create(payload: Value, ctx: &HandlerContext) -> HandlerResult<()> {
    let mut event: ChannelEvent = serde_json::from_value(payload.clone())?;
    let (server_ref, server) = ctx.server(event.server_id);
    event.server = server;
    event.channel = Some(ctx.cache().upsert(event.kind(), event.channel_id, payload));

    let channel_ref = ObjectRef::new(event.kind(), event.channel_id);
    ctx.emit(Event::ChannelCreate(event), &targets([Some(channel_ref), server_ref]));
    Ok(())
}

pub(super) fn update(payload: Value, ctx: &HandlerContext) -> HandlerResult<()> {
    let mut event: ChannelChangeEvent = serde_json::from_value(payload.clone())?;
    let (server_ref, server) = ctx.server(event.server_id);
    event.server = server;
    event.old = ctx.cached(ObjectKind::Channel, event.channel_id);
    event.channel = Some(ctx.cache().upsert(event.kind(), event.channel_id, payload));

    let channel_ref = ObjectRef::new(event.kind(), event.channel_id);
    ctx.emit(Event::ChannelChange(event), &targets([Some(channel_ref), server_ref]));
    Ok(())
}

pub(super) fn delete(payload: Value, ctx: &HandlerContext) -> HandlerResult<()> {
    let mut event: ChannelEvent = serde_json::from_value(payload)?;
    let (server_ref, server) = ctx.server(event.server_id);
    event.server = server;
    event.channel = ctx.cache().remove(ObjectKind::Channel, event.channel_id);

    let channel_ref = ObjectRef::new(event.kind(), event.channel_id);
    tracing::debug!(channel = %channel_ref, "Channel deleted");
    ctx.emit(Event::ChannelDelete(event), &targets([Some(channel_ref), server_ref]));
    ctx.remove_object_listeners(channel_ref);
    Ok(())
}

pub(super) fn pins_update(payload: Value, ctx: &HandlerContext) -> HandlerResult<()> {
    let mut event: ChannelPinsUpdateEvent = serde_json::from_value(payload)?;
    let (server_ref, _) = ctx.server(event.server_id);
    event.channel = ctx.cached(ObjectKind::Channel, event.channel_id);

    let channel_ref = ctx.channel_ref(event.channel_id, event.server_id);
    ctx.emit(Event::ChannelPinsUpdate(event), &targets([Some(channel_ref), server_ref]));
    Ok(())
}

pub(super) fn thread_members_update(payload: Value, ctx: &HandlerContext) -> HandlerResult<()> {
    let mut event: ThreadMembersUpdateEvent = serde_json::from_value(payload)?;
    let (server_ref, _) = ctx.server(Some(event.server_id));
    event.thread = ctx.cached(ObjectKind::ServerThreadChannel, event.thread_id);

    let thread_ref = ObjectRef::new(ObjectKind::ServerThreadChannel, event.thread_id);
    ctx.emit(Event::ThreadMembersUpdate(event), &targets([Some(thread_ref), server_ref]));
    Ok(())
}
