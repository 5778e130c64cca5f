//! Server members

use super::context::targets;
use super::{HandlerContext, HandlerResult};
use crate::events::{Event, MemberChangeEvent, MemberEvent};
use concord_core::{ObjectKind, ObjectRef};
use serde_json::Value;

pub(super) fn add(payload: Value, ctx: &HandlerContext) -> HandlerResult<()> {
    let mut event: MemberEvent = serde_json::from_value(payload.clone())?;
    let (server_ref, server) = ctx.server(Some(event.server_id));
    event.server = server;
    event.user = ctx.upsert_nested(ObjectKind::User, payload.get("user"));

    let targets = targets([server_ref, Some(ObjectRef::user(event.user_id))]);
    ctx.emit(Event::MemberJoin(event), &targets);
    Ok(())
}

pub(super) fn update(payload: Value, ctx: &HandlerContext) -> HandlerResult<()> {
    let mut event: MemberChangeEvent = serde_json::from_value(payload.clone())?;
    let (server_ref, server) = ctx.server(Some(event.server_id));
    event.server = server;
    event.old = ctx.cached(ObjectKind::User, event.user_id);
    event.user = ctx.upsert_nested(ObjectKind::User, payload.get("user"));

    let targets = targets([server_ref, Some(ObjectRef::user(event.user_id))]);
    ctx.emit(Event::MemberChange(event), &targets);
    Ok(())
}

pub(super) fn remove(payload: Value, ctx: &HandlerContext) -> HandlerResult<()> {
    let mut event: MemberEvent = serde_json::from_value(payload.clone())?;
    let (server_ref, server) = ctx.server(Some(event.server_id));
    event.server = server;
    event.user = ctx.user(event.user_id, payload.get("user"));

    let targets = targets([server_ref, Some(ObjectRef::user(event.user_id))]);
    ctx.emit(Event::MemberLeave(event), &targets);
    Ok(())
}
