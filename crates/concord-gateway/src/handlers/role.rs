//! Server roles

use super::context::targets;
use super::{HandlerContext, HandlerResult};
use crate::events::{Event, RoleChangeEvent, RoleDeleteEvent, RoleEvent};
use concord_core::{ObjectKind, ObjectRef};
use serde_json::Value;

pub(super) fn create(payload: Value, ctx: &HandlerContext) -> HandlerResult<()> {
    let mut event: RoleEvent = serde_json::from_value(payload.clone())?;
    let (server_ref, server) = ctx.server(Some(event.server_id));
    event.server = server;
    event.role = ctx.upsert_nested(ObjectKind::Role, payload.get("role"));

    let targets = targets([server_ref, Some(ObjectRef::role(event.role_id))]);
    ctx.emit(Event::RoleCreate(event), &targets);
    Ok(())
}

pub(super) fn update(payload: Value, ctx: &HandlerContext) -> HandlerResult<()> {
    let mut event: RoleChangeEvent = serde_json::from_value(payload.clone())?;
    let (server_ref, server) = ctx.server(Some(event.server_id));
    event.server = server;
    event.old = ctx.cached(ObjectKind::Role, event.role_id);
    event.role = ctx.upsert_nested(ObjectKind::Role, payload.get("role"));

    let targets = targets([server_ref, Some(ObjectRef::role(event.role_id))]);
    ctx.emit(Event::RoleChange(event), &targets);
    Ok(())
}

pub(super) fn delete(payload: Value, ctx: &HandlerContext) -> HandlerResult<()> {
    let mut event: RoleDeleteEvent = serde_json::from_value(payload)?;
    let (server_ref, server) = ctx.server(Some(event.server_id));
    event.server = server;
    event.role = ctx.cache().remove(ObjectKind::Role, event.role_id);

    let role_ref = ObjectRef::role(event.role_id);
    ctx.emit(Event::RoleDelete(event), &targets([server_ref, Some(role_ref)]));
    ctx.remove_object_listeners(role_ref);
    Ok(())
}
