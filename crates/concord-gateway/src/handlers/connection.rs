//! READY and RESUMED
//!
//! Session bookkeeping for both lives in the session machine; these units
//! only seed the cache and notify listeners.

use super::{HandlerContext, HandlerResult};
use crate::events::{Event, ReadyEvent};
use concord_core::{ObjectKind, ObjectRef};
use serde_json::{json, Value};

pub(super) fn ready(payload: Value, ctx: &HandlerContext) -> HandlerResult<()> {
    let mut event: ReadyEvent = serde_json::from_value(payload.clone())?;

    event.user = ctx.upsert_nested(ObjectKind::User, payload.get("user"));

    for stub in &event.servers {
        if ctx.cached(ObjectKind::Server, stub.id).is_none() {
            ctx.cache().upsert(
                ObjectKind::Server,
                stub.id,
                json!({ "id": stub.id, "unavailable": true }),
            );
        }
    }

    tracing::info!(
        session_id = %event.session_id,
        user_id = %event.user_id,
        servers = event.servers.len(),
        "Session ready"
    );

    let target = ObjectRef::user(event.user_id);
    ctx.emit(Event::Ready(event), &[target]);
    Ok(())
}

pub(super) fn resumed(_payload: Value, _ctx: &HandlerContext) -> HandlerResult<()> {
    tracing::debug!("RESUMED received");
    Ok(())
}
