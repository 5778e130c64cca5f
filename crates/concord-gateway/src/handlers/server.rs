//! Server lifecycle, bans

use super::context::targets;
use super::{HandlerContext, HandlerResult};
use crate::events::{BanEvent, Event, ServerChangeEvent, ServerEvent};
use concord_core::{ObjectKind, ObjectRef};
use serde_json::{json, Value};

/// Cache the channels, roles and member users carried by a full server payload
fn cache_children(payload: &Value, ctx: &HandlerContext) {
    let list = |key: &str| payload.get(key).and_then(Value::as_array).cloned();

    for channel in list("channels").unwrap_or_default() {
        let channel_type = channel.get("type").and_then(Value::as_u64).unwrap_or(0) as u8;
        ctx.upsert_nested(ObjectKind::from_channel_type(channel_type), Some(&channel));
    }
    for thread in list("threads").unwrap_or_default() {
        ctx.upsert_nested(ObjectKind::ServerThreadChannel, Some(&thread));
    }
    for role in list("roles").unwrap_or_default() {
        ctx.upsert_nested(ObjectKind::Role, Some(&role));
    }
    for member in list("members").unwrap_or_default() {
        ctx.upsert_nested(ObjectKind::User, member.get("user"));
    }
}

pub(super) fn create(payload: Value, ctx: &HandlerContext) -> HandlerResult<()> {
    let mut event: ServerEvent = serde_json::from_value(payload.clone())?;
    if event.unavailable {
        tracing::debug!(server_id = %event.server_id, "Server still unavailable");
        return Ok(());
    }

    let was_unavailable = ctx
        .cached(ObjectKind::Server, event.server_id)
        .is_some_and(|stub| stub.raw().get("unavailable") == Some(&Value::Bool(true)));

    cache_children(&payload, ctx);
    event.server = Some(
        ctx.cache()
            .upsert(ObjectKind::Server, event.server_id, payload),
    );

    let target = ObjectRef::server(event.server_id);
    if was_unavailable {
        ctx.emit(Event::ServerAvailable(event), &[target]);
    } else {
        tracing::info!(server_id = %target.id, "Joined server");
        ctx.emit(Event::ServerJoin(event), &[target]);
    }
    Ok(())
}

pub(super) fn update(payload: Value, ctx: &HandlerContext) -> HandlerResult<()> {
    let mut event: ServerChangeEvent = serde_json::from_value(payload.clone())?;
    event.old = ctx.cached(ObjectKind::Server, event.server_id);
    event.server = Some(
        ctx.cache()
            .upsert(ObjectKind::Server, event.server_id, payload),
    );

    let target = ObjectRef::server(event.server_id);
    ctx.emit(Event::ServerChange(event), &[target]);
    Ok(())
}

pub(super) fn delete(payload: Value, ctx: &HandlerContext) -> HandlerResult<()> {
    let mut event: ServerEvent = serde_json::from_value(payload)?;
    let target = ObjectRef::server(event.server_id);

    if event.unavailable {
        event.server = Some(ctx.cache().upsert(
            ObjectKind::Server,
            event.server_id,
            json!({ "id": event.server_id, "unavailable": true }),
        ));
        tracing::warn!(server_id = %event.server_id, "Server became unavailable");
        ctx.emit(Event::ServerUnavailable(event), &[target]);
        return Ok(());
    }

    event.server = ctx.cache().remove(ObjectKind::Server, event.server_id);
    tracing::info!(server_id = %event.server_id, "Left server");
    ctx.emit(Event::ServerLeave(event), &[target]);
    ctx.remove_object_listeners(target);
    Ok(())
}

fn ban(payload: Value, ctx: &HandlerContext) -> HandlerResult<(BanEvent, Vec<ObjectRef>)> {
    let mut event: BanEvent = serde_json::from_value(payload.clone())?;
    let (server_ref, server) = ctx.server(Some(event.server_id));
    event.server = server;
    event.user = ctx.user(event.user_id, payload.get("user"));

    let targets = targets([server_ref, Some(ObjectRef::user(event.user_id))]);
    Ok((event, targets))
}

pub(super) fn ban_add(payload: Value, ctx: &HandlerContext) -> HandlerResult<()> {
    let (event, targets) = ban(payload, ctx)?;
    ctx.emit(Event::UserBan(event), &targets);
    Ok(())
}

pub(super) fn ban_remove(payload: Value, ctx: &HandlerContext) -> HandlerResult<()> {
    let (event, targets) = ban(payload, ctx)?;
    ctx.emit(Event::UserUnban(event), &targets);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support;
    use concord_core::Snowflake;

    #[tokio::test]
    async fn test_create_after_ready_stub_is_available() {
        let (ctx, mut rx) = test_support::context();
        ctx.cache().upsert(
            ObjectKind::Server,
            Snowflake::new(1),
            json!({"id": "1", "unavailable": true}),
        );

        create(
            json!({
                "id": "1",
                "name": "home",
                "channels": [{"id": "10", "type": 0}, {"id": "11", "type": 2}],
                "roles": [{"id": "20"}],
                "members": [{"user": {"id": "30"}}]
            }),
            &ctx,
        )
        .unwrap();

        assert!(matches!(rx.recv().await.unwrap().as_ref(), Event::ServerAvailable(_)));
        let channel = ctx.cached(ObjectKind::Channel, Snowflake::new(11)).unwrap();
        assert_eq!(channel.kind(), ObjectKind::ServerVoiceChannel);
        assert!(ctx.cached(ObjectKind::Role, Snowflake::new(20)).is_some());
        assert!(ctx.cached(ObjectKind::User, Snowflake::new(30)).is_some());
    }

    #[tokio::test]
    async fn test_create_unknown_server_is_join() {
        let (ctx, mut rx) = test_support::context();
        create(json!({"id": "5", "name": "new"}), &ctx).unwrap();
        assert!(matches!(rx.recv().await.unwrap().as_ref(), Event::ServerJoin(_)));
    }

    #[tokio::test]
    async fn test_update_carries_old_state() {
        let (ctx, mut rx) = test_support::context();
        create(json!({"id": "5", "name": "before"}), &ctx).unwrap();
        update(json!({"id": "5", "name": "after"}), &ctx).unwrap();

        rx.recv().await.unwrap();
        let event = rx.recv().await.unwrap();
        match event.as_ref() {
            Event::ServerChange(change) => {
                assert_eq!(change.old.as_ref().unwrap().str_field("name"), Some("before"));
                assert_eq!(change.server.as_ref().unwrap().str_field("name"), Some("after"));
            }
            other => panic!("unexpected event {other}"),
        }
    }

    #[tokio::test]
    async fn test_delete_unavailable_keeps_stub() {
        let (ctx, mut rx) = test_support::context();
        create(json!({"id": "5"}), &ctx).unwrap();
        delete(json!({"id": "5", "unavailable": true}), &ctx).unwrap();

        rx.recv().await.unwrap();
        assert!(matches!(rx.recv().await.unwrap().as_ref(), Event::ServerUnavailable(_)));
        assert!(ctx.cached(ObjectKind::Server, Snowflake::new(5)).is_some());
    }

    #[tokio::test]
    async fn test_leave_evicts_server() {
        let (ctx, mut rx) = test_support::context();
        create(json!({"id": "5"}), &ctx).unwrap();
        delete(json!({"id": "5"}), &ctx).unwrap();

        rx.recv().await.unwrap();
        match rx.recv().await.unwrap().as_ref() {
            Event::ServerLeave(leave) => assert!(leave.server.is_some()),
            other => panic!("unexpected event {other}"),
        }
        assert!(ctx.cached(ObjectKind::Server, Snowflake::new(5)).is_none());
    }

    #[tokio::test]
    async fn test_ban_materialises_user() {
        let (ctx, mut rx) = test_support::context();
        ban_add(
            json!({"guild_id": "1", "user": {"id": "2", "username": "spam"}}),
            &ctx,
        )
        .unwrap();

        match rx.recv().await.unwrap().as_ref() {
            Event::UserBan(ban) => {
                assert!(ban.server.is_none());
                assert_eq!(ban.user.as_ref().unwrap().str_field("username"), Some("spam"));
            }
            other => panic!("unexpected event {other}"),
        }
    }
}
