//! Listener trait

use crate::events::Event;
use async_trait::async_trait;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

/// Application callback for gateway events
///
/// A listener only receives events in the categories it was registered
/// for. Errors and panics are caught and logged by the dispatcher; they
/// never reach the gateway session.
#[async_trait]
pub trait EventListener: Send + Sync + 'static {
    async fn on_event(&self, event: Arc<Event>) -> anyhow::Result<()>;

    /// Name used in logs
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Listener backed by an async closure
pub struct FnListener<F, Fut> {
    name: &'static str,
    f: F,
    _fut: PhantomData<fn() -> Fut>,
}

/// Wrap an async closure as a listener
pub fn listener_fn<F, Fut>(name: &'static str, f: F) -> FnListener<F, Fut>
where
    F: Fn(Arc<Event>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    FnListener {
        name,
        f,
        _fut: PhantomData,
    }
}

#[async_trait]
impl<F, Fut> EventListener for FnListener<F, Fut>
where
    F: Fn(Arc<Event>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn on_event(&self, event: Arc<Event>) -> anyhow::Result<()> {
        (self.f)(event).await
    }

    fn name(&self) -> &str {
        self.name
    }
}
