//! Event dispatcher
//!
//! Hands decoded events to matching listeners. Each registration owns an
//! ordered lane: its events run one after another in dispatch order, while
//! different listeners run concurrently, bounded by a semaphore of worker
//! permits.

use crate::events::Event;
use crate::listeners::{ListenerRegistry, Registration};
use concord_core::ObjectRef;
use futures::FutureExt;
use parking_lot::Mutex;
use std::any::Any;
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, Semaphore};
use tokio::time::Instant;

/// Invocations slower than this are logged at debug
const SLOW_LISTENER_DEBUG: Duration = Duration::from_millis(500);

/// Invocations still running after this are logged at warn
const SLOW_LISTENER_WARN: Duration = Duration::from_secs(10);

/// Per-registration ordered queue
#[derive(Default)]
pub(crate) struct Lane {
    state: Mutex<LaneState>,
}

#[derive(Default)]
struct LaneState {
    queue: VecDeque<Arc<Event>>,
    running: bool,
}

struct Shared {
    permits: Semaphore,
    pending: AtomicUsize,
    idle: Notify,
}

impl Shared {
    fn complete(&self, count: usize) {
        if count > 0 && self.pending.fetch_sub(count, Ordering::AcqRel) == count {
            self.idle.notify_waiters();
        }
    }
}

/// Event dispatcher that routes events to listener lanes
pub struct EventDispatcher {
    registry: Arc<ListenerRegistry>,
    shared: Arc<Shared>,
    accepting: AtomicBool,
}

impl EventDispatcher {
    /// Create a dispatcher running at most `workers` listeners at once
    pub fn new(registry: Arc<ListenerRegistry>, workers: usize) -> Self {
        Self {
            registry,
            shared: Arc::new(Shared {
                permits: Semaphore::new(workers.max(1)),
                pending: AtomicUsize::new(0),
                idle: Notify::new(),
            }),
            accepting: AtomicBool::new(true),
        }
    }

    pub fn registry(&self) -> &Arc<ListenerRegistry> {
        &self.registry
    }

    /// Queue `event` for every matching listener
    ///
    /// Returns the number of listeners the event was queued for. Must be
    /// called from within a tokio runtime.
    pub fn dispatch(&self, event: Event, targets: &[ObjectRef]) -> usize {
        if !self.is_accepting() {
            tracing::debug!(event_type = event.name(), "Dispatcher shut down, event dropped");
            return 0;
        }

        let event = Arc::new(event);
        let mut queued = 0;
        for registration in self.registry.matching(event.category(), targets) {
            self.enqueue(registration, Arc::clone(&event));
            queued += 1;
        }

        tracing::trace!(
            event_type = event.name(),
            targets = targets.len(),
            listeners = queued,
            "Event dispatched"
        );
        queued
    }

    fn enqueue(&self, registration: Arc<Registration>, event: Arc<Event>) {
        self.shared.pending.fetch_add(1, Ordering::AcqRel);
        let start_drain = {
            let mut lane = registration.lane.state.lock();
            lane.queue.push_back(event);
            !std::mem::replace(&mut lane.running, true)
        };

        if start_drain {
            tokio::spawn(drain_lane(registration, Arc::clone(&self.shared)));
        }
    }

    /// Check if new events are still accepted
    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::Acquire)
    }

    /// Number of queued or running invocations
    pub fn pending(&self) -> usize {
        self.shared.pending.load(Ordering::Acquire)
    }

    /// Wait until every queued invocation has finished
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.shared.idle.notified();
            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Stop accepting events; queued ones are dropped, running ones finish
    pub fn shutdown(&self) {
        if self.accepting.swap(false, Ordering::AcqRel) {
            self.shared.permits.close();
            tracing::info!(pending = self.pending(), "Event dispatcher stopped");
        }
    }
}

async fn drain_lane(registration: Arc<Registration>, shared: Arc<Shared>) {
    loop {
        let next = {
            let mut lane = registration.lane.state.lock();
            let next = lane.queue.pop_front();
            if next.is_none() {
                lane.running = false;
            }
            next
        };
        let Some(event) = next else {
            return;
        };

        let Ok(permit) = shared.permits.acquire().await else {
            let dropped = {
                let mut lane = registration.lane.state.lock();
                let dropped = lane.queue.len() + 1;
                lane.queue.clear();
                lane.running = false;
                dropped
            };
            tracing::debug!(
                listener_id = registration.id(),
                dropped,
                "Dispatcher shut down, queued events dropped"
            );
            shared.complete(dropped);
            return;
        };

        invoke(&registration, event).await;
        drop(permit);
        shared.complete(1);
    }
}

async fn invoke(registration: &Registration, event: Arc<Event>) {
    let listener_id = registration.id();
    let listener = registration.listener_name();
    let event_type = event.name();
    let started = Instant::now();

    let call = AssertUnwindSafe(registration.listener.on_event(Arc::clone(&event))).catch_unwind();
    tokio::pin!(call);

    let first_wait = tokio::time::timeout(SLOW_LISTENER_WARN, &mut call).await;
    let outcome = match first_wait {
        Ok(outcome) => outcome,
        Err(_) => {
            tracing::warn!(
                listener_id,
                listener,
                event_type,
                "Listener still running after {}s",
                SLOW_LISTENER_WARN.as_secs()
            );
            call.await
        }
    };

    match outcome {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            tracing::warn!(
                listener_id,
                listener,
                event_type,
                error = %e,
                "Listener returned an error"
            );
        }
        Err(panic) => {
            tracing::error!(
                listener_id,
                listener,
                event_type,
                panic = panic_message(panic.as_ref()),
                "Listener panicked"
            );
        }
    }

    let elapsed = started.elapsed();
    if elapsed > SLOW_LISTENER_DEBUG {
        tracing::debug!(
            listener_id,
            listener,
            event_type,
            elapsed_ms = elapsed.as_millis() as u64,
            "Slow listener"
        );
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}
