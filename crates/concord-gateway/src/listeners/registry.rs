//! Listener registry
//!
//! Registrations live in an immutable snapshot behind a lock. Writers clone
//! the snapshot (copy-on-write), readers take an `Arc` of the current one
//! and iterate it without holding the lock, so a lookup never observes a
//! half-applied add or remove.

use super::EventListener;
use crate::broadcast::Lane;
use crate::events::EventCategories;
use concord_core::ObjectRef;
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Unique id of a registration
pub type ListenerId = u64;

type RemovalHandler = Box<dyn FnOnce() + Send>;

/// A single listener registration
pub struct Registration {
    pub(crate) id: ListenerId,
    pub(crate) categories: EventCategories,
    pub(crate) target: Option<ObjectRef>,
    pub(crate) listener: Arc<dyn EventListener>,
    pub(crate) lane: Lane,
    removed: AtomicBool,
    removal_handlers: Mutex<Vec<RemovalHandler>>,
    expiry: Mutex<Option<JoinHandle<()>>>,
}

impl Registration {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    pub fn listener_name(&self) -> &str {
        self.listener.name()
    }

    pub fn is_removed(&self) -> bool {
        self.removed.load(Ordering::Acquire)
    }

    /// Mark removed and run the removal handlers. Returns false if the
    /// registration was already removed.
    fn finish_removal(&self) -> bool {
        if self.removed.swap(true, Ordering::AcqRel) {
            return false;
        }
        if let Some(timer) = self.expiry.lock().take() {
            timer.abort();
        }
        let handlers = std::mem::take(&mut *self.removal_handlers.lock());
        for handler in handlers {
            handler();
        }
        true
    }
}

#[derive(Default, Clone)]
struct Snapshot {
    global: Vec<Arc<Registration>>,
    by_object: HashMap<ObjectRef, Vec<Arc<Registration>>>,
}

impl Snapshot {
    fn detach(&mut self, registration: &Registration) {
        match registration.target {
            None => self.global.retain(|r| r.id != registration.id),
            Some(target) => {
                if let Some(list) = self.by_object.get_mut(&target) {
                    list.retain(|r| r.id != registration.id);
                    if list.is_empty() {
                        self.by_object.remove(&target);
                    }
                }
            }
        }
    }
}

/// Registry of global and per-object listeners
pub struct ListenerRegistry {
    snapshot: RwLock<Arc<Snapshot>>,
    next_id: AtomicU64,
}

impl ListenerRegistry {
    /// Create an empty registry
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            snapshot: RwLock::new(Arc::new(Snapshot::default())),
            next_id: AtomicU64::new(1),
        })
    }

    /// Register a listener
    ///
    /// Untargeted registrations receive every event in `categories`;
    /// targeted ones only events whose dispatch targets include the object.
    pub fn add(
        self: &Arc<Self>,
        categories: EventCategories,
        target: Option<ObjectRef>,
        listener: Arc<dyn EventListener>,
    ) -> RegistrationHandle {
        let registration = Arc::new(Registration {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            categories,
            target,
            listener,
            lane: Lane::default(),
            removed: AtomicBool::new(false),
            removal_handlers: Mutex::new(Vec::new()),
            expiry: Mutex::new(None),
        });

        {
            let mut guard = self.snapshot.write();
            let snapshot = Arc::make_mut(&mut *guard);
            match target {
                None => snapshot.global.push(Arc::clone(&registration)),
                Some(target) => snapshot
                    .by_object
                    .entry(target)
                    .or_default()
                    .push(Arc::clone(&registration)),
            }
        }

        tracing::debug!(
            listener_id = registration.id,
            listener = registration.listener_name(),
            categories = %categories,
            object = ?target,
            "Listener registered"
        );

        RegistrationHandle {
            registration,
            registry: Arc::downgrade(self),
        }
    }

    fn remove_registration(&self, registration: &Arc<Registration>) -> bool {
        if registration.is_removed() {
            return false;
        }
        {
            let mut guard = self.snapshot.write();
            Arc::make_mut(&mut *guard).detach(registration);
        }
        let removed = registration.finish_removal();
        if removed {
            tracing::debug!(listener_id = registration.id, "Listener removed");
        }
        removed
    }

    /// Remove every listener attached to `target` under any kind of its
    /// capability set. Returns the number of registrations removed.
    pub fn remove_object_listeners(&self, target: ObjectRef) -> usize {
        let detached: Vec<Arc<Registration>> = {
            let mut guard = self.snapshot.write();
            let snapshot = Arc::make_mut(&mut *guard);
            target
                .views()
                .filter_map(|view| snapshot.by_object.remove(&view))
                .flatten()
                .collect()
        };

        let removed = detached.iter().filter(|r| r.finish_removal()).count();
        if removed > 0 {
            tracing::debug!(object = %target, removed, "Object listeners removed");
        }
        removed
    }

    /// Registrations that should receive an event of `category` with the
    /// given dispatch targets
    ///
    /// Iterates a snapshot taken at call time. Each registration is yielded
    /// at most once even if it matches several targets.
    pub fn matching(&self, category: EventCategories, targets: &[ObjectRef]) -> Matching {
        let mut keys: Vec<ObjectRef> = Vec::new();
        for view in targets.iter().flat_map(|t| t.views()) {
            if !keys.contains(&view) {
                keys.push(view);
            }
        }

        Matching {
            snapshot: self.snapshot.read().clone(),
            category,
            keys,
            list: 0,
            item: 0,
            seen: HashSet::new(),
        }
    }

    /// Total number of registrations
    pub fn len(&self) -> usize {
        let snapshot = self.snapshot.read();
        snapshot.global.len() + snapshot.by_object.values().map(Vec::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of untargeted registrations
    pub fn global_count(&self) -> usize {
        self.snapshot.read().global.len()
    }

    /// Number of registrations attached to `target` under any of its views
    pub fn object_count(&self, target: ObjectRef) -> usize {
        let snapshot = self.snapshot.read();
        target
            .views()
            .filter_map(|view| snapshot.by_object.get(&view))
            .map(Vec::len)
            .sum()
    }
}

/// Lazy iterator returned by [`ListenerRegistry::matching`]
pub struct Matching {
    snapshot: Arc<Snapshot>,
    category: EventCategories,
    keys: Vec<ObjectRef>,
    // 0 is the global list, n > 0 is keys[n - 1]
    list: usize,
    item: usize,
    seen: HashSet<ListenerId>,
}

impl Iterator for Matching {
    type Item = Arc<Registration>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.list <= self.keys.len() {
            let list = if self.list == 0 {
                Some(&self.snapshot.global)
            } else {
                self.snapshot.by_object.get(&self.keys[self.list - 1])
            };

            if let Some(registration) = list.and_then(|l| l.get(self.item)) {
                self.item += 1;
                if registration.is_removed()
                    || !registration.categories.accepts(self.category)
                    || !self.seen.insert(registration.id)
                {
                    continue;
                }
                return Some(Arc::clone(registration));
            }

            self.list += 1;
            self.item = 0;
        }
        None
    }
}

/// Handle returned by [`ListenerRegistry::add`]
///
/// Dropping the handle does not remove the listener.
#[derive(Clone)]
pub struct RegistrationHandle {
    registration: Arc<Registration>,
    registry: Weak<ListenerRegistry>,
}

impl RegistrationHandle {
    pub fn id(&self) -> ListenerId {
        self.registration.id
    }

    pub fn categories(&self) -> EventCategories {
        self.registration.categories
    }

    pub fn target(&self) -> Option<ObjectRef> {
        self.registration.target
    }

    pub fn is_removed(&self) -> bool {
        self.registration.is_removed()
    }

    /// Remove the listener. Idempotent; removal handlers run once.
    pub fn remove(&self) {
        match self.registry.upgrade() {
            Some(registry) => {
                registry.remove_registration(&self.registration);
            }
            None => {
                self.registration.finish_removal();
            }
        }
    }

    /// Remove the listener once `delay` has elapsed
    ///
    /// An explicit `remove` before then cancels the timer. Calling this
    /// again replaces the previous timer.
    pub fn remove_after(&self, delay: Duration) -> &Self {
        if self.is_removed() {
            return self;
        }

        let registration = Arc::downgrade(&self.registration);
        let registry = self.registry.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(registration) = registration.upgrade() else {
                return;
            };
            // Detach our own handle so removal does not abort this task
            registration.expiry.lock().take();
            match registry.upgrade() {
                Some(registry) => {
                    registry.remove_registration(&registration);
                }
                None => {
                    registration.finish_removal();
                }
            }
        });

        if let Some(previous) = self.registration.expiry.lock().replace(timer) {
            previous.abort();
        }
        self
    }

    /// Run `handler` once when the listener is removed
    ///
    /// Runs immediately if the listener is already gone.
    pub fn add_removal_handler<F>(&self, handler: F) -> &Self
    where
        F: FnOnce() + Send + 'static,
    {
        let mut handlers = self.registration.removal_handlers.lock();
        if self.registration.is_removed() {
            drop(handlers);
            handler();
        } else {
            handlers.push(Box::new(handler));
        }
        self
    }
}

impl std::fmt::Debug for RegistrationHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationHandle")
            .field("id", &self.registration.id)
            .field("categories", &self.registration.categories)
            .field("target", &self.registration.target)
            .field("removed", &self.is_removed())
            .finish()
    }
}
