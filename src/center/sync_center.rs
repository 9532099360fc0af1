//! The synchronous event center.

use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::debug;

use crate::dispatch::Dispatcher;
use crate::handler::{EventHandler, StaticEventHandler};
use crate::registry::Registry;
use crate::types::{EventEnvelope, EventKey, SubscriptionHandle};

static INSTANCE: Mutex<Option<Arc<SyncEventCenter>>> = Mutex::new(None);

/// Synchronous publish/subscribe center.
///
/// Same subscription surface and data model as [`EventCenter`], but
/// [`publish`](Self::publish) dispatches inline on the calling thread and
/// returns when every subscriber has run. There is no worker, so the timed
/// publication variants have nothing to honor them and are dropped.
///
/// [`EventCenter`]: crate::EventCenter
pub struct SyncEventCenter {
    registry: Arc<Registry>,
    dispatcher: Dispatcher,
}

impl SyncEventCenter {
    /// The process-wide synchronous center, created on first access.
    pub fn instance() -> Arc<SyncEventCenter> {
        let mut slot = INSTANCE.lock();
        Arc::clone(slot.get_or_insert_with(|| Arc::new(SyncEventCenter::new())))
    }

    /// Release the process-wide center; the next access starts empty.
    pub fn destroy() {
        INSTANCE.lock().take();
    }

    fn new() -> Self {
        let registry = Arc::new(Registry::new());
        Self {
            dispatcher: Dispatcher::new(Arc::clone(&registry)),
            registry,
        }
    }

    // --- Publication ---

    /// Dispatch an event to its subscribers on this thread, right now.
    pub fn publish<T: Any + Send + Sync>(&self, event: T) {
        let envelope = EventEnvelope::new(event);
        self.dispatcher.dispatch(&envelope);
    }

    /// Accepted for interface parity; the synchronous center cannot honor
    /// a delay, so the event is dropped.
    pub fn publish_delayed<T: Any + Send + Sync>(&self, _event: T, _delay: Duration) {
        debug!(
            "dropping delayed publication of {} on the synchronous center",
            EventKey::of::<T>().name()
        );
    }

    /// Accepted for interface parity; the synchronous center cannot honor
    /// a time point, so the event is dropped.
    pub fn publish_at<T: Any + Send + Sync>(&self, _event: T, _at: Instant) {
        debug!(
            "dropping timed publication of {} on the synchronous center",
            EventKey::of::<T>().name()
        );
    }

    // --- Subscription ---

    /// Register a handler the center keeps alive until unregistered.
    pub fn register_handler<T: Any>(&self, handler: Arc<dyn EventHandler>) {
        self.registry.register_owned(EventKey::of::<T>(), handler);
    }

    /// Register a handler the center only observes.
    pub fn register_weak_handler<T: Any>(&self, handler: &Arc<dyn EventHandler>) {
        self.registry.register_observed(EventKey::of::<T>(), handler);
    }

    /// Register a typed callback; the handle unregisters it later.
    pub fn register_callback<T, F>(&self, callback: F) -> SubscriptionHandle
    where
        T: Any + Send + Sync,
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.registry.register_callback::<T, _>(callback)
    }

    /// Register `T`'s own static dispatch function as a callback.
    pub fn register_static_handler<T: StaticEventHandler>(&self) -> SubscriptionHandle {
        self.registry.register_static::<T>()
    }

    /// Remove a handler registered as owned or observed for `T`.
    pub fn unregister_handler<T: Any>(&self, handler: &Arc<dyn EventHandler>) {
        self.registry.unregister_handler(EventKey::of::<T>(), handler);
    }

    /// Remove the callback behind `handle`. Unknown handles are ignored.
    pub fn unregister(&self, handle: SubscriptionHandle) {
        self.registry.unregister(handle);
    }

    /// Remove every subscriber for `T`, of all flavors.
    pub fn unregister_all<T: Any>(&self) {
        self.registry.unregister_all(EventKey::of::<T>());
    }

    /// Number of live subscribers for `T`.
    pub fn subscriber_count<T: Any>(&self) -> usize {
        self.registry.subscriber_count(EventKey::of::<T>())
    }
}
