//! Typed subscriber table shared by both centers.

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::handler::{EventHandler, StaticEventHandler};
use crate::types::{EventEnvelope, EventKey, SubscriptionHandle};

/// A callback with its event type erased.
///
/// The typed callback is wrapped at registration time; the wrapper performs
/// the key-guarded downcast and invokes the typed callback only on a match.
pub(crate) type ErasedCallback = Arc<dyn Fn(&EventEnvelope) + Send + Sync>;

/// Subscribers registered for one event type.
#[derive(Default)]
struct HandlerGroup {
    /// Handlers the center keeps alive until explicit unregistration.
    owned: Vec<Arc<dyn EventHandler>>,
    /// Handlers owned elsewhere; entries may expire at any time.
    observed: Vec<Weak<dyn EventHandler>>,
    /// Callbacks keyed by handle. Handles are monotonic, so iteration
    /// order is insertion order.
    callbacks: BTreeMap<SubscriptionHandle, ErasedCallback>,
}

impl HandlerGroup {
    fn is_empty(&self) -> bool {
        self.owned.is_empty() && self.observed.is_empty() && self.callbacks.is_empty()
    }
}

/// Both maps mutate together under the one registry lock.
#[derive(Default)]
struct RegistryInner {
    groups: HashMap<EventKey, HandlerGroup>,
    /// Reverse index so `unregister(handle)` avoids a scan over all groups.
    handle_index: HashMap<SubscriptionHandle, EventKey>,
}

/// Iteration-safe copy of one event type's subscribers.
///
/// Taken under the registry lock and consumed outside it, so dispatch never
/// runs user code while holding the lock.
pub(crate) struct Snapshot {
    pub owned: Vec<Arc<dyn EventHandler>>,
    pub observed: Vec<Weak<dyn EventHandler>>,
    pub callbacks: Vec<ErasedCallback>,
}

/// Table from event-type identity to its subscribers.
///
/// All operations take the single internal lock and are short: no user code
/// runs under it. Dispatch works from [`Snapshot`] copies instead.
pub(crate) struct Registry {
    inner: RwLock<RegistryInner>,
    /// Counter for issuing subscription handles. Values are never reused.
    next_handle: AtomicU64,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(RegistryInner::default()),
            next_handle: AtomicU64::new(0),
        }
    }

    // --- Registration ---

    /// Append an owned handler for `key`.
    pub fn register_owned(&self, key: EventKey, handler: Arc<dyn EventHandler>) {
        let mut inner = self.inner.write();
        inner.groups.entry(key).or_default().owned.push(handler);
    }

    /// Append a weakly observed handler for `key`.
    pub fn register_observed(&self, key: EventKey, handler: &Arc<dyn EventHandler>) {
        let mut inner = self.inner.write();
        inner
            .groups
            .entry(key)
            .or_default()
            .observed
            .push(Arc::downgrade(handler));
    }

    /// Wrap a typed callback and register it, returning its handle.
    pub fn register_callback<T, F>(&self, callback: F) -> SubscriptionHandle
    where
        T: Any + Send + Sync,
        F: Fn(&T) + Send + Sync + 'static,
    {
        let key = EventKey::of::<T>();
        let wrapped: ErasedCallback = Arc::new(move |envelope: &EventEnvelope| {
            if let Some(event) = envelope.downcast::<T>() {
                callback(event);
            }
        });

        let handle = SubscriptionHandle(self.next_handle.fetch_add(1, Ordering::SeqCst));
        let mut inner = self.inner.write();
        inner
            .groups
            .entry(key)
            .or_default()
            .callbacks
            .insert(handle, wrapped);
        inner.handle_index.insert(handle, key);
        handle
    }

    /// Register an event type's own static dispatch function.
    ///
    /// Plain callback underneath; exists to give the registration a
    /// canonical handle.
    pub fn register_static<T: StaticEventHandler>(&self) -> SubscriptionHandle {
        self.register_callback::<T, _>(T::handle)
    }

    // --- Unregistration ---

    /// Remove a handler registered as owned or observed under `key`.
    ///
    /// Matches by object identity; one occurrence is removed from each
    /// list per call. Expired observed entries are swept as a side effect.
    pub fn unregister_handler(&self, key: EventKey, handler: &Arc<dyn EventHandler>) {
        let mut inner = self.inner.write();
        let Some(group) = inner.groups.get_mut(&key) else {
            return;
        };

        if let Some(pos) = group.owned.iter().position(|h| Arc::ptr_eq(h, handler)) {
            group.owned.remove(pos);
        }

        group.observed.retain(|weak| weak.strong_count() > 0);
        if let Some(pos) = group
            .observed
            .iter()
            .position(|weak| weak.upgrade().is_some_and(|h| Arc::ptr_eq(&h, handler)))
        {
            group.observed.remove(pos);
        }

        if group.is_empty() {
            inner.groups.remove(&key);
        }
    }

    /// Remove the callback registered under `handle`.
    ///
    /// Unknown handles are a silent no-op.
    pub fn unregister(&self, handle: SubscriptionHandle) {
        let mut inner = self.inner.write();
        let Some(key) = inner.handle_index.remove(&handle) else {
            return;
        };
        if let Some(group) = inner.groups.get_mut(&key) {
            group.callbacks.remove(&handle);
            if group.is_empty() {
                inner.groups.remove(&key);
            }
        }
    }

    /// Drop every subscriber for `key`, of all flavors.
    pub fn unregister_all(&self, key: EventKey) {
        let mut inner = self.inner.write();
        if let Some(group) = inner.groups.remove(&key) {
            for handle in group.callbacks.keys() {
                inner.handle_index.remove(handle);
            }
        }
    }

    /// Drop expired observed entries for `key`.
    ///
    /// Called by the dispatcher after it skips an expired reference.
    pub fn prune_expired(&self, key: EventKey) {
        let mut inner = self.inner.write();
        if let Some(group) = inner.groups.get_mut(&key) {
            group.observed.retain(|weak| weak.strong_count() > 0);
            if group.is_empty() {
                inner.groups.remove(&key);
            }
        }
    }

    // --- Dispatch support ---

    /// Copy the subscriber collections for `key`.
    ///
    /// Callbacks come out in handle (= insertion) order.
    pub fn snapshot(&self, key: EventKey) -> Snapshot {
        let inner = self.inner.read();
        match inner.groups.get(&key) {
            Some(group) => Snapshot {
                owned: group.owned.clone(),
                observed: group.observed.clone(),
                callbacks: group.callbacks.values().cloned().collect(),
            },
            None => Snapshot {
                owned: Vec::new(),
                observed: Vec::new(),
                callbacks: Vec::new(),
            },
        }
    }

    // --- Introspection ---

    /// Number of live subscribers (all flavors) for `key`.
    ///
    /// Expired observed entries still count until pruned.
    pub fn subscriber_count(&self, key: EventKey) -> usize {
        let inner = self.inner.read();
        inner.groups.get(&key).map_or(0, |group| {
            group.owned.len() + group.observed.len() + group.callbacks.len()
        })
    }

    /// Number of live callback handles across all event types.
    #[cfg(test)]
    pub fn handle_count(&self) -> usize {
        self.inner.read().handle_index.len()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
