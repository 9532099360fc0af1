//! Core types for the event center.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Process-stable identity for an event type.
///
/// Derived from the type's [`TypeId`]; equality and hashing use the id only.
/// The type name rides along for diagnostics and is never compared.
#[derive(Clone, Copy)]
pub struct EventKey {
    id: TypeId,
    name: &'static str,
}

impl EventKey {
    /// Key for the event type `T`.
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Human-readable type name, for log lines.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for EventKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for EventKey {}

impl Hash for EventKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventKey({})", self.name)
    }
}

/// Identifier for a callback subscription, used for unregistering.
///
/// Monotonically issued per center and never reused. Zero is a valid handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionHandle(pub u64);

impl fmt::Display for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A published event value with its type identity erased.
///
/// Built once per publication; the payload is moved into a shared allocation
/// so dispatch can hand the same value to every subscriber without copying.
#[derive(Clone)]
pub struct EventEnvelope {
    key: EventKey,
    value: Arc<dyn Any + Send + Sync>,
}

impl EventEnvelope {
    /// Wrap an event value, capturing its type key.
    pub fn new<T: Any + Send + Sync>(event: T) -> Self {
        Self {
            key: EventKey::of::<T>(),
            value: Arc::new(event),
        }
    }

    /// The type key this envelope was built with.
    pub fn key(&self) -> EventKey {
        self.key
    }

    /// Recover the typed event, guarded by the key.
    ///
    /// Returns `None` when `T` does not match the envelope's key. The guard
    /// cannot fire under correct use; a mismatch means a corrupted dispatch
    /// path and the caller skips the invocation.
    pub fn downcast<T: Any>(&self) -> Option<&T> {
        if self.key != EventKey::of::<T>() {
            return None;
        }
        self.value.downcast_ref::<T>()
    }
}

impl fmt::Debug for EventEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventEnvelope({})", self.key.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ping(u32);
    struct Pong;

    #[test]
    fn test_event_key_identity() {
        assert_eq!(EventKey::of::<Ping>(), EventKey::of::<Ping>());
        assert_ne!(EventKey::of::<Ping>(), EventKey::of::<Pong>());
    }

    #[test]
    fn test_event_key_name() {
        assert!(EventKey::of::<Ping>().name().contains("Ping"));
    }

    #[test]
    fn test_envelope_downcast_matching() {
        let envelope = EventEnvelope::new(Ping(7));
        assert_eq!(envelope.key(), EventKey::of::<Ping>());
        assert_eq!(envelope.downcast::<Ping>().unwrap().0, 7);
    }

    #[test]
    fn test_envelope_downcast_mismatch() {
        let envelope = EventEnvelope::new(Ping(7));
        assert!(envelope.downcast::<Pong>().is_none());
    }

    #[test]
    fn test_envelope_clone_shares_payload() {
        let envelope = EventEnvelope::new(Ping(1));
        let copy = envelope.clone();
        let a = envelope.downcast::<Ping>().unwrap() as *const Ping;
        let b = copy.downcast::<Ping>().unwrap() as *const Ping;
        assert_eq!(a, b);
    }
}
