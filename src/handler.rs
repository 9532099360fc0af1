//! Handler traits for object-based and stateless subscriptions.

use std::any::Any;

use crate::types::EventEnvelope;

/// An event handler object.
///
/// Implementors receive every event published for the types they were
/// registered under and pick out the ones they care about with
/// [`EventEnvelope::downcast`]:
///
/// ```
/// use event_center::{EventEnvelope, EventHandler};
///
/// struct Counter(std::sync::atomic::AtomicU64);
/// struct Tick;
///
/// impl EventHandler for Counter {
///     fn handle(&self, event: &EventEnvelope) {
///         if event.downcast::<Tick>().is_some() {
///             self.0.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
///         }
///     }
/// }
/// ```
///
/// Handlers run on the dispatching thread (the worker for the asynchronous
/// center, the caller for the synchronous one) and must not assume which.
pub trait EventHandler: Send + Sync {
    /// Process one published event.
    fn handle(&self, event: &EventEnvelope);
}

/// An event type that dispatches to its own associated function.
///
/// Gives simple stateless events a one-line subscription:
///
/// ```
/// use event_center::StaticEventHandler;
///
/// struct CacheFlushed;
///
/// impl StaticEventHandler for CacheFlushed {
///     fn handle(_event: &CacheFlushed) {
///         // react to the flush
///     }
/// }
///
/// let handle = event_center::register_static_event_handler::<CacheFlushed>();
/// # event_center::EventCenter::instance().unregister(handle);
/// ```
///
/// Registration goes through the ordinary callback path, so the returned
/// handle unregisters it like any other callback.
pub trait StaticEventHandler: Any + Send + Sync + Sized {
    /// Process one published event of this type.
    fn handle(event: &Self);
}
