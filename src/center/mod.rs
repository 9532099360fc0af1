//! Event centers and the fire-and-forget publish helpers.

mod event_center;
mod sync_center;

pub use event_center::EventCenter;
pub use sync_center::SyncEventCenter;

use std::any::Any;
use std::time::{Duration, Instant};

use crate::handler::StaticEventHandler;
use crate::types::SubscriptionHandle;

/// Publish an event to the process-wide [`EventCenter`] for immediate
/// asynchronous processing.
///
/// Non-blocking: the call returns once the event is queued for the worker.
pub fn publish_event<T: Any + Send + Sync>(event: T) {
    EventCenter::instance().publish(event);
}

/// Publish an event to the process-wide [`EventCenter`] for processing
/// after `delay`.
pub fn publish_event_delayed<T: Any + Send + Sync>(event: T, delay: Duration) {
    EventCenter::instance().publish_delayed(event, delay);
}

/// Publish an event to the process-wide [`EventCenter`] for processing at
/// a specific time.
pub fn publish_event_at<T: Any + Send + Sync>(event: T, at: Instant) {
    EventCenter::instance().publish_at(event, at);
}

/// Register a self-dispatching event type on the process-wide
/// [`EventCenter`].
///
/// See [`StaticEventHandler`] for the pattern this enables.
pub fn register_static_event_handler<T: StaticEventHandler>() -> SubscriptionHandle {
    EventCenter::instance().register_static_handler::<T>()
}
