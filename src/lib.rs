//! # Event Center
//!
//! A type-indexed, in-process publish/subscribe bus. Events are plain Rust
//! values; subscribers register per event type and publishers never learn
//! who is listening.
//!
//! ## Core Concepts
//!
//! - **Two centers**: [`EventCenter`] queues events for a worker thread and
//!   supports delayed and time-pointed publication; [`SyncEventCenter`]
//!   dispatches inline on the caller.
//! - **Four subscription flavors**: owned handler objects, weakly observed
//!   handler objects, typed callbacks, and self-dispatching event types
//!   ([`StaticEventHandler`]).
//! - **Isolation**: every subscriber invocation runs inside a fault
//!   boundary; a panicking or slow handler is logged and the rest still run.
//!
//! ## Example
//!
//! ```
//! use event_center::EventCenter;
//! use std::time::Duration;
//!
//! struct Downloaded { bytes: u64 }
//!
//! let center = EventCenter::instance();
//! let handle = center.register_callback(|event: &Downloaded| {
//!     println!("{} bytes", event.bytes);
//! });
//!
//! center.publish(Downloaded { bytes: 1024 });
//! center.publish_delayed(Downloaded { bytes: 2048 }, Duration::from_millis(10));
//!
//! center.unregister(handle);
//! ```

pub mod center;
pub mod error;
pub mod handler;
pub mod types;

mod dispatch;
mod queue;
mod registry;

// Re-exports
pub use center::{
    publish_event, publish_event_at, publish_event_delayed, register_static_event_handler,
    EventCenter, SyncEventCenter,
};
pub use error::HandlerFault;
pub use handler::{EventHandler, StaticEventHandler};
pub use types::{EventEnvelope, EventKey, SubscriptionHandle};
