//! The asynchronous event center and its dispatch worker.

use std::any::Any;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::dispatch::Dispatcher;
use crate::handler::{EventHandler, StaticEventHandler};
use crate::queue::{TimeQueue, WorkerStep};
use crate::registry::Registry;
use crate::types::{EventEnvelope, EventKey, SubscriptionHandle};

/// The process-wide instance. Lazily created; [`EventCenter::destroy`]
/// empties the slot so the next access builds a fresh center.
static INSTANCE: Mutex<Option<Arc<EventCenter>>> = Mutex::new(None);

/// Worker thread handle and liveness flag, guarded together so spawn and
/// join are serialized.
#[derive(Default)]
struct WorkerState {
    thread: Option<JoinHandle<()>>,
    running: bool,
}

/// Asynchronous publish/subscribe center.
///
/// Subscribers register per event type; publishers hand events over with an
/// immediate, delayed, or absolute execution time and return without
/// waiting. A single worker thread, spawned on first publication, dispatches
/// each event once its time arrives.
///
/// ```
/// use event_center::EventCenter;
///
/// struct Loaded { pages: u32 }
///
/// let center = EventCenter::instance();
/// let handle = center.register_callback(|event: &Loaded| {
///     assert!(event.pages > 0);
/// });
/// center.publish(Loaded { pages: 3 });
/// # center.unregister(handle);
/// ```
pub struct EventCenter {
    registry: Arc<Registry>,
    dispatcher: Dispatcher,
    queue: Arc<TimeQueue>,
    worker: Mutex<WorkerState>,
}

impl EventCenter {
    /// The process-wide center, created on first access.
    pub fn instance() -> Arc<EventCenter> {
        let mut slot = INSTANCE.lock();
        Arc::clone(slot.get_or_insert_with(|| Arc::new(EventCenter::new())))
    }

    /// Join the worker and release the process-wide center.
    ///
    /// The worker finishes its current iteration, dispatches whatever is
    /// already due, and discards entries scheduled for the future. The next
    /// [`instance`](Self::instance) call builds a fresh center with an empty
    /// registry and queue.
    pub fn destroy() {
        let center = INSTANCE.lock().take();
        if let Some(center) = center {
            center.shutdown_worker();
        }
    }

    fn new() -> Self {
        let registry = Arc::new(Registry::new());
        Self {
            dispatcher: Dispatcher::new(Arc::clone(&registry)),
            registry,
            queue: Arc::new(TimeQueue::new()),
            worker: Mutex::new(WorkerState::default()),
        }
    }

    // --- Publication ---

    /// Publish an event for dispatch at the worker's next pass.
    pub fn publish<T: Any + Send + Sync>(&self, event: T) {
        self.publish_at(event, Instant::now());
    }

    /// Publish an event for dispatch after `delay`.
    pub fn publish_delayed<T: Any + Send + Sync>(&self, event: T, delay: Duration) {
        self.publish_at(event, Instant::now() + delay);
    }

    /// Publish an event for dispatch at the given time.
    ///
    /// Returns as soon as the event is in the handoff buffer; the only lock
    /// taken around the event itself is the buffer append.
    pub fn publish_at<T: Any + Send + Sync>(&self, event: T, at: Instant) {
        self.ensure_worker();
        let envelope = EventEnvelope::new(event);
        self.queue.enqueue(at, envelope);
    }

    /// Discard every pending and scheduled event.
    ///
    /// Registrations are untouched; events already mid-dispatch complete.
    pub fn cancel_all(&self) {
        self.queue.cancel_all();
    }

    // --- Subscription ---

    /// Register a handler the center keeps alive until unregistered.
    pub fn register_handler<T: Any>(&self, handler: Arc<dyn EventHandler>) {
        self.registry.register_owned(EventKey::of::<T>(), handler);
    }

    /// Register a handler the center only observes.
    ///
    /// The caller keeps ownership; once the last external `Arc` is dropped
    /// the handler stops receiving events and its entry is pruned.
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

    // --- Worker lifecycle ---

    /// Spawn the dispatch worker if it is not running.
    ///
    /// Also restarts the worker of a center kept alive across
    /// [`destroy`](Self::destroy) through a stale `Arc`.
    fn ensure_worker(&self) {
        let mut worker = self.worker.lock();
        if worker.running {
            return;
        }

        self.queue.resume();
        let queue = Arc::clone(&self.queue);
        let dispatcher = self.dispatcher.clone();
        let thread = thread::Builder::new()
            .name("event-center".into())
            .spawn(move || run_worker(&queue, &dispatcher))
            .expect("spawn event dispatch worker");

        worker.thread = Some(thread);
        worker.running = true;
    }

    /// Signal the worker to stop and wait for it.
    fn shutdown_worker(&self) {
        let mut worker = self.worker.lock();
        if !worker.running {
            return;
        }

        self.queue.shutdown();
        if let Some(thread) = worker.thread.take() {
            let _ = thread.join();
        }
        worker.running = false;
    }
}

/// Worker loop: sleep until events are due, dispatch them, repeat.
///
/// Dispatch happens with no queue lock held, so publishers never contend
/// with running handlers.
fn run_worker(queue: &TimeQueue, dispatcher: &Dispatcher) {
    while let WorkerStep::Dispatch(batch) = queue.next_batch() {
        for event in batch {
            dispatcher.dispatch(&event.envelope);
        }
    }
}
