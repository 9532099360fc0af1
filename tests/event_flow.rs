//! End-to-end subscription and delivery scenarios on the shared centers.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use event_center::{
    register_static_event_handler, EventCenter, EventEnvelope, EventHandler, StaticEventHandler,
};

/// Comfortable upper bound for "the worker has certainly run by now".
const RECEIVE_WITHIN: Duration = Duration::from_millis(200);

/// How long to wait before concluding an event was (correctly) not seen.
const SILENCE_FOR: Duration = Duration::from_millis(100);

struct Counted {
    value: i32,
}

struct Named {
    label: &'static str,
}

/// Forwards every matching event's value to a channel.
struct Forwarder {
    tx: Sender<i32>,
}

impl EventHandler for Forwarder {
    fn handle(&self, event: &EventEnvelope) {
        if let Some(counted) = event.downcast::<Counted>() {
            let _ = self.tx.send(counted.value);
        }
    }
}

fn forwarder() -> (Arc<dyn EventHandler>, Receiver<i32>) {
    let (tx, rx) = unbounded();
    (Arc::new(Forwarder { tx }), rx)
}

#[test]
fn test_callback_register_publish_unregister() {
    let center = EventCenter::instance();
    let (tx, rx) = unbounded();
    let handle = center.register_callback(move |event: &Counted| {
        let _ = tx.send(event.value);
    });

    center.publish(Counted { value: 42 });
    assert_eq!(rx.recv_timeout(RECEIVE_WITHIN).unwrap(), 42);

    center.unregister(handle);
    center.publish(Counted { value: 99 });
    assert!(rx.recv_timeout(SILENCE_FOR).is_err());
}

#[test]
fn test_weak_handler_stops_receiving_after_drop() {
    struct Expired {
        value: i32,
    }

    struct WeakForwarder {
        tx: Sender<i32>,
    }

    impl EventHandler for WeakForwarder {
        fn handle(&self, event: &EventEnvelope) {
            if let Some(e) = event.downcast::<Expired>() {
                let _ = self.tx.send(e.value);
            }
        }
    }

    let center = EventCenter::instance();
    let (tx, rx) = unbounded();
    let handler: Arc<dyn EventHandler> = Arc::new(WeakForwarder { tx });
    center.register_weak_handler::<Expired>(&handler);

    center.publish(Expired { value: 1 });
    assert_eq!(rx.recv_timeout(RECEIVE_WITHIN).unwrap(), 1);

    drop(handler);
    center.publish(Expired { value: 2 });
    assert!(rx.recv_timeout(SILENCE_FOR).is_err());
}

#[test]
fn test_owned_handler_outlives_callers_reference() {
    struct FireAndForget {
        value: i32,
    }

    struct OwnedForwarder {
        tx: Sender<i32>,
    }

    impl EventHandler for OwnedForwarder {
        fn handle(&self, event: &EventEnvelope) {
            if let Some(e) = event.downcast::<FireAndForget>() {
                let _ = self.tx.send(e.value);
            }
        }
    }

    let center = EventCenter::instance();
    let (tx, rx) = unbounded();
    // No local Arc kept; the center owns the handler.
    center.register_handler::<FireAndForget>(Arc::new(OwnedForwarder { tx }));

    center.publish(FireAndForget { value: 7 });
    assert_eq!(rx.recv_timeout(RECEIVE_WITHIN).unwrap(), 7);

    center.unregister_all::<FireAndForget>();
    center.publish(FireAndForget { value: 8 });
    assert!(rx.recv_timeout(SILENCE_FOR).is_err());
}

#[test]
fn test_faulting_callback_does_not_block_the_next() {
    struct Shaky;

    let center = EventCenter::instance();
    center.register_callback(|_: &Shaky| panic!("subscriber blew up"));
    let (tx, rx) = unbounded();
    center.register_callback(move |_: &Shaky| {
        let _ = tx.send(());
    });

    center.publish(Shaky);
    assert!(rx.recv_timeout(RECEIVE_WITHIN).is_ok());

    // The worker survives the panic and keeps dispatching.
    center.publish(Shaky);
    assert!(rx.recv_timeout(RECEIVE_WITHIN).is_ok());
}

#[test]
fn test_static_handler_round_trip() {
    static SINK: Mutex<Option<Sender<i32>>> = Mutex::new(None);

    struct SelfServing {
        value: i32,
    }

    impl StaticEventHandler for SelfServing {
        fn handle(event: &SelfServing) {
            if let Some(tx) = SINK.lock().unwrap().as_ref() {
                let _ = tx.send(event.value);
            }
        }
    }

    let (tx, rx) = unbounded();
    *SINK.lock().unwrap() = Some(tx);

    let handle = register_static_event_handler::<SelfServing>();
    event_center::publish_event(SelfServing { value: 5 });
    assert_eq!(rx.recv_timeout(RECEIVE_WITHIN).unwrap(), 5);

    EventCenter::instance().unregister(handle);
    event_center::publish_event(SelfServing { value: 6 });
    assert!(rx.recv_timeout(SILENCE_FOR).is_err());
}

#[test]
fn test_unregister_all_silences_every_flavor() {
    let center = EventCenter::instance();
    let (owned, owned_rx) = forwarder();
    let (observed, observed_rx) = forwarder();
    let (cb_tx, cb_rx) = unbounded();

    center.register_handler::<Counted>(owned);
    center.register_weak_handler::<Counted>(&observed);
    center.register_callback(move |event: &Counted| {
        let _ = cb_tx.send(event.value);
    });

    center.publish(Counted { value: 1 });
    assert_eq!(owned_rx.recv_timeout(RECEIVE_WITHIN).unwrap(), 1);
    assert_eq!(observed_rx.recv_timeout(RECEIVE_WITHIN).unwrap(), 1);
    assert_eq!(cb_rx.recv_timeout(RECEIVE_WITHIN).unwrap(), 1);

    center.unregister_all::<Counted>();
    assert_eq!(center.subscriber_count::<Counted>(), 0);

    center.publish(Counted { value: 2 });
    assert!(owned_rx.recv_timeout(SILENCE_FOR).is_err());
    assert!(observed_rx.recv_timeout(SILENCE_FOR).is_err());
    assert!(cb_rx.recv_timeout(SILENCE_FOR).is_err());
}

#[test]
fn test_subscriptions_are_type_scoped() {
    let center = EventCenter::instance();
    let (tx, rx) = unbounded();
    let handle = center.register_callback(move |event: &Named| {
        let _ = tx.send(event.label);
    });

    struct Unrelated;
    center.publish(Unrelated);
    assert!(rx.recv_timeout(SILENCE_FOR).is_err());

    center.publish(Named { label: "right" });
    assert_eq!(rx.recv_timeout(RECEIVE_WITHIN).unwrap(), "right");
    center.unregister(handle);
}

#[test]
fn test_unregister_handler_targets_one_object() {
    struct Shared;

    struct SharedForwarder {
        tx: Sender<i32>,
        tag: i32,
    }

    impl EventHandler for SharedForwarder {
        fn handle(&self, event: &EventEnvelope) {
            if event.downcast::<Shared>().is_some() {
                let _ = self.tx.send(self.tag);
            }
        }
    }

    let center = EventCenter::instance();
    let (tx, rx) = unbounded();
    let first: Arc<dyn EventHandler> = Arc::new(SharedForwarder {
        tx: tx.clone(),
        tag: 1,
    });
    let second: Arc<dyn EventHandler> = Arc::new(SharedForwarder { tx, tag: 2 });

    center.register_handler::<Shared>(Arc::clone(&first));
    center.register_handler::<Shared>(Arc::clone(&second));

    center.unregister_handler::<Shared>(&first);
    center.publish(Shared);
    assert_eq!(rx.recv_timeout(RECEIVE_WITHIN).unwrap(), 2);
    assert!(rx.recv_timeout(SILENCE_FOR).is_err());

    center.unregister_handler::<Shared>(&second);
}
