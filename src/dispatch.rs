//! Snapshot-driven event dispatch with per-handler fault isolation.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{error, warn};

use crate::error::HandlerFault;
use crate::registry::Registry;
use crate::types::EventEnvelope;

/// A handler running longer than this gets a warning in the log.
const SLOW_HANDLER_WARN: Duration = Duration::from_millis(500);

/// Which subscriber flavor an invocation belongs to, for log lines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum HandlerKind {
    Owned,
    Observed,
    Callback,
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerKind::Owned => write!(f, "Owned"),
            HandlerKind::Observed => write!(f, "Observed"),
            HandlerKind::Callback => write!(f, "Callback"),
        }
    }
}

/// Delivers one event to every subscriber of its type.
///
/// Works from a point-in-time registry [`snapshot`](Registry::snapshot), so
/// no lock is held while subscriber code runs and registration mutations
/// never wait on a slow handler.
#[derive(Clone)]
pub(crate) struct Dispatcher {
    registry: Arc<Registry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// Invoke every subscriber registered for the envelope's type.
    ///
    /// Groups run owned, then observed, then callbacks; insertion order
    /// within each. A fault or stall in one invocation never stops the
    /// rest. Observed handlers are upgraded for the duration of their
    /// invocation only; expired ones are skipped and pruned afterwards.
    pub fn dispatch(&self, envelope: &EventEnvelope) {
        let snapshot = self.registry.snapshot(envelope.key());

        for handler in &snapshot.owned {
            invoke(HandlerKind::Owned, envelope, || handler.handle(envelope));
        }

        let mut saw_expired = false;
        for weak in &snapshot.observed {
            match weak.upgrade() {
                Some(handler) => {
                    invoke(HandlerKind::Observed, envelope, || handler.handle(envelope));
                }
                None => saw_expired = true,
            }
        }

        for callback in &snapshot.callbacks {
            invoke(HandlerKind::Callback, envelope, || callback(envelope));
        }

        if saw_expired {
            self.registry.prune_expired(envelope.key());
        }
    }
}

/// Run one subscriber invocation inside the fault boundary.
///
/// Panics are caught, logged with the invocation category, and swallowed;
/// wall-clock time over [`SLOW_HANDLER_WARN`] is reported the same way.
fn invoke(kind: HandlerKind, envelope: &EventEnvelope, f: impl FnOnce()) {
    let start = Instant::now();
    let outcome = panic::catch_unwind(AssertUnwindSafe(f));
    let elapsed = start.elapsed();

    if elapsed > SLOW_HANDLER_WARN {
        warn!(
            "{kind} handler took {}ms on {}",
            elapsed.as_millis(),
            envelope.key().name()
        );
    }
    if let Err(payload) = outcome {
        let fault = HandlerFault::from_panic(payload);
        error!("{kind} handler failed on {}: {fault}", envelope.key().name());
    }
}
