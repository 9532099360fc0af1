//! Time-ordered staging of published events for the worker thread.

use std::cmp::Ordering;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::time::Instant;

use parking_lot::{Condvar, Mutex};

use crate::types::EventEnvelope;

/// A published event waiting for its execution time.
pub(crate) struct ScheduledEvent {
    pub execute_at: Instant,
    /// Enqueue order, breaks ties between equal execution times so a single
    /// publisher's back-to-back events keep their order.
    seq: u64,
    pub envelope: EventEnvelope,
}

impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.execute_at == other.execute_at && self.seq == other.seq
    }
}

impl Eq for ScheduledEvent {}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        self.execute_at
            .cmp(&other.execute_at)
            .then(self.seq.cmp(&other.seq))
    }
}

/// What the worker should do after a wait.
pub(crate) enum WorkerStep {
    /// Dispatch these events (already in non-decreasing time order), then
    /// come back for more.
    Dispatch(Vec<ScheduledEvent>),
    /// Shut down.
    Exit,
}

#[derive(Default)]
struct QueueInner {
    /// Handoff buffer publishers append to. No ordering requirement;
    /// the worker merges it into the heap.
    pending: Vec<ScheduledEvent>,
    /// Min-heap on (execution time, enqueue order). Touched only by the
    /// worker.
    scheduled: BinaryHeap<Reverse<ScheduledEvent>>,
    /// Counter behind the per-event tiebreaker.
    next_seq: u64,
    /// Set on shutdown; the worker drains what is due and exits.
    done: bool,
}

/// Staging area between publishers and the dispatch worker.
///
/// Publishers only ever append to the handoff buffer and signal the condvar,
/// so publication cost is one short critical section regardless of how much
/// is scheduled. The worker owns the heap side through
/// [`next_batch`](Self::next_batch), which keeps the whole wait/merge/pop
/// protocol behind the one lock.
pub(crate) struct TimeQueue {
    inner: Mutex<QueueInner>,
    wake: Condvar,
}

impl TimeQueue {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(QueueInner::default()),
            wake: Condvar::new(),
        }
    }

    /// Append one event to the handoff buffer and wake the worker.
    pub fn enqueue(&self, execute_at: Instant, envelope: EventEnvelope) {
        {
            let mut inner = self.inner.lock();
            let seq = inner.next_seq;
            inner.next_seq += 1;
            inner.pending.push(ScheduledEvent {
                execute_at,
                seq,
                envelope,
            });
        }
        self.wake.notify_one();
    }

    /// Discard every pending and scheduled event.
    ///
    /// Events already handed to the dispatcher run to completion.
    pub fn cancel_all(&self) {
        let mut inner = self.inner.lock();
        inner.pending.clear();
        inner.scheduled.clear();
    }

    /// Tell the worker to finish up and exit.
    pub fn shutdown(&self) {
        {
            let mut inner = self.inner.lock();
            inner.done = true;
        }
        self.wake.notify_one();
    }

    /// Clear a previous shutdown so a fresh worker can run.
    pub fn resume(&self) {
        self.inner.lock().done = false;
    }

    /// Block until events are due or shutdown is requested.
    ///
    /// One call covers a full worker iteration: merge the handoff buffer
    /// into the heap, hand back everything whose time has come, and
    /// otherwise sleep. The sleep is untimed when nothing is scheduled and
    /// runs until the earliest execution time when something is. New
    /// arrivals interrupt either sleep so they merge before anything
    /// dispatches.
    ///
    /// On shutdown the already-due events still come out; entries scheduled
    /// for the future are discarded.
    pub fn next_batch(&self) -> WorkerStep {
        let mut inner = self.inner.lock();
        loop {
            let handoff = std::mem::take(&mut inner.pending);
            for event in handoff {
                inner.scheduled.push(Reverse(event));
            }

            if inner.done && inner.scheduled.is_empty() {
                return WorkerStep::Exit;
            }

            let now = Instant::now();
            let mut due = Vec::new();
            while inner
                .scheduled
                .peek()
                .map_or(false, |Reverse(event)| event.execute_at <= now)
            {
                if let Some(Reverse(event)) = inner.scheduled.pop() {
                    due.push(event);
                }
            }
            if !due.is_empty() {
                return WorkerStep::Dispatch(due);
            }

            if inner.done {
                // Shutting down with only future-scheduled entries left.
                inner.scheduled.clear();
                return WorkerStep::Exit;
            }

            match inner.scheduled.peek().map(|Reverse(event)| event.execute_at) {
                None => {
                    self.wake
                        .wait_while(&mut inner, |q| !q.done && q.pending.is_empty());
                }
                Some(deadline) => {
                    while !inner.done && inner.pending.is_empty() {
                        if self.wake.wait_until(&mut inner, deadline).timed_out() {
                            break;
                        }
                    }
                }
            }
        }
    }
}
