//! Per-thread interrupt and resume plumbing.
//!
//! Interrupts are keyed by `thread_id`, never engine-wide: pausing one
//! learner's session has no effect on any other thread running on the same
//! engine. The registry tracks two phases:
//!
//! 1. **Pending** — [`request`](InterruptRegistry::request) was called but
//!    the thread's driver loop has not reached its next node boundary yet.
//! 2. **Suspended** — the driver consumed the pending request, persisted an
//!    interrupted checkpoint, and parked on a oneshot channel waiting for
//!    [`resume`](InterruptRegistry::resume).
//!
//! The suspend/resume handoff is an explicit [`tokio::sync::oneshot`]
//! channel, so resumption wakes exactly the parked invoke and carries the
//! caller's [`StateUpdate`] with it.

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::state::StateUpdate;

/// An interrupt that has been requested but not yet observed by the
/// thread's driver loop.
#[derive(Clone, Debug, Default)]
pub struct PendingInterrupt {
    /// Human-readable reason, recorded into state as `interrupt_reason`.
    pub reason: String,
    /// Optional payload describing what the run was about to do, recorded
    /// into state as `pending_action`.
    pub pending_action: Option<Value>,
}

/// Thread-keyed interrupt state shared by all invokes on one engine.
#[derive(Debug, Default)]
pub struct InterruptRegistry {
    pending: Mutex<FxHashMap<String, PendingInterrupt>>,
    suspended: Mutex<FxHashMap<String, oneshot::Sender<StateUpdate>>>,
}

impl InterruptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flag a thread for interruption at its next node boundary.
    ///
    /// A second request before the first is consumed replaces it.
    pub fn request(&self, thread_id: &str, interrupt: PendingInterrupt) {
        self.pending
            .lock()
            .insert(thread_id.to_string(), interrupt);
    }

    /// Consume the pending request for a thread, if any.
    pub fn take_pending(&self, thread_id: &str) -> Option<PendingInterrupt> {
        self.pending.lock().remove(thread_id)
    }

    /// Park a thread: registers a resume channel and returns the receiving
    /// half for the driver loop to await.
    ///
    /// Parking a thread that is somehow already parked drops the stale
    /// sender, which wakes the old waiter with a channel-closed error.
    pub fn park(&self, thread_id: &str) -> oneshot::Receiver<StateUpdate> {
        let (tx, rx) = oneshot::channel();
        self.suspended.lock().insert(thread_id.to_string(), tx);
        rx
    }

    /// Wake a suspended thread with the caller's update.
    ///
    /// Returns `false` when the thread is not suspended (or the waiter has
    /// already gone away).
    pub fn resume(&self, thread_id: &str, input: StateUpdate) -> bool {
        match self.suspended.lock().remove(thread_id) {
            Some(tx) => tx.send(input).is_ok(),
            None => false,
        }
    }

    /// Whether the thread is currently parked awaiting resume.
    pub fn is_suspended(&self, thread_id: &str) -> bool {
        self.suspended.lock().contains_key(thread_id)
    }
}
