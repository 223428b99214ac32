#![forbid(unsafe_code)]

//! Cancellable one-shot deferred tasks.
//!
//! A [`Deferred`] slot holds at most one pending task. Scheduling a new task
//! cancels the old one, and every task carries a [`TaskId`] generation so a
//! host timer that fires late for a replaced task is ignored.
//!
//! Two ways to drive it:
//!
//! - **Polling**: call [`poll`](Deferred::poll) with the current time from a
//!   tick loop. Deterministic and what the tests use.
//! - **Host timers**: arm a real timer (e.g. `setTimeout`) for
//!   [`due`](Deferred::due) and call [`fire`](Deferred::fire) with the id it
//!   was armed for. Stale ids return `None`.
//!
//! # Invariants
//!
//! 1. At most one task is pending.
//! 2. A cancelled or replaced task never yields its payload.
//! 3. `TaskId`s are never reused within one slot.

use web_time::{Duration, Instant};

/// Identifies one scheduled task within a [`Deferred`] slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

#[derive(Debug, Clone)]
struct Pending<T> {
    id: TaskId,
    due: Instant,
    payload: T,
}

/// A single cancellable deferred task slot.
#[derive(Debug, Clone)]
pub struct Deferred<T> {
    pending: Option<Pending<T>>,
    next_id: u64,
}

impl<T> Default for Deferred<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Deferred<T> {
    pub const fn new() -> Self {
        Self {
            pending: None,
            next_id: 0,
        }
    }

    /// Schedule `payload` to become ready at `due`, cancelling any pending
    /// task.
    pub fn schedule(&mut self, payload: T, due: Instant) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        if let Some(old) = self.pending.replace(Pending { id, due, payload }) {
            tracing::trace!(cancelled = old.id.0, replacement = id.0, "deferred task replaced");
        }
        id
    }

    /// Schedule `payload` to become ready `delay` after `now`.
    pub fn schedule_after(&mut self, payload: T, now: Instant, delay: Duration) -> TaskId {
        self.schedule(payload, now + delay)
    }

    /// Cancel the pending task, returning its payload.
    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|p| p.payload)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Id of the pending task, if any.
    pub fn pending_id(&self) -> Option<TaskId> {
        self.pending.as_ref().map(|p| p.id)
    }

    /// When the pending task becomes ready.
    pub fn due(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.due)
    }

    /// Take the pending payload if it is due at `now`.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        if self.pending.as_ref().is_some_and(|p| p.due <= now) {
            self.pending.take().map(|p| p.payload)
        } else {
            None
        }
    }

    /// Take the pending payload if `id` still names it, regardless of time.
    pub fn fire(&mut self, id: TaskId) -> Option<T> {
        if self.pending.as_ref().is_some_and(|p| p.id == id) {
            self.pending.take().map(|p| p.payload)
        } else {
            None
        }
    }
}
