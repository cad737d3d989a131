//! Once-only initialization gate that also propagates failure.
//!
//! # Invariants
//! - At most one initializer runs at a time; it is the only writer of the phase.
//! - Waiters are released only once the slot holds `Ready` or `Failed`.
//! - A panic escaping the initializer settles the slot as `Failed`.
//! - The initializing thread re-entering the gate gets an error, never a wait.

use crate::lifecycle::error::LifecycleError;
use crate::lifecycle::state::LifecycleState;
use crate::logging::panic_payload_message;
use log::{debug, warn};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

enum Slot<T> {
    Empty,
    /// Initializer in flight on the recorded thread.
    Running(ThreadId),
    Ready(Arc<T>),
    Failed(LifecycleError),
}

struct Inner<T> {
    slot: Slot<T>,
    state: LifecycleState,
}

pub(crate) struct InitGate<T> {
    inner: Mutex<Inner<T>>,
    released: Condvar,
}

impl<T> InitGate<T> {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                slot: Slot::Empty,
                state: LifecycleState::Uninitialized,
            }),
            released: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn state(&self) -> LifecycleState {
        self.lock().state
    }

    pub(crate) fn ready(&self) -> Option<Arc<T>> {
        match &self.lock().slot {
            Slot::Ready(value) => Some(value.clone()),
            _ => None,
        }
    }

    /// Records a phase transition made by the running initializer.
    pub(crate) fn advance(&self, next: LifecycleState) {
        let mut inner = self.lock();
        let previous = inner.state;
        if !previous.can_advance_to(next) {
            warn!(
                "event=lifecycle_transition module=lifecycle status=unexpected from={previous} to={next}"
            );
        }
        inner.state = next;
        debug!("event=lifecycle_transition module=lifecycle status=ok from={previous} to={next}");
    }

    /// Returns the settled value, running `init` if nobody has started yet.
    ///
    /// Concurrent callers block until the single initializer settles, then all
    /// observe the same `Arc` or a clone of the same error. A call made from
    /// inside `init` on the initializing thread fails with `Reentrant`.
    pub(crate) fn get_or_init<F>(&self, init: F) -> Result<Arc<T>, LifecycleError>
    where
        F: FnOnce() -> Result<T, LifecycleError>,
    {
        let current = thread::current().id();
        let mut inner = self.lock();
        loop {
            match &inner.slot {
                Slot::Ready(value) => return Ok(value.clone()),
                Slot::Failed(err) => return Err(err.clone()),
                Slot::Empty => break,
                Slot::Running(owner) if *owner == current => {
                    let phase = inner.state;
                    warn!("event=lifecycle_reentry module=lifecycle status=rejected phase={phase}");
                    return Err(LifecycleError::Reentrant { phase });
                }
                Slot::Running(_) => {}
            }
            inner = self
                .released
                .wait(inner)
                .unwrap_or_else(PoisonError::into_inner);
        }
        inner.slot = Slot::Running(current);
        drop(inner);

        let outcome = match panic::catch_unwind(AssertUnwindSafe(init)) {
            Ok(result) => result,
            Err(payload) => Err(LifecycleError::Panicked {
                phase: self.state(),
                unit: None,
                message: panic_payload_message(payload.as_ref()),
            }),
        };

        let mut inner = self.lock();
        let settled = match outcome {
            Ok(value) => {
                let value = Arc::new(value);
                inner.slot = Slot::Ready(value.clone());
                inner.state = LifecycleState::Ready;
                Ok(value)
            }
            Err(err) => {
                inner.slot = Slot::Failed(err.clone());
                inner.state = LifecycleState::Failed;
                Err(err)
            }
        };
        drop(inner);
        self.released.notify_all();
        settled
    }

    /// Clears a failed outcome so the next access starts from scratch.
    pub(crate) fn reset(&self) -> Result<(), LifecycleError> {
        let mut inner = self.lock();
        if !matches!(inner.slot, Slot::Failed(_)) {
            return Err(LifecycleError::ResetRejected(inner.state));
        }
        inner.slot = Slot::Empty;
        inner.state = LifecycleState::Uninitialized;
        Ok(())
    }
}
