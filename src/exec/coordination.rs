// src/exec/coordination.rs

//! The coordination gate: one exclusive lock over all plan state, paired with
//! a block-and-retry protocol.
//!
//! Every decision about the plan (queueing, selection, completion, run
//! termination) happens inside a `transform` passed to
//! [`Coordinator::with_state_lock`]. The transform inspects and mutates the
//! guarded state and returns a [`Disposition`]:
//!
//! - [`Disposition::Finished`]: release the lock and return to the caller.
//! - [`Disposition::Retry`]: block on the gate's condition variable until
//!   another holder calls [`Coordinator::notify_state_change`], then re-run
//!   the transform from the top (state may have changed arbitrarily in the
//!   meantime, so the transform must re-check everything).
//!
//! Node execution is the only plan-related code that runs *without* holding
//! this lock; everything else is serialized through it.

use parking_lot::{Condvar, Mutex};

/// Outcome of one gate-guarded state check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// The transform is done; release the lock and return.
    Finished,
    /// Nothing to do right now; block until a state change is signalled,
    /// then re-run the transform.
    Retry,
}

/// Exclusive lock plus condition variable guarding shared plan state.
///
/// `Retry` waits on the condvar (releasing the lock), so blocked callers
/// consume no CPU until someone signals a state change.
pub struct Coordinator<S> {
    state: Mutex<S>,
    state_changed: Condvar,
}

impl<S> Coordinator<S> {
    pub fn new(state: S) -> Self {
        Self {
            state: Mutex::new(state),
            state_changed: Condvar::new(),
        }
    }

    /// Run `transform` against the guarded state until it reports
    /// [`Disposition::Finished`].
    ///
    /// Only one transform runs at a time system-wide. A `Retry` disposition
    /// parks the calling thread on the condition variable; it is woken by
    /// [`notify_state_change`](Self::notify_state_change) and never by a
    /// timeout, so every mutation of the guarded state must be followed by a
    /// notification or waiters are lost.
    pub fn with_state_lock<F>(&self, mut transform: F)
    where
        F: FnMut(&mut S) -> Disposition,
    {
        let mut guard = self.state.lock();
        loop {
            match transform(&mut guard) {
                Disposition::Finished => return,
                Disposition::Retry => self.state_changed.wait(&mut guard),
            }
        }
    }

    /// Wake all threads blocked in a `Retry` so they re-evaluate the state.
    pub fn notify_state_change(&self) {
        self.state_changed.notify_all();
    }

    /// Recover the guarded state once no other users remain.
    pub fn into_state(self) -> S {
        self.state.into_inner()
    }
}
