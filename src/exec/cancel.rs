// src/exec/cancel.rs

//! Cooperative, one-way cancellation.
//!
//! The flag is polled at the top of every gate-guarded step and never blocks.
//! Once observed, not-yet-selected nodes are cancelled by the plan; a node
//! already mid-execution always runs to completion.

use std::sync::atomic::{AtomicBool, Ordering};

/// Process-wide cancellation flag. Transitions from not-requested to
/// requested exactly once and never back.
#[derive(Debug, Default)]
pub struct CancellationToken {
    requested: AtomicBool,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of remaining, unscheduled work.
    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}
