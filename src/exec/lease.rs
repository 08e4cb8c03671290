// src/exec/lease.rs

//! Worker leases: the permits that bound how many nodes run simultaneously.
//!
//! A root lease is created per `process()` call, sized to the configured
//! worker count. Each worker splits one child off the root for its entire
//! lifetime, so the number of live children can never exceed the bound.
//! Selecting a node is fused with holding a lease: `select_next` receives the
//! worker's lease and binds the node's exclusive resources to it, so a node
//! can never run without a permit behind it.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::errors::Result;
use anyhow::anyhow;

struct LeaseBudget {
    max_children: usize,
    active_children: Mutex<usize>,
}

/// Root of the lease hierarchy for one run.
pub struct WorkerLeaseRegistry {
    budget: Arc<LeaseBudget>,
}

impl WorkerLeaseRegistry {
    /// Create a registry allowing at most `max_workers` live child leases.
    pub fn new(max_workers: usize) -> Result<Self> {
        if max_workers < 1 {
            return Err(anyhow!(
                "not a valid number of parallel workers: {max_workers}"
            ));
        }
        Ok(Self {
            budget: Arc::new(LeaseBudget {
                max_children: max_workers,
                active_children: Mutex::new(0),
            }),
        })
    }

    /// Split one child lease off the root.
    ///
    /// Fails if the budget is already fully allocated; the executor creates
    /// exactly one child per worker, so this only trips on misuse.
    pub fn create_child(&self) -> Result<WorkerLease> {
        let mut active = self.budget.active_children.lock();
        if *active >= self.budget.max_children {
            return Err(anyhow!(
                "worker lease budget exhausted ({} leases live)",
                self.budget.max_children
            ));
        }
        *active += 1;
        Ok(WorkerLease {
            budget: Arc::clone(&self.budget),
        })
    }

    /// Number of child leases currently live.
    pub fn active_children(&self) -> usize {
        *self.budget.active_children.lock()
    }

    /// The configured upper bound on live children.
    pub fn max_children(&self) -> usize {
        self.budget.max_children
    }
}

/// One unit of the concurrency budget, held by a worker for its lifetime.
///
/// The slot is returned to the root on drop, on every exit path.
pub struct WorkerLease {
    budget: Arc<LeaseBudget>,
}

impl Drop for WorkerLease {
    fn drop(&mut self) {
        let mut active = self.budget.active_children.lock();
        debug_assert!(*active > 0, "lease released more than once");
        *active = active.saturating_sub(1);
    }
}
