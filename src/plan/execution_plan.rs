// src/plan/execution_plan.rs

use std::fmt;

use crate::errors::{Error, Result};
use crate::exec::lease::WorkerLease;
use crate::plan::node::NodeOutcome;

/// The contract between the executor core and the dependency graph.
///
/// All methods are called while the coordination gate is held, so
/// implementations need no internal locking; they must only uphold the state
/// invariants (a node is never handed out twice, transitions never move
/// backwards).
///
/// `populate_ready_queue` and `select_next` are the two operations that may
/// fail; an error from either is plan-fatal and aborts the whole run via
/// [`abort_all_and_fail`](ExecutionPlan::abort_all_and_fail).
pub trait ExecutionPlan: Send {
    /// Owned handle a worker holds while executing a node outside the gate.
    type Node: fmt::Display + Send;

    /// Label for diagnostics and worker-thread naming.
    fn display_name(&self) -> &str;

    /// True once every node is terminal (succeeded, failed, skipped or
    /// cancelled).
    fn all_nodes_complete(&self) -> bool;

    /// Append all captured node and plan failures. Called exactly once per
    /// run, after completion; failures are drained, not copied.
    fn collect_failures(&mut self, failures: &mut Vec<Error>);

    /// Mark all not-yet-selected nodes cancelled. Nodes already selected run
    /// to completion. Safe to call repeatedly.
    fn cancel_execution(&mut self);

    /// Promote every node whose dependencies are now satisfied into the
    /// ready queue. Idempotent; a no-op once nothing changed.
    fn populate_ready_queue(&mut self) -> Result<()>;

    /// True once enumeration is exhausted: every node has either been queued
    /// or gone terminal without queueing.
    fn all_nodes_queued(&self) -> bool;

    /// True while any non-terminal node exists.
    fn has_nodes_remaining(&self) -> bool;

    /// Atomically pick one ready node and reserve its exclusive resources
    /// against `lease`. Returns `None` when nothing is currently selectable.
    /// Reservations made during the attempt are recorded in `locks` so a
    /// failing selection can be rolled back.
    fn select_next(
        &mut self,
        lease: &WorkerLease,
        locks: &mut SelectionLocks,
    ) -> Result<Option<Self::Node>>;

    /// Roll back resource reservations recorded by a failed selection
    /// attempt.
    fn release_selection_locks(&mut self, locks: &mut SelectionLocks);

    /// Record the outcome of an executed node and release everything bound
    /// to it (exclusive resources, queue bookkeeping).
    fn node_complete(&mut self, node: Self::Node, outcome: NodeOutcome);

    /// Mark the whole run fatally failed: remaining unselected nodes are
    /// cancelled and `error` surfaces once through
    /// [`collect_failures`](ExecutionPlan::collect_failures).
    fn abort_all_and_fail(&mut self, error: Error);
}

/// Record of exclusive-resource reservations made during one selection
/// attempt, used to release them if the attempt fails partway.
#[derive(Debug, Default)]
pub struct SelectionLocks {
    resources: Vec<String>,
}

impl SelectionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Note that `resource` was reserved during the current attempt.
    pub fn record(&mut self, resource: String) {
        self.resources.push(resource);
    }

    /// Hand the reservations over to the selected node; from here on they
    /// are released by `node_complete`, not by rollback.
    pub fn clear(&mut self) {
        self.resources.clear();
    }

    pub fn drain(&mut self) -> Vec<String> {
        std::mem::take(&mut self.resources)
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}
