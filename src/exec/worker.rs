// src/exec/worker.rs

//! The worker loop: repeatedly select one ready node under the gate, run it
//! unlocked, and record its completion back under the gate.
//!
//! Each worker splits one child lease off the run's lease registry for its
//! entire lifetime, which is what binds it to the global concurrency bound.
//! Node execution is the only code here that runs without the gate held; a
//! failure raised by the node's own work is captured as that node's outcome
//! and never aborts the run.

use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use crate::errors::Result;
use crate::exec::cancel::CancellationToken;
use crate::exec::coordination::{Coordinator, Disposition};
use crate::exec::lease::{WorkerLease, WorkerLeaseRegistry};
use crate::exec::stats::StatsCollector;
use crate::plan::{ExecutionPlan, NodeOutcome, SelectionLocks};

pub struct ExecutorWorker<'a, P: ExecutionPlan, F> {
    label: String,
    coordinator: &'a Coordinator<P>,
    node_action: &'a F,
    leases: &'a WorkerLeaseRegistry,
    cancellation: &'a CancellationToken,
    stats: &'a StatsCollector,
}

impl<'a, P, F> ExecutorWorker<'a, P, F>
where
    P: ExecutionPlan,
    F: Fn(&P::Node) -> Result<()> + Sync,
{
    pub fn new(
        label: String,
        coordinator: &'a Coordinator<P>,
        node_action: &'a F,
        leases: &'a WorkerLeaseRegistry,
        cancellation: &'a CancellationToken,
        stats: &'a StatsCollector,
    ) -> Self {
        Self {
            label,
            coordinator,
            node_action,
            leases,
            cancellation,
            stats,
        }
    }

    /// Loop until the plan has no nodes remaining, then publish stats.
    pub fn run(self) {
        let total = Instant::now();
        let mut busy = Duration::ZERO;
        let mut wait = Duration::ZERO;

        let lease = match self.leases.create_child() {
            Ok(lease) => lease,
            Err(err) => {
                // One child per worker is created against a registry sized to
                // the worker count, so this only trips on executor misuse.
                error!(worker = %self.label, error = %err, "could not obtain worker lease");
                return;
            }
        };

        loop {
            let nodes_remaining = self.execute_next_node(&lease, &mut busy, &mut wait);
            if !nodes_remaining {
                break;
            }
        }
        drop(lease);

        self.stats.record(self.label, total.elapsed(), busy, wait);
    }

    /// Select a node that is ready to execute and run the node action
    /// against it. If nothing is selectable but nodes remain, blocks until
    /// some state change is signalled.
    ///
    /// Returns `true` if nodes remain to execute, `false` once the worker
    /// should stop.
    fn execute_next_node(
        &self,
        lease: &WorkerLease,
        busy: &mut Duration,
        wait: &mut Duration,
    ) -> bool {
        let mut selected: Option<P::Node> = None;
        let mut nodes_remaining = false;

        self.coordinator.with_state_lock(|plan| {
            if self.cancellation.is_requested() {
                plan.cancel_execution();
            }

            nodes_remaining = plan.has_nodes_remaining();
            if !nodes_remaining {
                return Disposition::Finished;
            }

            let mut locks = SelectionLocks::new();
            let step = Instant::now();
            match plan.select_next(lease, &mut locks) {
                Ok(node) => {
                    *wait += step.elapsed();
                    selected = node;
                }
                Err(error) => {
                    // Plan-fatal: selection errors abort the whole run. Any
                    // resources this attempt had begun reserving are released
                    // before the abort is recorded.
                    plan.release_selection_locks(&mut locks);
                    plan.abort_all_and_fail(error);
                    self.coordinator.notify_state_change();
                    nodes_remaining = false;
                    return Disposition::Finished;
                }
            }

            if selected.is_none() && nodes_remaining {
                Disposition::Retry
            } else {
                Disposition::Finished
            }
        });

        if let Some(node) = selected {
            self.execute(node, busy);
        }
        nodes_remaining
    }

    /// Run one node outside the gate, then record its completion under the
    /// gate and wake everyone blocked on a state change.
    fn execute(&self, node: P::Node, busy: &mut Duration) {
        info!(worker = %self.label, node = %node, "node started");

        let run = Instant::now();
        let outcome = match (self.node_action)(&node) {
            Ok(()) => NodeOutcome::Success,
            Err(error) => {
                warn!(worker = %self.label, node = %node, error = %error, "node execution failed");
                NodeOutcome::Failed(error)
            }
        };
        let duration = run.elapsed();
        *busy += duration;

        info!(worker = %self.label, node = %node, ?duration, "node completed");

        let mut completion = Some((node, outcome));
        self.coordinator.with_state_lock(|plan| {
            if let Some((node, outcome)) = completion.take() {
                plan.node_complete(node, outcome);
            }
            Disposition::Finished
        });
        self.coordinator.notify_state_change();
    }
}
