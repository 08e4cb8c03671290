// src/exec/executor.rs

//! The plan executor facade: owns the worker-pool lifecycle for one
//! `process()` call.
//!
//! Workers are spawned in a `std::thread::scope`, so the pool is torn down
//! (joined) on every exit path of `process()`, never persisted. The queuer
//! runs inline on the calling thread, and completion is awaited through the
//! same gate retry protocol the workers use.

use std::sync::Arc;

use tracing::debug;

use crate::errors::{Error, Result};
use crate::exec::cancel::CancellationToken;
use crate::exec::coordination::{Coordinator, Disposition};
use crate::exec::lease::WorkerLeaseRegistry;
use crate::exec::queuer::PlanQueuer;
use crate::exec::stats::{StatsCollector, WorkerStats};
use crate::exec::worker::ExecutorWorker;
use crate::plan::ExecutionPlan;
use anyhow::anyhow;

pub struct PlanExecutor {
    worker_count: usize,
    cancellation: Arc<CancellationToken>,
    stats: StatsCollector,
}

impl PlanExecutor {
    /// Create an executor with a fixed worker count, shared with a
    /// cancellation token the caller may trip at any time.
    pub fn new(worker_count: usize, cancellation: Arc<CancellationToken>) -> Result<Self> {
        if worker_count < 1 {
            return Err(anyhow!(
                "not a valid number of parallel workers: {worker_count}"
            ));
        }
        Ok(Self {
            worker_count,
            cancellation,
            stats: StatsCollector::new(),
        })
    }

    /// Run `plan` to completion.
    ///
    /// Blocks until every node in the plan is terminal, then drains all
    /// captured failures into `failures` exactly once and hands the
    /// completed plan back for inspection. The worker pool is scoped to this
    /// call and joined unconditionally before returning.
    pub fn process<P, F>(&self, plan: P, failures: &mut Vec<Error>, node_action: F) -> Result<P>
    where
        P: ExecutionPlan,
        F: Fn(&P::Node) -> Result<()> + Sync,
    {
        let display_name = plan.display_name().to_string();
        debug!(
            plan = %display_name,
            workers = self.worker_count,
            "starting plan execution"
        );

        let leases = WorkerLeaseRegistry::new(self.worker_count)?;
        let coordinator = Coordinator::new(plan);

        std::thread::scope(|scope| {
            for i in 0..self.worker_count {
                let worker = ExecutorWorker::new(
                    format!("{display_name} worker {}", i + 1),
                    &coordinator,
                    &node_action,
                    &leases,
                    &self.cancellation,
                    &self.stats,
                );
                scope.spawn(|| worker.run());
            }

            let queuer = PlanQueuer::new(
                format!("{display_name} queuer"),
                &coordinator,
                &self.cancellation,
                &self.stats,
            );
            queuer.run();

            self.await_completion(&coordinator, failures);
            // Leaving the scope joins all workers, whether or not the steps
            // above completed normally.
        });

        debug!(plan = %display_name, failures = failures.len(), "plan execution finished");
        Ok(coordinator.into_state())
    }

    /// Blocks until all nodes in the plan have been processed. Returns only
    /// when every node has either completed, failed or been skipped.
    fn await_completion<P: ExecutionPlan>(
        &self,
        coordinator: &Coordinator<P>,
        failures: &mut Vec<Error>,
    ) {
        coordinator.with_state_lock(|plan| {
            if plan.all_nodes_complete() {
                plan.collect_failures(failures);
                Disposition::Finished
            } else {
                Disposition::Retry
            }
        });
    }

    /// Accumulated per-thread stats from all runs so far: one entry per
    /// worker plus one for the queuer, per `process()` call.
    pub fn stats(&self) -> Vec<WorkerStats> {
        self.stats.snapshot()
    }
}
