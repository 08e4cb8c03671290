// src/exec/queuer.rs

//! The queuer: one control loop that promotes newly-unblocked nodes into the
//! plan's ready queue until the graph is fully enumerated.
//!
//! It runs inline on the thread that invoked `process()`, not on a pooled
//! worker, and spends its life inside the gate's retry protocol: each pass
//! observes cancellation, populates the ready queue, signals the state
//! change, and blocks until woken again unless enumeration is exhausted.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::exec::cancel::CancellationToken;
use crate::exec::coordination::{Coordinator, Disposition};
use crate::exec::stats::StatsCollector;
use crate::plan::ExecutionPlan;

pub struct PlanQueuer<'a, P: ExecutionPlan> {
    label: String,
    coordinator: &'a Coordinator<P>,
    cancellation: &'a CancellationToken,
    stats: &'a StatsCollector,
}

impl<'a, P: ExecutionPlan> PlanQueuer<'a, P> {
    pub fn new(
        label: String,
        coordinator: &'a Coordinator<P>,
        cancellation: &'a CancellationToken,
        stats: &'a StatsCollector,
    ) -> Self {
        Self {
            label,
            coordinator,
            cancellation,
            stats,
        }
    }

    /// Run until the plan reports full enumeration, then publish stats.
    /// The queuer executes no nodes, so its busy time is always zero.
    pub fn run(self) {
        let total = Instant::now();
        let mut active = Duration::ZERO;

        self.queue_nodes(&mut active);

        debug!(queuer = %self.label, "ready-queue enumeration exhausted");
        self.stats
            .record(self.label, total.elapsed(), Duration::ZERO, active);
    }

    fn queue_nodes(&self, active: &mut Duration) {
        // Enumeration runs under the full gate even though it only touches
        // the ready queue; a narrower lock has not been shown safe, so the
        // conservative one stays.
        self.coordinator.with_state_lock(|plan| {
            if self.cancellation.is_requested() {
                plan.cancel_execution();
            }

            let all_queued;
            let step = Instant::now();
            match plan.populate_ready_queue() {
                Ok(()) => {
                    *active += step.elapsed();
                    all_queued = plan.all_nodes_queued();
                }
                Err(error) => {
                    // Plan-fatal: enumeration errors abort the whole run and
                    // end this loop by treating enumeration as complete.
                    plan.abort_all_and_fail(error);
                    all_queued = true;
                }
            }
            self.coordinator.notify_state_change();

            if all_queued {
                Disposition::Finished
            } else {
                Disposition::Retry
            }
        });
    }
}
