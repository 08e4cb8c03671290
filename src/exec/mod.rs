// src/exec/mod.rs

//! The execution core: scheduling ready nodes onto a bounded worker pool.
//!
//! - [`coordination`] is the single gate lock all plan decisions go through.
//! - [`lease`] bounds how many nodes run simultaneously.
//! - [`queuer`] promotes newly-unblocked nodes into the ready queue.
//! - [`worker`] is the select/execute/complete loop, one per pool slot.
//! - [`executor`] is the facade owning the pool lifecycle per `process()`.
//! - [`stats`] collects per-thread busy/idle/wait splits.
//! - [`cancel`] is the cooperative, polled cancellation flag.
//! - [`command`] runs config-defined task commands through the shell, with
//!   checksum-based skip-if-unchanged.

pub mod cancel;
pub mod command;
pub mod coordination;
pub mod executor;
pub mod lease;
pub mod queuer;
pub mod stats;
pub mod worker;

pub use cancel::CancellationToken;
pub use command::CommandRunner;
pub use coordination::{Coordinator, Disposition};
pub use executor::PlanExecutor;
pub use lease::{WorkerLease, WorkerLeaseRegistry};
pub use stats::{StatsCollector, WorkerStats};
