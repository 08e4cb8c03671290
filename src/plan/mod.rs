// src/plan/mod.rs

//! The execution plan: the dependency-graph collaborator of the executor.
//!
//! - [`execution_plan`] defines the contract the executor drives
//!   ([`ExecutionPlan`]) and the selection-lock rollback record.
//! - [`node`] holds the node handle a worker owns while executing, plus
//!   node states and outcomes.
//! - [`graph`] keeps the dependency adjacency (deps and dependents).
//! - [`task_plan`] is the default implementation: per-node state machine,
//!   ready queue, exclusive-resource bookkeeping, failure propagation.

pub mod execution_plan;
pub mod graph;
pub mod node;
pub mod task_plan;

pub use execution_plan::{ExecutionPlan, SelectionLocks};
pub use graph::PlanGraph;
pub use node::{NodeOutcome, NodeState, TaskName, TaskNode};
pub use task_plan::{TaskPlan, TaskPlanBuilder, TaskSpec};
