use std::error::Error;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::anyhow;

use dagrun::exec::{CancellationToken, PlanExecutor, WorkerLease};
use dagrun::plan::{
    ExecutionPlan, NodeOutcome, NodeState, SelectionLocks, TaskNode, TaskPlan,
};

type TestResult = Result<(), Box<dyn Error>>;

fn executor(workers: usize) -> PlanExecutor {
    PlanExecutor::new(workers, Arc::new(CancellationToken::new())).unwrap()
}

#[test]
fn failed_node_skips_dependents_but_not_independent_siblings() -> TestResult {
    let plan = TaskPlan::builder("partial-failure")
        .task("A", &[])
        .task("B", &["A"])
        .task("C", &[])
        .build();

    let executor = executor(2);
    let mut failures = Vec::new();

    let plan = executor.process(plan, &mut failures, |node: &TaskNode| {
        if node.name == "A" {
            Err(anyhow!("boom"))
        } else {
            Ok(())
        }
    })?;

    assert_eq!(failures.len(), 1);
    assert!(format!("{:#}", failures[0]).contains("task 'A' failed"));
    assert_eq!(plan.state_of("A"), Some(NodeState::Failed));
    assert_eq!(plan.state_of("B"), Some(NodeState::Skipped));
    assert_eq!(plan.state_of("C"), Some(NodeState::Succeeded));
    Ok(())
}

#[test]
fn failure_skips_transitive_dependents() -> TestResult {
    let plan = TaskPlan::builder("transitive")
        .task("A", &[])
        .task("B", &["A"])
        .task("C", &["B"])
        .build();

    let executor = executor(2);
    let mut failures = Vec::new();

    let plan = executor.process(plan, &mut failures, |node: &TaskNode| {
        if node.name == "A" {
            Err(anyhow!("boom"))
        } else {
            Ok(())
        }
    })?;

    assert_eq!(failures.len(), 1);
    assert_eq!(plan.state_of("B"), Some(NodeState::Skipped));
    assert_eq!(plan.state_of("C"), Some(NodeState::Skipped));
    Ok(())
}

/// Plan wrapper whose selection fails: exercises the plan-fatal path.
struct FailingSelection {
    inner: TaskPlan,
}

impl ExecutionPlan for FailingSelection {
    type Node = TaskNode;

    fn display_name(&self) -> &str {
        self.inner.display_name()
    }
    fn all_nodes_complete(&self) -> bool {
        self.inner.all_nodes_complete()
    }
    fn collect_failures(&mut self, failures: &mut Vec<anyhow::Error>) {
        self.inner.collect_failures(failures)
    }
    fn cancel_execution(&mut self) {
        self.inner.cancel_execution()
    }
    fn populate_ready_queue(&mut self) -> anyhow::Result<()> {
        self.inner.populate_ready_queue()
    }
    fn all_nodes_queued(&self) -> bool {
        self.inner.all_nodes_queued()
    }
    fn has_nodes_remaining(&self) -> bool {
        self.inner.has_nodes_remaining()
    }
    fn select_next(
        &mut self,
        _lease: &WorkerLease,
        _locks: &mut SelectionLocks,
    ) -> anyhow::Result<Option<TaskNode>> {
        Err(anyhow!("selection exploded"))
    }
    fn release_selection_locks(&mut self, locks: &mut SelectionLocks) {
        self.inner.release_selection_locks(locks)
    }
    fn node_complete(&mut self, node: TaskNode, outcome: NodeOutcome) {
        self.inner.node_complete(node, outcome)
    }
    fn abort_all_and_fail(&mut self, error: anyhow::Error) {
        self.inner.abort_all_and_fail(error)
    }
}

#[test]
fn selection_failure_aborts_run_before_any_execution() -> TestResult {
    let inner = TaskPlan::builder("select-fails")
        .task("A", &[])
        .task("B", &[])
        .build();
    let plan = FailingSelection { inner };

    let executed = AtomicUsize::new(0);
    let executor = executor(2);
    let mut failures = Vec::new();

    let plan = executor.process(plan, &mut failures, |_node: &TaskNode| {
        executed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    })?;

    assert_eq!(executed.load(Ordering::SeqCst), 0);
    assert_eq!(failures.len(), 1);
    assert!(failures[0].to_string().contains("selection exploded"));
    assert!(plan.all_nodes_complete());
    assert_eq!(plan.inner.state_of("A"), Some(NodeState::Cancelled));
    assert_eq!(plan.inner.state_of("B"), Some(NodeState::Cancelled));
    Ok(())
}

/// Plan wrapper whose enumeration fails: exercises the queuer's fatal path.
struct FailingEnumeration {
    inner: TaskPlan,
}

impl ExecutionPlan for FailingEnumeration {
    type Node = TaskNode;

    fn display_name(&self) -> &str {
        self.inner.display_name()
    }
    fn all_nodes_complete(&self) -> bool {
        self.inner.all_nodes_complete()
    }
    fn collect_failures(&mut self, failures: &mut Vec<anyhow::Error>) {
        self.inner.collect_failures(failures)
    }
    fn cancel_execution(&mut self) {
        self.inner.cancel_execution()
    }
    fn populate_ready_queue(&mut self) -> anyhow::Result<()> {
        Err(anyhow!("enumeration exploded"))
    }
    fn all_nodes_queued(&self) -> bool {
        self.inner.all_nodes_queued()
    }
    fn has_nodes_remaining(&self) -> bool {
        self.inner.has_nodes_remaining()
    }
    fn select_next(
        &mut self,
        lease: &WorkerLease,
        locks: &mut SelectionLocks,
    ) -> anyhow::Result<Option<TaskNode>> {
        self.inner.select_next(lease, locks)
    }
    fn release_selection_locks(&mut self, locks: &mut SelectionLocks) {
        self.inner.release_selection_locks(locks)
    }
    fn node_complete(&mut self, node: TaskNode, outcome: NodeOutcome) {
        self.inner.node_complete(node, outcome)
    }
    fn abort_all_and_fail(&mut self, error: anyhow::Error) {
        self.inner.abort_all_and_fail(error)
    }
}

#[test]
fn enumeration_failure_aborts_run_before_any_execution() -> TestResult {
    let inner = TaskPlan::builder("populate-fails")
        .task("A", &[])
        .task("B", &["A"])
        .build();
    let plan = FailingEnumeration { inner };

    let executed = AtomicUsize::new(0);
    let executor = executor(2);
    let mut failures = Vec::new();

    let plan = executor.process(plan, &mut failures, |_node: &TaskNode| {
        executed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    })?;

    assert_eq!(executed.load(Ordering::SeqCst), 0);
    assert_eq!(failures.len(), 1);
    assert!(failures[0].to_string().contains("enumeration exploded"));
    assert!(plan.all_nodes_complete());
    Ok(())
}

#[test]
fn multiple_node_failures_all_drain_once() -> TestResult {
    let plan = TaskPlan::builder("two-failures")
        .task("A", &[])
        .task("B", &[])
        .task("C", &[])
        .build();

    let executor = executor(2);
    let mut failures = Vec::new();

    executor.process(plan, &mut failures, |node: &TaskNode| {
        if node.name == "C" {
            Ok(())
        } else {
            Err(anyhow!("{} broke", node.name))
        }
    })?;

    assert_eq!(failures.len(), 2);
    let rendered: Vec<String> = failures.iter().map(|f| format!("{f:#}")).collect();
    assert!(rendered.iter().any(|m| m.contains("task 'A' failed")));
    assert!(rendered.iter().any(|m| m.contains("task 'B' failed")));
    Ok(())
}
