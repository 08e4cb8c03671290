use std::error::Error;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use dagrun::exec::{CancellationToken, PlanExecutor, WorkerLeaseRegistry};
use dagrun::plan::{TaskNode, TaskPlan, TaskSpec};

type TestResult = Result<(), Box<dyn Error>>;

fn executor(workers: usize) -> PlanExecutor {
    PlanExecutor::new(workers, Arc::new(CancellationToken::new())).unwrap()
}

/// Tracks how many node executions overlap, and the highest overlap seen.
#[derive(Default)]
struct LiveCounter {
    live: AtomicUsize,
    peak: AtomicUsize,
}

impl LiveCounter {
    fn enter(&self) -> usize {
        let now = self.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        now
    }

    fn exit(&self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[test]
fn concurrency_never_exceeds_worker_count() -> TestResult {
    let mut builder = TaskPlan::builder("wide");
    for i in 0..12 {
        builder = builder.task(&format!("t{i:02}"), &[]);
    }
    let plan = builder.build();

    let counter = LiveCounter::default();
    let executor = executor(3);
    let mut failures = Vec::new();

    executor.process(plan, &mut failures, |_node: &TaskNode| {
        let live = counter.enter();
        assert!(live <= 3, "live executions {live} exceeded worker count");
        std::thread::sleep(Duration::from_millis(15));
        counter.exit();
        Ok(())
    })?;

    assert!(failures.is_empty());
    assert!(counter.peak() <= 3);
    assert!(counter.peak() >= 1);
    Ok(())
}

#[test]
fn independent_nodes_do_run_in_parallel() -> TestResult {
    let plan = TaskPlan::builder("parallel")
        .task("A", &[])
        .task("B", &[])
        .task("C", &[])
        .task("D", &[])
        .build();

    let counter = LiveCounter::default();
    let executor = executor(4);
    let mut failures = Vec::new();

    executor.process(plan, &mut failures, |_node: &TaskNode| {
        counter.enter();
        std::thread::sleep(Duration::from_millis(50));
        counter.exit();
        Ok(())
    })?;

    assert!(failures.is_empty());
    // Four 50ms nodes on four workers: overlap is effectively guaranteed.
    assert!(counter.peak() >= 2, "peak was {}", counter.peak());
    Ok(())
}

#[test]
fn shared_exclusive_resource_serializes_holders() -> TestResult {
    let plan = TaskPlan::builder("resource")
        .spec(TaskSpec::new("A").resource("db"))
        .spec(TaskSpec::new("B").resource("db"))
        .spec(TaskSpec::new("C"))
        .build();

    let in_resource = LiveCounter::default();
    let executor = executor(3);
    let mut failures = Vec::new();

    executor.process(plan, &mut failures, |node: &TaskNode| {
        if node.name != "C" {
            let live = in_resource.enter();
            assert_eq!(live, 1, "two holders of 'db' ran concurrently");
            std::thread::sleep(Duration::from_millis(20));
            in_resource.exit();
        }
        Ok(())
    })?;

    assert!(failures.is_empty());
    assert_eq!(in_resource.peak(), 1);
    Ok(())
}

#[test]
fn lease_registry_enforces_its_budget() -> TestResult {
    let registry = WorkerLeaseRegistry::new(2)?;
    assert_eq!(registry.max_children(), 2);

    let first = registry.create_child()?;
    let second = registry.create_child()?;
    assert_eq!(registry.active_children(), 2);
    assert!(registry.create_child().is_err());

    drop(first);
    assert_eq!(registry.active_children(), 1);
    let _third = registry.create_child()?;
    assert_eq!(registry.active_children(), 2);

    drop(second);
    drop(_third);
    assert_eq!(registry.active_children(), 0);
    Ok(())
}

#[test]
fn zero_lease_budget_is_rejected() {
    assert!(WorkerLeaseRegistry::new(0).is_err());
}
