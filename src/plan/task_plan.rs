// src/plan/task_plan.rs

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::config::model::ConfigFile;
use crate::errors::{Error, Result};
use crate::exec::lease::WorkerLease;
use crate::plan::execution_plan::{ExecutionPlan, SelectionLocks};
use crate::plan::graph::PlanGraph;
use crate::plan::node::{NodeOutcome, NodeState, TaskName, TaskNode};

/// Static description of one task, used to build a [`TaskPlan`].
#[derive(Debug, Clone)]
pub struct TaskSpec {
    pub name: TaskName,
    pub cmd: Option<String>,
    /// Names of tasks that must succeed before this one can run.
    pub after: Vec<TaskName>,
    /// Named exclusive resources this task needs for the duration of its
    /// execution. Two tasks sharing a resource name never run concurrently.
    pub resources: Vec<String>,
    /// Input files for checksum-based skip-if-unchanged.
    pub inputs: Vec<PathBuf>,
}

impl TaskSpec {
    pub fn new(name: impl Into<TaskName>) -> Self {
        Self {
            name: name.into(),
            cmd: None,
            after: Vec::new(),
            resources: Vec::new(),
            inputs: Vec::new(),
        }
    }

    pub fn after(mut self, deps: &[&str]) -> Self {
        self.after = deps.iter().map(|d| d.to_string()).collect();
        self
    }

    pub fn cmd(mut self, cmd: impl Into<String>) -> Self {
        self.cmd = Some(cmd.into());
        self
    }

    pub fn resource(mut self, resource: impl Into<String>) -> Self {
        self.resources.push(resource.into());
        self
    }

    pub fn input(mut self, path: impl Into<PathBuf>) -> Self {
        self.inputs.push(path.into());
        self
    }
}

/// Static task information plus per-run state.
#[derive(Debug)]
struct NodeEntry {
    state: NodeState,
    cmd: Option<String>,
    inputs: Vec<PathBuf>,
    resources: Vec<String>,
    /// Captured execution failure, drained once by `collect_failures`.
    failure: Option<Error>,
}

/// Default [`ExecutionPlan`] implementation.
///
/// Owns the full node set, the ready queue and the exclusive-resource table.
/// Everything here is mutated only under the coordination gate, so no
/// internal locking is needed.
pub struct TaskPlan {
    display_name: String,
    graph: PlanGraph,
    nodes: BTreeMap<TaskName, NodeEntry>,
    /// Nodes whose dependencies are satisfied, awaiting selection.
    ready: VecDeque<TaskName>,
    /// Exclusive resources currently reserved, keyed by resource name, with
    /// the holding task as value.
    held_resources: HashMap<String, TaskName>,
    /// Plan-fatal failures recorded via `abort_all_and_fail`.
    plan_failures: Vec<Error>,
}

impl TaskPlan {
    pub fn builder(display_name: impl Into<String>) -> TaskPlanBuilder {
        TaskPlanBuilder {
            display_name: display_name.into(),
            specs: Vec::new(),
        }
    }

    /// Construct a plan from a validated [`ConfigFile`].
    pub fn from_config(cfg: &ConfigFile, display_name: &str) -> Self {
        let mut builder = Self::builder(display_name);
        for (name, task) in cfg.task.iter() {
            let mut spec = TaskSpec::new(name.clone()).cmd(task.cmd.clone());
            spec.after = task.after.clone();
            spec.resources = task.resources.clone();
            spec.inputs = task.inputs.iter().map(PathBuf::from).collect();
            builder = builder.spec(spec);
        }
        builder.build()
    }

    /// Per-run state of a node, for diagnostics and assertions.
    pub fn state_of(&self, name: &str) -> Option<NodeState> {
        self.nodes.get(name).map(|entry| entry.state)
    }

    /// Check whether all dependencies of `name` succeeded.
    fn deps_satisfied(&self, name: &str) -> bool {
        self.graph
            .dependencies_of(name)
            .iter()
            .all(|dep| matches!(self.state_of(dep), Some(NodeState::Succeeded)))
    }

    /// Reserve all exclusive resources of `name`, all-or-nothing.
    ///
    /// Reservations are recorded in `locks` so a selection that fails after
    /// this point can be rolled back by the worker.
    fn try_reserve_resources(&mut self, name: &str, locks: &mut SelectionLocks) -> bool {
        let resources = self
            .nodes
            .get(name)
            .map(|entry| entry.resources.clone())
            .unwrap_or_default();

        if resources
            .iter()
            .any(|resource| self.held_resources.contains_key(resource))
        {
            return false;
        }

        for resource in resources {
            self.held_resources
                .insert(resource.clone(), name.to_string());
            locks.record(resource);
        }
        true
    }

    /// Mark all waiting/ready transitive dependents of a failed task as
    /// `Skipped`. Nodes already selected or terminal are left alone.
    fn mark_dependents_skipped(&mut self, failed_task: &str) {
        let mut stack: Vec<TaskName> = self
            .graph
            .dependents_of(failed_task)
            .iter()
            .cloned()
            .collect();

        while let Some(name) = stack.pop() {
            if let Some(entry) = self.nodes.get_mut(&name) {
                match entry.state {
                    NodeState::Waiting | NodeState::Ready => {
                        entry.state = NodeState::Skipped;
                        debug!(
                            task = %name,
                            "skipping dependent due to upstream failure"
                        );
                        self.ready.retain(|queued| queued != &name);
                        stack.extend(self.graph.dependents_of(&name).iter().cloned());
                    }
                    NodeState::Selected
                    | NodeState::Succeeded
                    | NodeState::Failed
                    | NodeState::Skipped
                    | NodeState::Cancelled => {}
                }
            }
        }
    }

    /// Cancel every node that has not been selected yet.
    fn cancel_unselected(&mut self) {
        let mut cancelled = 0usize;
        for (name, entry) in self.nodes.iter_mut() {
            if matches!(entry.state, NodeState::Waiting | NodeState::Ready) {
                entry.state = NodeState::Cancelled;
                cancelled += 1;
                debug!(task = %name, "task cancelled before selection");
            }
        }
        self.ready.clear();
        if cancelled > 0 {
            debug!(cancelled, "cancelled remaining unscheduled tasks");
        }
    }
}

impl ExecutionPlan for TaskPlan {
    type Node = TaskNode;

    fn display_name(&self) -> &str {
        &self.display_name
    }

    fn all_nodes_complete(&self) -> bool {
        self.nodes.values().all(|entry| entry.state.is_terminal())
    }

    fn collect_failures(&mut self, failures: &mut Vec<Error>) {
        failures.extend(self.plan_failures.drain(..));
        for entry in self.nodes.values_mut() {
            if let Some(failure) = entry.failure.take() {
                failures.push(failure);
            }
        }
    }

    fn cancel_execution(&mut self) {
        self.cancel_unselected();
    }

    fn populate_ready_queue(&mut self) -> Result<()> {
        // Two passes to avoid borrowing conflicts: decide, then mutate.
        let candidates: Vec<TaskName> = self
            .nodes
            .iter()
            .filter_map(|(name, entry)| {
                if entry.state == NodeState::Waiting && self.deps_satisfied(name) {
                    Some(name.clone())
                } else {
                    None
                }
            })
            .collect();

        for name in candidates {
            if let Some(entry) = self.nodes.get_mut(&name) {
                entry.state = NodeState::Ready;
                self.ready.push_back(name.clone());
                debug!(task = %name, "dependencies satisfied; queued as ready");
            }
        }

        Ok(())
    }

    fn all_nodes_queued(&self) -> bool {
        !self
            .nodes
            .values()
            .any(|entry| entry.state == NodeState::Waiting)
    }

    fn has_nodes_remaining(&self) -> bool {
        self.nodes.values().any(|entry| !entry.state.is_terminal())
    }

    fn select_next(
        &mut self,
        _lease: &WorkerLease,
        locks: &mut SelectionLocks,
    ) -> Result<Option<TaskNode>> {
        // Walk the ready queue in order; a node whose exclusive resources are
        // busy is left queued and the next candidate is considered.
        let mut index = 0;
        while index < self.ready.len() {
            let name = self.ready[index].clone();
            if !self.try_reserve_resources(&name, locks) {
                index += 1;
                continue;
            }

            self.ready.remove(index);
            if let Some(entry) = self.nodes.get_mut(&name) {
                entry.state = NodeState::Selected;
                let node = TaskNode {
                    name: name.clone(),
                    cmd: entry.cmd.clone(),
                    inputs: entry.inputs.clone(),
                };
                // Reservations now belong to the node; node_complete releases
                // them, not selection rollback.
                locks.clear();
                debug!(task = %name, "node selected");
                return Ok(Some(node));
            }
        }

        Ok(None)
    }

    fn release_selection_locks(&mut self, locks: &mut SelectionLocks) {
        for resource in locks.drain() {
            self.held_resources.remove(&resource);
        }
    }

    fn node_complete(&mut self, node: TaskNode, outcome: NodeOutcome) {
        self.held_resources.retain(|_, holder| holder != &node.name);

        match self.nodes.get_mut(&node.name) {
            Some(entry) => match outcome {
                NodeOutcome::Success => {
                    entry.state = NodeState::Succeeded;
                    debug!(task = %node.name, "node completed successfully");
                }
                NodeOutcome::Failed(error) => {
                    entry.state = NodeState::Failed;
                    entry.failure =
                        Some(error.context(format!("task '{}' failed", node.name)));
                    warn!(task = %node.name, "node failed; skipping dependents");
                    self.mark_dependents_skipped(&node.name);
                }
            },
            None => {
                warn!(task = %node.name, "completion for unknown task; ignoring");
            }
        }
    }

    fn abort_all_and_fail(&mut self, error: Error) {
        warn!(error = %error, "plan aborted; cancelling remaining work");
        self.plan_failures.push(error);
        self.cancel_unselected();
    }
}

/// Builder for plans assembled in code (tests, library callers).
pub struct TaskPlanBuilder {
    display_name: String,
    specs: Vec<TaskSpec>,
}

impl TaskPlanBuilder {
    /// Add a task with dependencies and no payload beyond its name.
    pub fn task(self, name: &str, after: &[&str]) -> Self {
        self.spec(TaskSpec::new(name).after(after))
    }

    pub fn spec(mut self, spec: TaskSpec) -> Self {
        self.specs.push(spec);
        self
    }

    /// Assemble the plan. Assumes specs form a valid DAG; config-driven
    /// callers go through `config::validate` first.
    pub fn build(self) -> TaskPlan {
        let graph = PlanGraph::from_specs(&self.specs);

        let mut nodes = BTreeMap::new();
        for spec in self.specs {
            nodes.insert(
                spec.name.clone(),
                NodeEntry {
                    state: NodeState::Waiting,
                    cmd: spec.cmd,
                    inputs: spec.inputs,
                    resources: spec.resources,
                    failure: None,
                },
            );
        }

        TaskPlan {
            display_name: self.display_name,
            graph,
            nodes,
            ready: VecDeque::new(),
            held_resources: HashMap::new(),
            plan_failures: Vec::new(),
        }
    }
}
