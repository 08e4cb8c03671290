// src/plan/graph.rs

use std::collections::HashMap;

use crate::plan::task_plan::TaskSpec;

/// Internal node structure: stores immediate deps and dependents.
#[derive(Debug, Clone)]
struct GraphNode {
    /// Direct dependencies: tasks that must succeed before this one can run.
    deps: Vec<String>,
    /// Direct dependents: tasks that depend on this one.
    dependents: Vec<String>,
}

/// Simple in-memory DAG representation keyed by task name.
///
/// This is intentionally lightweight; acyclicity is already validated in
/// `config::validate` (or assumed for programmatic builders), so here we just
/// keep adjacency information for readiness checks and failure propagation.
#[derive(Debug, Clone)]
pub struct PlanGraph {
    nodes: HashMap<String, GraphNode>,
}

impl PlanGraph {
    /// Build a DAG from task specs.
    ///
    /// Assumes that:
    /// - all `after` references are valid
    /// - there are no cycles
    pub fn from_specs(specs: &[TaskSpec]) -> Self {
        let mut nodes: HashMap<String, GraphNode> = HashMap::new();

        // First pass: create nodes with their dependency lists.
        for spec in specs {
            nodes.insert(
                spec.name.clone(),
                GraphNode {
                    deps: spec.after.clone(),
                    dependents: Vec::new(),
                },
            );
        }

        // Second pass: populate dependents based on deps.
        for spec in specs {
            for dep in &spec.after {
                if let Some(dep_node) = nodes.get_mut(dep) {
                    dep_node.dependents.push(spec.name.clone());
                }
            }
        }

        Self { nodes }
    }

    /// Immediate dependencies of a task (the tasks listed in its `after`).
    pub fn dependencies_of(&self, name: &str) -> &[String] {
        self.nodes
            .get(name)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate dependents of a task (tasks that list this one in their `after`).
    pub fn dependents_of(&self, name: &str) -> &[String] {
        self.nodes
            .get(name)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }
}
