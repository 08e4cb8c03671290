// src/config/validate.rs

use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::checksum::Algorithm;
use crate::config::model::ConfigFile;

/// Run basic semantic validation against a loaded configuration.
///
/// This checks:
/// - there is at least one task
/// - `workers >= 1`
/// - `checksum_algorithm` is a supported algorithm name
/// - all `after` dependencies refer to existing tasks
/// - the task graph has no cycles
pub fn validate_config(cfg: &ConfigFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_global_config(cfg)?;
    validate_task_dependencies(cfg)?;
    validate_dag(cfg)?;
    Ok(())
}

fn ensure_has_tasks(cfg: &ConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(anyhow!(
            "config must contain at least one [task.<name>] section"
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &ConfigFile) -> Result<()> {
    if cfg.config.workers == 0 {
        return Err(anyhow!("[config].workers must be >= 1 (got 0)"));
    }

    Algorithm::from_str(&cfg.config.checksum_algorithm)
        .context("invalid [config].checksum_algorithm")?;

    Ok(())
}

fn validate_task_dependencies(cfg: &ConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        for dep in task.after.iter() {
            if !cfg.task.contains_key(dep) {
                return Err(anyhow!(
                    "task '{}' has unknown dependency '{}' in `after`",
                    name,
                    dep
                ));
            }
            if dep == name {
                return Err(anyhow!(
                    "task '{}' cannot depend on itself in `after`",
                    name
                ));
            }
        }
    }
    Ok(())
}

fn validate_dag(cfg: &ConfigFile) -> Result<()> {
    // Build a simple petgraph graph from the tasks and their dependencies.
    //
    // Edge direction: dep -> task
    // For:
    //   [task.build]
    //   after = ["gen"]
    // we add edge gen -> build.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.task.keys() {
        graph.add_node(name.as_str());
    }

    for (name, task) in cfg.task.iter() {
        for dep in task.after.iter() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    // A topological sort will fail if there is a cycle.
    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => {
            let node = cycle.node_id();
            Err(anyhow!(
                "cycle detected in task DAG involving task '{}'",
                node
            ))
        }
    }
}
