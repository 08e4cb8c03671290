// src/plan/node.rs

use std::fmt;
use std::path::PathBuf;

use crate::errors::Error;

/// Public type alias for task names throughout the plan and executor.
pub type TaskName = String;

/// Lifecycle of a node within one run.
///
/// Transitions only move forward: `Waiting` → `Ready` → `Selected` → one of
/// the terminal states. `Skipped` and `Cancelled` are reached directly from
/// `Waiting`/`Ready` when an upstream failure or a cancellation makes the
/// node unrunnable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// Dependencies not yet satisfied; not in the ready queue.
    Waiting,
    /// All dependencies succeeded; sitting in the ready queue.
    Ready,
    /// Picked up by exactly one worker; executing (or about to).
    Selected,
    /// Terminal: ran to completion successfully (or was skipped as
    /// up-to-date by the checksum layer).
    Succeeded,
    /// Terminal: its own execution failed; the failure is captured.
    Failed,
    /// Terminal: never ran because an upstream dependency failed.
    Skipped,
    /// Terminal: never ran because the run was cancelled or aborted.
    Cancelled,
}

impl NodeState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            NodeState::Succeeded | NodeState::Failed | NodeState::Skipped | NodeState::Cancelled
        )
    }
}

/// Result of executing a node, handed back to the plan under the gate.
#[derive(Debug)]
pub enum NodeOutcome {
    Success,
    Failed(Error),
}

/// Handle to a selected node, owned by one worker for the unlocked
/// execution window.
///
/// This is deliberately a detached copy of the schedulable payload; all
/// per-run state stays inside the plan and is only touched under the gate.
#[derive(Debug, Clone)]
pub struct TaskNode {
    pub name: TaskName,
    /// Shell command to run, if this plan was built from config. Plans built
    /// programmatically (tests, library use) leave this empty and do all the
    /// work in the node action.
    pub cmd: Option<String>,
    /// Input files whose aggregate checksum decides skip-if-unchanged.
    pub inputs: Vec<PathBuf>,
}

impl fmt::Display for TaskNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task '{}'", self.name)
    }
}
