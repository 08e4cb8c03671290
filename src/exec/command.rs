// src/exec/command.rs

use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::str::FromStr;

use anyhow::{Context, anyhow};
use tracing::{debug, info};

use crate::checksum::{Algorithm, ChecksumService, ChecksumStore};
use crate::errors::Result;
use crate::plan::TaskNode;

/// Node action for config-driven plans: runs each task's command through the
/// platform shell.
///
/// Tasks that declare `inputs` are skipped when their aggregate input digest
/// matches the one stored from the last successful run; on success the new
/// digest is stored. Tasks without inputs always run.
pub struct CommandRunner {
    checksums: ChecksumService,
    store: ChecksumStore,
    algorithm: Algorithm,
}

impl CommandRunner {
    pub fn new(algorithm: &str, store_path: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            checksums: ChecksumService::new(),
            store: ChecksumStore::open(store_path)?,
            algorithm: Algorithm::from_str(algorithm)?,
        })
    }

    /// Execute one node. An `Err` here is a node-local failure: the executor
    /// captures it onto the node and the rest of the plan continues.
    pub fn run(&self, node: &TaskNode) -> Result<()> {
        if node.inputs.is_empty() {
            return self.run_command(node);
        }

        let digest = self
            .checksums
            .aggregate(&node.inputs, self.algorithm.name())
            .with_context(|| format!("checksumming inputs of task '{}'", node.name))?;

        if self.store.get(&node.name).as_deref() == Some(digest.as_str()) {
            info!(task = %node.name, "inputs unchanged; skipping command");
            return Ok(());
        }

        self.run_command(node)?;
        self.store.put(&node.name, &digest)?;
        Ok(())
    }

    fn run_command(&self, node: &TaskNode) -> Result<()> {
        let cmd_line = node
            .cmd
            .as_deref()
            .ok_or_else(|| anyhow!("task '{}' has no command to run", node.name))?;

        info!(task = %node.name, cmd = %cmd_line, "starting task process");

        // Build a shell command appropriate for the platform.
        let mut cmd = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(cmd_line);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(cmd_line);
            c
        };

        let output = cmd
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("spawning process for task '{}'", node.name))?;

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            debug!(task = %node.name, "stdout: {}", line);
        }
        for line in String::from_utf8_lossy(&output.stderr).lines() {
            debug!(task = %node.name, "stderr: {}", line);
        }

        let code = output.status.code().unwrap_or(-1);
        info!(
            task = %node.name,
            exit_code = code,
            success = output.status.success(),
            "task process exited"
        );

        if !output.status.success() {
            return Err(anyhow!("command exited with status {code}: {cmd_line}"));
        }
        Ok(())
    }
}
