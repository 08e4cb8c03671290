// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [config]
/// workers = 4
/// checksum_algorithm = "blake3"
///
/// [task.gen]
/// cmd = "python gen.py"
///
/// [task.build]
/// cmd = "make build"
/// after = ["gen"]
/// resources = ["target-dir"]
/// inputs = ["Makefile", "src/main.c"]
/// ```
///
/// All sections are optional except the tasks themselves.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    /// Global behaviour config from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// All tasks from `[task.<name>]`.
    ///
    /// Keys are the *task names* (e.g. `"gen"`, `"build"`).
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Number of worker threads executing tasks in parallel.
    ///
    /// Defaults to the machine's available parallelism. Can be overridden
    /// per invocation with `--workers`.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Checksum algorithm for skip-if-unchanged (`blake3`, `sha256`,
    /// `sha512`).
    #[serde(default = "default_checksum_algorithm")]
    pub checksum_algorithm: String,
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn default_checksum_algorithm() -> String {
    "blake3".to_string()
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            checksum_algorithm: default_checksum_algorithm(),
        }
    }
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    /// The command to execute.
    pub cmd: String,

    /// Names of tasks that must succeed before this one runs.
    #[serde(default)]
    pub after: Vec<String>,

    /// Named exclusive resources: two tasks sharing a name never run
    /// concurrently, regardless of worker count.
    #[serde(default)]
    pub resources: Vec<String>,

    /// Input files; when set, the task is skipped while their aggregate
    /// checksum matches the last successful run.
    #[serde(default)]
    pub inputs: Vec<String>,
}
