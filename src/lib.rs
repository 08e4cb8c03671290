// src/lib.rs

pub mod checksum;
pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod plan;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Result, anyhow};
use tracing::{debug, error};

use crate::checksum::store::DEFAULT_STORE_PATH;
use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::exec::{CancellationToken, CommandRunner, PlanExecutor};
use crate::plan::TaskPlan;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - plan construction
/// - the bounded-parallelism plan executor
/// - the shell command backend with checksum-based skipping
pub fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let workers = args.workers.unwrap_or(cfg.config.workers);
    let display_name = plan_display_name(&config_path);

    let plan = TaskPlan::from_config(&cfg, &display_name);
    let runner = CommandRunner::new(&cfg.config.checksum_algorithm, DEFAULT_STORE_PATH)?;

    let cancellation = Arc::new(CancellationToken::new());
    let executor = PlanExecutor::new(workers, Arc::clone(&cancellation))?;

    let mut failures = Vec::new();
    executor.process(plan, &mut failures, |node| runner.run(node))?;

    for stats in executor.stats() {
        debug!(
            thread = %stats.label,
            busy = ?stats.busy,
            idle = ?stats.idle,
            wait = ?stats.wait,
            "executor thread stats"
        );
    }

    if !failures.is_empty() {
        for failure in &failures {
            error!("{failure:#}");
        }
        return Err(anyhow!("{} task(s) failed", failures.len()));
    }

    Ok(())
}

/// Name the plan after its config file, for worker naming and diagnostics.
fn plan_display_name(config_path: &Path) -> String {
    config_path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("plan")
        .to_string()
}

/// Simple dry-run output: print tasks, deps and commands.
fn print_dry_run(cfg: &ConfigFile) {
    println!("dagrun dry-run");
    println!("  config.workers = {}", cfg.config.workers);
    println!(
        "  config.checksum_algorithm = {}",
        cfg.config.checksum_algorithm
    );
    println!();

    println!("tasks ({}):", cfg.task.len());
    for (name, task) in cfg.task.iter() {
        println!("  - {name}");
        println!("      cmd: {}", task.cmd);
        if !task.after.is_empty() {
            println!("      after: {:?}", task.after);
        }
        if !task.resources.is_empty() {
            println!("      resources: {:?}", task.resources);
        }
        if !task.inputs.is_empty() {
            println!("      inputs: {:?}", task.inputs);
        }
    }

    debug!("dry-run complete (no execution)");
}
