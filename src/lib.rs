// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;

use std::path::PathBuf;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::JobFile;
use crate::config::loader::load_and_validate;
use crate::engine::{Runtime, RuntimeEvent, RuntimeOptions};
use crate::exec::ShellExecutor;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - job file loading
/// - bus / graph scheduler / runtime
/// - shell executor
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;

    if args.dry_run {
        print_dry_run(&cfg)?;
        return Ok(());
    }

    let options = RuntimeOptions::from_job_file(&cfg)?;

    // Runtime event channel.
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);

    let executor = ShellExecutor::new(rt_tx.clone());

    // Ctrl-C → graceful shutdown.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }

    let runtime = Runtime::new(&cfg, rt_rx, executor, options);
    let summary = runtime.run().await?;

    if summary.interrupted {
        warn!(
            started = summary.started,
            completed = summary.completed,
            "run interrupted"
        );
    } else {
        info!(
            completed = summary.completed,
            failed = ?summary.failed,
            "run finished"
        );
    }

    Ok(())
}

/// Simple dry-run output: print jobs, deps, commands and one valid order.
fn print_dry_run(cfg: &JobFile) -> Result<()> {
    println!("jobdag dry-run");
    println!("  config.fail_fast = {}", cfg.config.fail_fast);
    if let Some(ref timeout) = cfg.config.timeout {
        println!("  config.timeout = {timeout}");
    }
    println!();

    println!("jobs ({}):", cfg.job.len());
    for (name, job) in cfg.job.iter() {
        println!("  - {name}");
        println!("      cmd: {}", job.cmd);
        if !job.after.is_empty() {
            println!("      after: {:?}", job.after);
        }
    }

    let order = cfg.graph().check_acyclic()?;
    println!();
    println!("one possible start order: {}", order.join(" -> "));

    debug!("dry-run complete (no execution)");
    Ok(())
}
