// src/exec/command.rs

use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::engine::{JobOutcome, RuntimeEvent};
use crate::exec::backend::ScheduledJob;

/// Spawn the background executor loop.
///
/// Every received job runs in its own Tokio task, so independent jobs run in
/// parallel. Completion is reported through `runtime_tx`; the runtime is the
/// only place that turns those reports into bus completions.
pub fn spawn_executor(runtime_tx: mpsc::Sender<RuntimeEvent>) -> mpsc::Sender<ScheduledJob> {
    let (tx, mut rx) = mpsc::channel::<ScheduledJob>(32);

    tokio::spawn(async move {
        info!("executor loop started");
        while let Some(job) = rx.recv().await {
            let runtime_tx = runtime_tx.clone();
            tokio::spawn(async move {
                run_job(job, runtime_tx).await;
            });
        }
        info!("executor loop finished (channel closed)");
    });

    tx
}

/// Run a single job process and emit `JobFinished`.
///
/// Spawn/wait errors become a failed outcome with exit code -1.
async fn run_job(job: ScheduledJob, runtime_tx: mpsc::Sender<RuntimeEvent>) {
    let job_name = job.name.clone();
    if let Err(err) = run_job_inner(job, &runtime_tx).await {
        error!(job = %job_name, error = %err, "job execution error");
        let _ = runtime_tx
            .send(RuntimeEvent::JobFinished {
                job: job_name,
                outcome: JobOutcome::Failed(-1),
            })
            .await;
    }
}

async fn run_job_inner(job: ScheduledJob, runtime_tx: &mpsc::Sender<RuntimeEvent>) -> Result<()> {
    info!(job = %job.name, cmd = %job.cmd, "starting job process");

    // Build a shell command appropriate for the platform.
    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(&job.cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(&job.cmd);
        c
    };

    cmd.stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning process for job '{}'", job.name))?;

    if let Some(stdout) = child.stdout.take() {
        let job_name = job.name.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                info!(job = %job_name, "stdout: {}", line);
            }
        });
    }

    // Always consume stderr so buffers don't fill; log at debug.
    if let Some(stderr) = child.stderr.take() {
        let job_name = job.name.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(job = %job_name, "stderr: {}", line);
            }
        });
    }

    let status = child
        .wait()
        .await
        .with_context(|| format!("waiting for process of job '{}'", job.name))?;

    let code = status.code().unwrap_or(-1);
    let outcome = if status.success() {
        JobOutcome::Success
    } else {
        JobOutcome::Failed(code)
    };

    info!(
        job = %job.name,
        exit_code = code,
        success = status.success(),
        "job process exited"
    );

    runtime_tx
        .send(RuntimeEvent::JobFinished {
            job: job.name.clone(),
            outcome,
        })
        .await
        .with_context(|| format!("sending JobFinished event for job '{}' to runtime", job.name))?;

    Ok(())
}
