// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The runtime hands started jobs to an `ExecutorBackend` instead of a raw
//! mpsc sender, so tests can replace process spawning with something that
//! records jobs and reports completion directly.

use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;

use crate::engine::{JobName, RuntimeEvent};
use crate::errors::{Error, Result};

use super::command::spawn_executor;

/// A job the scheduler has started, with the command to run for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledJob {
    pub name: JobName,
    pub cmd: String,
}

/// Trait abstracting how started jobs are executed.
pub trait ExecutorBackend: Send {
    /// Dispatch the given jobs for execution.
    ///
    /// Implementations must eventually send exactly one
    /// `RuntimeEvent::JobFinished` per job on the runtime channel.
    fn spawn_jobs(
        &mut self,
        jobs: Vec<ScheduledJob>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Production backend: runs each job as a shell command.
pub struct ShellExecutor {
    tx: mpsc::Sender<ScheduledJob>,
}

impl ShellExecutor {
    /// Spawns the background executor loop immediately.
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        let tx = spawn_executor(runtime_tx);
        Self { tx }
    }
}

impl ExecutorBackend for ShellExecutor {
    fn spawn_jobs(
        &mut self,
        jobs: Vec<ScheduledJob>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        // Clone the sender so the future doesn't borrow `self` across `await`.
        let tx = self.tx.clone();

        Box::pin(async move {
            for job in jobs {
                tx.send(job).await.map_err(Error::from)?;
            }
            Ok(())
        })
    }
}
