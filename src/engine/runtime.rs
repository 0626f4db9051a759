// src/engine/runtime.rs

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::JobFile;
use crate::dag::{EventBus, GraphScheduler};
use crate::errors::{JobdagError, Result};
use crate::exec::{ExecutorBackend, ScheduledJob};

use super::progress::ProgressObserver;
use super::runner::ChannelRunner;
use super::{JobName, JobOutcome, RuntimeEvent};

/// Runtime options taken from the job file's `[config]` section.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeOptions {
    /// Watchdog for the whole run.
    pub timeout: Option<Duration>,
    /// Abort on the first failed job instead of treating it as completed.
    pub fail_fast: bool,
}

impl RuntimeOptions {
    pub fn from_job_file(cfg: &JobFile) -> Result<Self> {
        Ok(Self {
            timeout: cfg.timeout()?,
            fail_fast: cfg.config.fail_fast,
        })
    }
}

/// What happened during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub started: usize,
    pub completed: usize,
    /// Jobs that exited non-zero but were still counted as completed.
    pub failed: Vec<JobName>,
    /// The run ended on a shutdown request before every job finished.
    pub interrupted: bool,
}

/// Single dispatcher around a [`GraphScheduler`].
///
/// Job bodies run concurrently in the executor, but every completion is fed
/// back into the bus from this one loop, so the scheduler only ever sees one
/// writer.
pub struct Runtime<E: ExecutorBackend> {
    scheduler: GraphScheduler<JobName>,
    progress: Arc<ProgressObserver>,
    commands: HashMap<JobName, String>,
    started_rx: mpsc::UnboundedReceiver<JobName>,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
    options: RuntimeOptions,
    failed: Vec<JobName>,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("scheduler", &self.scheduler)
            .field("progress", &self.progress)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    /// Wire bus, scheduler and progress tracking for a validated job file.
    ///
    /// `event_rx` must be the receiving end of the channel the executor
    /// reports `JobFinished` on.
    pub fn new(
        cfg: &JobFile,
        event_rx: mpsc::Receiver<RuntimeEvent>,
        executor: E,
        options: RuntimeOptions,
    ) -> Self {
        let (runner, started_rx) = ChannelRunner::channel();
        let bus = Arc::new(EventBus::new(runner));

        let progress = Arc::new(ProgressObserver::new());
        bus.subscribe(progress.clone());

        let scheduler = GraphScheduler::new(bus, cfg.graph());
        let commands = cfg
            .job
            .iter()
            .map(|(name, job)| (name.clone(), job.cmd.clone()))
            .collect();

        Self {
            scheduler,
            progress,
            commands,
            started_rx,
            event_rx,
            executor,
            options,
            failed: Vec::new(),
        }
    }

    pub fn scheduler(&self) -> &GraphScheduler<JobName> {
        &self.scheduler
    }

    /// Run every job to completion (or until shutdown / timeout / failure).
    pub async fn run(mut self) -> Result<RunSummary> {
        info!(jobs = self.commands.len(), "jobdag runtime started");

        let result = match self.options.timeout {
            Some(limit) => match tokio::time::timeout(limit, self.drive()).await {
                Ok(result) => result,
                Err(_) => {
                    error!(
                        ?limit,
                        in_flight = self.progress.in_flight(),
                        "run timed out"
                    );
                    Err(JobdagError::Timeout(limit))
                }
            },
            None => self.drive().await,
        };

        info!("runtime exiting");
        result
    }

    async fn drive(&mut self) -> Result<RunSummary> {
        self.scheduler.start()?;

        loop {
            self.dispatch_started().await?;

            if self.is_finished() {
                break;
            }

            let event = match self.event_rx.recv().await {
                Some(e) => e,
                None => {
                    return Err(JobdagError::Other(anyhow!(
                        "runtime event channel closed with {} job(s) in flight",
                        self.progress.in_flight()
                    )));
                }
            };

            debug!(?event, "runtime received event");

            match event {
                RuntimeEvent::JobFinished { job, outcome } => {
                    self.handle_finished(job, outcome)?;
                }
                RuntimeEvent::ShutdownRequested => {
                    info!(
                        in_flight = self.progress.in_flight(),
                        "shutdown requested; stopping before all jobs finished"
                    );
                    return Ok(self.summary(true));
                }
            }
        }

        info!(
            completed = self.progress.completed(),
            failed = self.failed.len(),
            "all jobs completed"
        );
        Ok(self.summary(false))
    }

    /// Feed one finished job back into the bus.
    fn handle_finished(&mut self, job: JobName, outcome: JobOutcome) -> Result<()> {
        if let JobOutcome::Failed(code) = outcome {
            warn!(job = %job, exit_code = code, "job failed");
            self.failed.push(job.clone());
            if self.options.fail_fast {
                return Err(JobdagError::JobFailed { job, code });
            }
        }

        self.scheduler.bus().complete_job(&job)
    }

    /// Forward every job the scheduler started since the last call to the
    /// executor.
    async fn dispatch_started(&mut self) -> Result<()> {
        let mut jobs = Vec::new();
        while let Ok(name) = self.started_rx.try_recv() {
            let cmd = self.commands.get(&name).cloned().ok_or_else(|| {
                JobdagError::ConfigError(format!("no command configured for job '{}'", name))
            })?;
            jobs.push(ScheduledJob { name, cmd });
        }

        if jobs.is_empty() {
            return Ok(());
        }

        let names: Vec<_> = jobs.iter().map(|j| j.name.as_str()).collect();
        debug!(?names, "dispatching started jobs");

        self.executor.spawn_jobs(jobs).await
    }

    fn is_finished(&self) -> bool {
        self.scheduler.is_completed() && self.progress.in_flight() == 0
    }

    fn summary(&self, interrupted: bool) -> RunSummary {
        RunSummary {
            started: self.progress.started(),
            completed: self.progress.completed(),
            failed: self.failed.clone(),
            interrupted,
        }
    }
}
