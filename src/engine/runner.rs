// src/engine/runner.rs

use anyhow::anyhow;
use tokio::sync::mpsc;
use tracing::debug;

use crate::dag::JobRunner;
use crate::engine::JobName;
use crate::errors::Result;

/// `JobRunner` that hands started jobs to the async side over a channel.
///
/// `start_job` is called synchronously from inside scheduler hooks, so it
/// must not await; an unbounded send never blocks. `complete_job` has
/// nothing to do: by the time it is called the process already exited.
#[derive(Debug, Clone)]
pub struct ChannelRunner {
    tx: mpsc::UnboundedSender<JobName>,
}

impl ChannelRunner {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<JobName>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl JobRunner<JobName> for ChannelRunner {
    fn start_job(&self, job: &JobName) -> Result<()> {
        self.tx
            .send(job.clone())
            .map_err(|_| anyhow!("executor side gone; cannot start job '{}'", job))?;
        Ok(())
    }

    fn complete_job(&self, job: &JobName) -> Result<()> {
        debug!(job = %job, "job completion acknowledged");
        Ok(())
    }
}
