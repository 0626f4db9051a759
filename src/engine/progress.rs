// src/engine/progress.rs

use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{debug, info};

use crate::dag::{JobObserver, LifecycleEvent, LifecycleKind};
use crate::engine::JobName;
use crate::errors::Result;

/// Bus observer that counts started and completed jobs.
///
/// The scheduler leaves the bus when it issues its last job, so the runtime
/// cannot tell from the scheduler alone when that job finished; this
/// observer stays subscribed for the whole run.
#[derive(Debug, Default)]
pub struct ProgressObserver {
    started: AtomicUsize,
    completed: AtomicUsize,
}

impl ProgressObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Jobs started but not yet completed.
    pub fn in_flight(&self) -> usize {
        self.started().saturating_sub(self.completed())
    }
}

impl JobObserver<JobName> for ProgressObserver {
    fn on_event(&self, event: &LifecycleEvent<JobName>) -> Result<()> {
        match (event.kind(), event.job()) {
            (LifecycleKind::BeforeStarted, Some(job)) => {
                self.started.fetch_add(1, Ordering::SeqCst);
                debug!(job = %job, in_flight = self.in_flight(), "job started");
            }
            (LifecycleKind::AfterCompleted, Some(job)) => {
                self.completed.fetch_add(1, Ordering::SeqCst);
                debug!(job = %job, in_flight = self.in_flight(), "job completed");
            }
            (LifecycleKind::SchedulerCompleted, _) => {
                info!(
                    started = self.started(),
                    completed = self.completed(),
                    "scheduler completed; waiting for in-flight jobs"
                );
            }
            _ => {}
        }
        Ok(())
    }
}
