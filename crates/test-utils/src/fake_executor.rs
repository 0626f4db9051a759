use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use jobdag::engine::{JobOutcome, RuntimeEvent};
use jobdag::errors::Result;
use jobdag::exec::{ExecutorBackend, ScheduledJob};

/// A fake executor that:
/// - records which jobs were "run"
/// - immediately reports JobFinished for each one (Success unless an exit
///   code was configured for it).
pub struct FakeExecutor {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    executed: Arc<Mutex<Vec<String>>>,
    exit_codes: HashMap<String, i32>,
}

impl FakeExecutor {
    pub fn new(
        runtime_tx: mpsc::Sender<RuntimeEvent>,
        executed: Arc<Mutex<Vec<String>>>,
    ) -> Self {
        Self {
            runtime_tx,
            executed,
            exit_codes: HashMap::new(),
        }
    }

    /// Report `job` as failed with `code` instead of succeeding.
    pub fn failing(mut self, job: &str, code: i32) -> Self {
        self.exit_codes.insert(job.to_string(), code);
        self
    }
}

impl ExecutorBackend for FakeExecutor {
    fn spawn_jobs(
        &mut self,
        jobs: Vec<ScheduledJob>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let executed = Arc::clone(&self.executed);
        let exit_codes = self.exit_codes.clone();

        Box::pin(async move {
            for job in jobs {
                {
                    let mut guard = executed.lock().unwrap();
                    guard.push(job.name.clone());
                }

                let outcome = match exit_codes.get(&job.name) {
                    Some(code) => JobOutcome::Failed(*code),
                    None => JobOutcome::Success,
                };

                tx.send(RuntimeEvent::JobFinished {
                    job: job.name.clone(),
                    outcome,
                })
                .await
                .map_err(anyhow::Error::from)?;
            }
            Ok(())
        })
    }
}
