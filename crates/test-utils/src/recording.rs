use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use jobdag::dag::{BusId, JobObserver, JobRunner, LifecycleEvent, LifecycleKind};
use jobdag::errors::Result;

/// One call the scheduler made into a runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunnerCall<V> {
    Start(V),
    Complete(V),
}

/// A runner that records every call and can be told to fail for some jobs.
///
/// Clones share the same log, so a test keeps one clone and hands the other
/// to the bus.
#[derive(Debug, Clone)]
pub struct RecordingRunner<V> {
    calls: Arc<Mutex<Vec<RunnerCall<V>>>>,
    fail_on_start: Arc<Mutex<HashSet<V>>>,
}

impl<V> Default for RecordingRunner<V> {
    fn default() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_on_start: Arc::new(Mutex::new(HashSet::new())),
        }
    }
}

impl<V: Clone + Eq + std::hash::Hash + std::fmt::Debug> RecordingRunner<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `start_job(job)` return an error.
    pub fn fail_on_start(&self, job: V) {
        self.fail_on_start.lock().unwrap().insert(job);
    }

    pub fn calls(&self) -> Vec<RunnerCall<V>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn started(&self) -> Vec<V> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                RunnerCall::Start(v) => Some(v),
                RunnerCall::Complete(_) => None,
            })
            .collect()
    }

    pub fn completed(&self) -> Vec<V> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                RunnerCall::Complete(v) => Some(v),
                RunnerCall::Start(_) => None,
            })
            .collect()
    }
}

impl<V> JobRunner<V> for RecordingRunner<V>
where
    V: Clone + Eq + std::hash::Hash + std::fmt::Debug + Send + Sync,
{
    fn start_job(&self, job: &V) -> Result<()> {
        if self.fail_on_start.lock().unwrap().contains(job) {
            return Err(anyhow!("runner refused to start {:?}", job).into());
        }
        self.calls.lock().unwrap().push(RunnerCall::Start(job.clone()));
        Ok(())
    }

    fn complete_job(&self, job: &V) -> Result<()> {
        self.calls.lock().unwrap().push(RunnerCall::Complete(job.clone()));
        Ok(())
    }
}

/// Observer that keeps every event it sees as `(bus, kind, job)`.
#[derive(Debug)]
pub struct RecordingObserver<V> {
    events: Mutex<Vec<(BusId, LifecycleKind, Option<V>)>>,
}

impl<V> Default for RecordingObserver<V> {
    fn default() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }
}

impl<V: Clone> RecordingObserver<V> {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<(BusId, LifecycleKind, Option<V>)> {
        self.events.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<LifecycleKind> {
        self.events().into_iter().map(|(_, kind, _)| kind).collect()
    }
}

impl<V: Clone + Send + Sync> JobObserver<V> for RecordingObserver<V> {
    fn on_event(&self, event: &LifecycleEvent<V>) -> Result<()> {
        self.events
            .lock()
            .unwrap()
            .push((event.bus(), event.kind(), event.job().cloned()));
        Ok(())
    }
}
