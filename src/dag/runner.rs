// src/dag/runner.rs

//! Capabilities the scheduler consumes and exposes at its seams.

use crate::dag::event::LifecycleEvent;
use crate::errors::Result;

/// Starts and completes individual jobs.
///
/// The scheduler never interprets what a job does; it only decides *when*
/// these are called. Errors are handed back to whoever invoked the bus,
/// untouched.
pub trait JobRunner<V>: Send + Sync {
    fn start_job(&self, job: &V) -> Result<()>;

    fn complete_job(&self, job: &V) -> Result<()>;
}

/// Receives every event published on a bus it is subscribed to.
///
/// Returning an error aborts the publication and fails the emitting
/// `start_job` / `complete_job` call.
pub trait JobObserver<V>: Send + Sync {
    fn on_event(&self, event: &LifecycleEvent<V>) -> Result<()>;
}

impl<V, F> JobObserver<V> for F
where
    F: Fn(&LifecycleEvent<V>) -> Result<()> + Send + Sync,
{
    fn on_event(&self, event: &LifecycleEvent<V>) -> Result<()> {
        self(event)
    }
}

impl<V, R> JobRunner<V> for std::sync::Arc<R>
where
    R: JobRunner<V> + ?Sized,
{
    fn start_job(&self, job: &V) -> Result<()> {
        (**self).start_job(job)
    }

    fn complete_job(&self, job: &V) -> Result<()> {
        (**self).complete_job(job)
    }
}
