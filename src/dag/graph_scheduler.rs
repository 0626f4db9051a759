// src/dag/graph_scheduler.rs

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::dag::bus::EventBus;
use crate::dag::graph::{JobGraph, JobId};
use crate::dag::scheduler::{Scheduler, SchedulerContext, SchedulerHooks, SchedulerState};
use crate::errors::{JobdagError, Result};

/// Mutable per-run bookkeeping for [`DependencyPolicy`].
#[derive(Debug)]
struct RunProgress<V> {
    /// Predecessors of each job that have not completed yet.
    remaining_deps: HashMap<V, usize>,
    /// Jobs not yet issued for start.
    remaining_jobs: HashSet<V>,
    /// Jobs whose completion has been observed.
    completed_jobs: HashSet<V>,
}

impl<V: JobId> RunProgress<V> {
    fn new(graph: &JobGraph<V>) -> Self {
        Self {
            remaining_deps: graph
                .vertices()
                .map(|v| (v.clone(), graph.in_degree(v)))
                .collect(),
            remaining_jobs: graph.vertices().cloned().collect(),
            completed_jobs: HashSet::new(),
        }
    }

    /// Record that `job` completed and return the successors it unlocked,
    /// in the graph's successor order.
    fn record_completion(&mut self, graph: &JobGraph<V>, job: &V) -> Result<Vec<V>> {
        if !graph.contains(job) {
            warn!(job = ?job, "completion for a job outside the graph; ignoring");
            return Ok(Vec::new());
        }
        if self.remaining_jobs.contains(job) {
            warn!(job = ?job, "completion for a job that was never started; ignoring");
            return Ok(Vec::new());
        }
        if !self.completed_jobs.insert(job.clone()) {
            warn!(job = ?job, "duplicate completion; ignoring");
            return Ok(Vec::new());
        }

        let mut unlocked = Vec::new();

        for succ in graph.successors_of(job) {
            let Some(count) = self.remaining_deps.get_mut(succ) else {
                continue;
            };
            if *count == 0 {
                return Err(JobdagError::DependencyUnderflow {
                    job: format!("{succ:?}"),
                });
            }
            *count -= 1;

            debug!(
                job = ?succ,
                completed = ?job,
                remaining = *count,
                "dependency satisfied"
            );

            if *count == 0 {
                self.ensure_deps_completed(graph, succ)?;
                unlocked.push(succ.clone());
            }
        }

        Ok(unlocked)
    }

    fn ensure_deps_completed(&self, graph: &JobGraph<V>, job: &V) -> Result<()> {
        let missing: Vec<String> = graph
            .predecessors_of(job)
            .iter()
            .filter(|dep| !self.completed_jobs.contains(*dep))
            .map(|dep| format!("{dep:?}"))
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(JobdagError::UnfulfilledDependencies {
                job: format!("{job:?}"),
                missing,
            })
        }
    }

    /// Take `job` out of the remaining set; `true` if it was the last one.
    fn issue(&mut self, job: &V) -> bool {
        self.remaining_jobs.remove(job);
        self.remaining_jobs.is_empty()
    }
}

/// Topological-unlocking policy: a job starts as soon as every one of its
/// predecessors has completed.
///
/// When several jobs become eligible together they are started in graph
/// vertex order (insertion order for [`JobGraph`]).
pub struct DependencyPolicy<V: JobId> {
    graph: JobGraph<V>,
    progress: Mutex<RunProgress<V>>,
}

impl<V: JobId> fmt::Debug for DependencyPolicy<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencyPolicy")
            .field("jobs", &self.graph.len())
            .field("progress", &*self.lock())
            .finish()
    }
}

impl<V: JobId> DependencyPolicy<V> {
    pub fn new(graph: JobGraph<V>) -> Self {
        let progress = RunProgress::new(&graph);
        Self {
            graph,
            progress: Mutex::new(progress),
        }
    }

    pub fn graph(&self) -> &JobGraph<V> {
        &self.graph
    }

    fn lock(&self) -> MutexGuard<'_, RunProgress<V>> {
        self.progress.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Issue starts for `jobs`, one by one.
    ///
    /// The progress lock is released before each bus call so that a runner
    /// completing a job synchronously re-enters this policy safely. When the
    /// last remaining job is issued the scheduler is stopped first, so its
    /// state is already terminal when that final start goes out.
    ///
    /// A runner or observer error for one job does not strand the rest of
    /// the batch: every job is still issued and the first such error is
    /// returned afterwards. Fatal configuration errors return at once.
    fn start_all(&self, ctx: &SchedulerContext<'_, V>, jobs: Vec<V>) -> Result<()> {
        let mut first_err = None;

        for job in jobs {
            let last = self.lock().issue(&job);
            if last {
                debug!(job = ?job, "last remaining job; stopping scheduler before issuing it");
                if let Err(err) = ctx.stop() {
                    Self::defer(&mut first_err, &job, err)?;
                }
            }
            debug!(job = ?job, "starting job");
            if let Err(err) = ctx.start_job(&job) {
                Self::defer(&mut first_err, &job, err)?;
            }
        }

        first_err.map_or(Ok(()), Err)
    }

    fn defer(slot: &mut Option<JobdagError>, job: &V, err: JobdagError) -> Result<()> {
        if err.is_fatal_configuration() {
            return Err(err);
        }
        warn!(job = ?job, error = %err, "failed to start job; issuing the rest of the batch");
        if slot.is_none() {
            *slot = Some(err);
        }
        Ok(())
    }
}

impl<V: JobId> SchedulerHooks<V> for DependencyPolicy<V> {
    fn on_scheduler_start(&self, ctx: &SchedulerContext<'_, V>) -> Result<()> {
        if self.graph.is_empty() {
            return Err(JobdagError::EmptyGraph);
        }

        let initial: Vec<V> = {
            let progress = self.lock();
            self.graph
                .vertices()
                .filter(|v| progress.remaining_deps.get(*v) == Some(&0))
                .cloned()
                .collect()
        };

        if initial.is_empty() {
            return Err(JobdagError::Unresolvable);
        }

        info!(
            jobs = self.graph.len(),
            initial = ?initial,
            "starting jobs without dependencies"
        );
        self.start_all(ctx, initial)
    }

    fn on_after_job_completed(&self, ctx: &SchedulerContext<'_, V>, job: &V) -> Result<()> {
        let unlocked = self.lock().record_completion(&self.graph, job)?;
        if !unlocked.is_empty() {
            debug!(completed = ?job, unlocked = ?unlocked, "jobs became eligible");
        }
        self.start_all(ctx, unlocked)
    }
}

/// Scheduler that drives a [`JobGraph`] to completion through an
/// [`EventBus`].
///
/// ```ignore
/// let bus = Arc::new(EventBus::new(runner));
/// let scheduler = GraphScheduler::new(Arc::clone(&bus), graph);
/// scheduler.start()?;
/// // ... later, for every finished job:
/// bus.complete_job(&job)?;
/// ```
#[derive(Debug)]
pub struct GraphScheduler<V: JobId> {
    inner: Scheduler<V, DependencyPolicy<V>>,
}

impl<V: JobId> GraphScheduler<V> {
    pub fn new(bus: Arc<EventBus<V>>, graph: JobGraph<V>) -> Self {
        Self {
            inner: Scheduler::new(bus, DependencyPolicy::new(graph)),
        }
    }

    pub fn start(&self) -> Result<()> {
        self.inner.start()
    }

    pub fn stop(&self) -> Result<()> {
        self.inner.stop()
    }

    pub fn is_completed(&self) -> bool {
        self.inner.is_completed()
    }

    pub fn state(&self) -> SchedulerState {
        self.inner.state()
    }

    pub fn bus(&self) -> &Arc<EventBus<V>> {
        self.inner.bus()
    }

    pub fn graph(&self) -> &JobGraph<V> {
        self.inner.hooks().graph()
    }

    /// Unsatisfied dependency count for `job`, or `None` if it is not in the
    /// graph.
    pub fn remaining_dependencies(&self, job: &V) -> Option<usize> {
        self.inner.hooks().lock().remaining_deps.get(job).copied()
    }

    /// Jobs not yet issued for start, in graph order.
    pub fn remaining_jobs(&self) -> Vec<V> {
        let progress = self.inner.hooks().lock();
        self.graph()
            .vertices()
            .filter(|v| progress.remaining_jobs.contains(*v))
            .cloned()
            .collect()
    }

    /// Jobs whose completion has been observed, in graph order.
    pub fn completed_jobs(&self) -> Vec<V> {
        let progress = self.inner.hooks().lock();
        self.graph()
            .vertices()
            .filter(|v| progress.completed_jobs.contains(*v))
            .cloned()
            .collect()
    }
}
