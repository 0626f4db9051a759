// src/dag/scheduler.rs

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, error, info, warn};

use crate::dag::bus::{EventBus, SubscriptionId};
use crate::dag::event::{BusId, LifecycleEvent, LifecycleKind};
use crate::dag::graph::JobId;
use crate::dag::runner::JobObserver;
use crate::errors::{JobdagError, Result};

/// Where a scheduler is in its (single) run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Constructed, `start()` not called yet.
    Idle,
    /// Subscribed to its bus and reacting to events.
    Running,
    /// `stop()` ran. Terminal.
    Completed,
    /// A configuration or invariant error ended the run. Terminal.
    Aborted,
}

/// Policy callbacks driven by a [`Scheduler`].
///
/// Every hook defaults to doing nothing; a policy overrides only the ones it
/// needs. Hooks run synchronously inside the bus call that produced the
/// event, so they must not block on work that itself needs the bus.
pub trait SchedulerHooks<V>: Send + Sync + 'static {
    /// Called once from [`Scheduler::start`], after subscribing to the bus.
    fn on_scheduler_start(&self, _ctx: &SchedulerContext<'_, V>) -> Result<()> {
        Ok(())
    }

    fn on_before_job_started(&self, _ctx: &SchedulerContext<'_, V>, _job: &V) -> Result<()> {
        Ok(())
    }

    fn on_after_job_started(&self, _ctx: &SchedulerContext<'_, V>, _job: &V) -> Result<()> {
        Ok(())
    }

    fn on_before_job_completed(&self, _ctx: &SchedulerContext<'_, V>, _job: &V) -> Result<()> {
        Ok(())
    }

    fn on_after_job_completed(&self, _ctx: &SchedulerContext<'_, V>, _job: &V) -> Result<()> {
        Ok(())
    }

    fn on_scheduler_completed(&self, _ctx: &SchedulerContext<'_, V>) -> Result<()> {
        Ok(())
    }
}

/// What a hook may do to the scheduler that invoked it.
pub struct SchedulerContext<'a, V> {
    bus: &'a Arc<EventBus<V>>,
    lifecycle: &'a Lifecycle,
}

impl<V: JobId> SchedulerContext<'_, V> {
    /// Issue a start for `job` through the bus.
    pub fn start_job(&self, job: &V) -> Result<()> {
        self.bus.start_job(job)
    }

    /// Finish the run. See [`Scheduler::stop`].
    pub fn stop(&self) -> Result<()> {
        self.lifecycle.stop(self.bus)
    }

    pub fn bus_id(&self) -> BusId {
        self.bus.id()
    }

    pub fn is_completed(&self) -> bool {
        self.lifecycle.state() == SchedulerState::Completed
    }
}

#[derive(Debug)]
struct LifecycleInner {
    state: SchedulerState,
    subscription: Option<SubscriptionId>,
}

/// Run/stop state machine plus the bus subscription it owns.
#[derive(Debug)]
struct Lifecycle {
    inner: Mutex<LifecycleInner>,
}

impl Lifecycle {
    fn new() -> Self {
        Self {
            inner: Mutex::new(LifecycleInner {
                state: SchedulerState::Idle,
                subscription: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LifecycleInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn state(&self) -> SchedulerState {
        self.lock().state
    }

    /// `Idle -> Running`.
    fn begin(&self) -> Result<()> {
        let mut inner = self.lock();
        match inner.state {
            SchedulerState::Idle => {
                inner.state = SchedulerState::Running;
                Ok(())
            }
            SchedulerState::Running => Err(JobdagError::AlreadyRunning),
            SchedulerState::Completed | SchedulerState::Aborted => Err(JobdagError::CannotRestart),
        }
    }

    fn set_subscription(&self, id: SubscriptionId) {
        self.lock().subscription = Some(id);
    }

    fn detach<V>(&self, bus: &EventBus<V>) {
        let subscription = self.lock().subscription.take();
        if let Some(id) = subscription {
            bus.unsubscribe(id);
        }
    }

    /// Move to `Completed`, announce it on the bus, then unsubscribe.
    ///
    /// A second call only makes sure the subscription is gone.
    fn stop<V: JobId>(&self, bus: &EventBus<V>) -> Result<()> {
        let first = {
            let mut inner = self.lock();
            match inner.state {
                SchedulerState::Idle | SchedulerState::Running => {
                    inner.state = SchedulerState::Completed;
                    true
                }
                SchedulerState::Completed | SchedulerState::Aborted => false,
            }
        };

        if !first {
            debug!(bus = %bus.id(), "stop on a finished scheduler; nothing to do");
            self.detach(bus);
            return Ok(());
        }

        info!(bus = %bus.id(), "scheduler completed");
        let published = bus.publish(&LifecycleEvent::scheduler_completed(bus.id()));
        self.detach(bus);
        published
    }

    fn abort<V>(&self, bus: &EventBus<V>, err: &JobdagError) {
        self.lock().state = SchedulerState::Aborted;
        self.detach(bus);
        error!(bus = %bus.id(), error = %err, "scheduler aborted");
    }
}

struct SchedulerCore<V, H> {
    bus: Arc<EventBus<V>>,
    lifecycle: Lifecycle,
    hooks: H,
}

impl<V: JobId, H: SchedulerHooks<V>> SchedulerCore<V, H> {
    fn context(&self) -> SchedulerContext<'_, V> {
        SchedulerContext {
            bus: &self.bus,
            lifecycle: &self.lifecycle,
        }
    }

    /// Abort the run on configuration/invariant errors; pass everything
    /// else through untouched.
    fn guard(&self, result: Result<()>) -> Result<()> {
        if let Err(err) = &result {
            if err.is_fatal_configuration() {
                self.lifecycle.abort(&self.bus, err);
            }
        }
        result
    }
}

impl<V: JobId, H: SchedulerHooks<V>> JobObserver<V> for SchedulerCore<V, H> {
    fn on_event(&self, event: &LifecycleEvent<V>) -> Result<()> {
        if event.bus() != self.bus.id() {
            debug!(
                bus = %self.bus.id(),
                source = %event.bus(),
                "ignoring event from a foreign bus"
            );
            return Ok(());
        }

        let ctx = self.context();
        let result = match (event.kind(), event.job()) {
            (LifecycleKind::SchedulerCompleted, _) => self.hooks.on_scheduler_completed(&ctx),
            (LifecycleKind::BeforeStarted, Some(job)) => self.hooks.on_before_job_started(&ctx, job),
            (LifecycleKind::AfterStarted, Some(job)) => self.hooks.on_after_job_started(&ctx, job),
            (LifecycleKind::BeforeCompleted, Some(job)) => {
                self.hooks.on_before_job_completed(&ctx, job)
            }
            (LifecycleKind::AfterCompleted, Some(job)) => {
                self.hooks.on_after_job_completed(&ctx, job)
            }
            (kind, None) => {
                warn!(?kind, "job lifecycle event without a job; ignoring");
                Ok(())
            }
        };

        self.guard(result)
    }
}

/// Base scheduler: owns the run/stop lifecycle and turns bus events into
/// [`SchedulerHooks`] calls.
///
/// A scheduler runs exactly once. After `stop()` (or an abort) it cannot be
/// started again.
pub struct Scheduler<V, H> {
    core: Arc<SchedulerCore<V, H>>,
}

impl<V, H: fmt::Debug> fmt::Debug for Scheduler<V, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("bus", &self.core.bus)
            .field("lifecycle", &self.core.lifecycle)
            .field("hooks", &self.core.hooks)
            .finish()
    }
}

impl<V: JobId, H: SchedulerHooks<V>> Scheduler<V, H> {
    pub fn new(bus: Arc<EventBus<V>>, hooks: H) -> Self {
        Self {
            core: Arc::new(SchedulerCore {
                bus,
                lifecycle: Lifecycle::new(),
                hooks,
            }),
        }
    }

    /// Subscribe to the bus and run the policy's start hook.
    ///
    /// Fails with [`JobdagError::CannotRestart`] once the scheduler has
    /// completed or aborted. A configuration error raised by the start hook
    /// aborts the run before it is returned.
    pub fn start(&self) -> Result<()> {
        self.core.lifecycle.begin()?;

        let observer: Arc<dyn JobObserver<V>> = self.core.clone();
        let subscription = self.core.bus.subscribe(observer);
        self.core.lifecycle.set_subscription(subscription);

        info!(bus = %self.core.bus.id(), "scheduler starting");

        let ctx = self.core.context();
        self.core.guard(self.core.hooks.on_scheduler_start(&ctx))
    }

    /// Mark the run completed and leave the bus.
    ///
    /// Publishes [`LifecycleKind::SchedulerCompleted`] before unsubscribing,
    /// so the scheduler's own `on_scheduler_completed` hook still fires.
    /// Calling it again is a no-op.
    pub fn stop(&self) -> Result<()> {
        self.core.context().stop()
    }

    pub fn is_completed(&self) -> bool {
        self.state() == SchedulerState::Completed
    }

    pub fn state(&self) -> SchedulerState {
        self.core.lifecycle.state()
    }

    pub fn bus(&self) -> &Arc<EventBus<V>> {
        &self.core.bus
    }

    pub fn hooks(&self) -> &H {
        &self.core.hooks
    }
}
