// src/dag/bus.rs

//! Notifying runner: wraps a [`JobRunner`] and brackets every call with
//! lifecycle events delivered to subscribed observers.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, trace};

use crate::dag::event::{BusId, LifecycleEvent, LifecycleKind};
use crate::dag::runner::{JobObserver, JobRunner};
use crate::errors::Result;

/// Handle returned by [`EventBus::subscribe`]; pass it back to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscriber<V> {
    id: SubscriptionId,
    observer: Arc<dyn JobObserver<V>>,
}

/// In-process, synchronous publish/subscribe around a job runner.
///
/// Every bus owns its own subscriber list. Publication snapshots that list
/// and calls each observer on the emitting thread; the list lock is released
/// before any observer runs, so observers may subscribe, unsubscribe or start
/// further jobs from inside a callback.
pub struct EventBus<V> {
    id: BusId,
    runner: Box<dyn JobRunner<V>>,
    subscribers: Mutex<Vec<Subscriber<V>>>,
    next_subscription: AtomicU64,
}

impl<V> fmt::Debug for EventBus<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("id", &self.id)
            .field("subscribers", &self.subscriber_count())
            .finish_non_exhaustive()
    }
}

impl<V> EventBus<V> {
    pub fn new(runner: impl JobRunner<V> + 'static) -> Self {
        let id = BusId::next();
        debug!(bus = %id, "created event bus");
        Self {
            id,
            runner: Box::new(runner),
            subscribers: Mutex::new(Vec::new()),
            next_subscription: AtomicU64::new(0),
        }
    }

    pub fn id(&self) -> BusId {
        self.id
    }

    pub fn subscribe(&self, observer: Arc<dyn JobObserver<V>>) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.lock_subscribers().push(Subscriber { id, observer });
        debug!(bus = %self.id, subscription = id.0, "observer subscribed");
        id
    }

    /// Remove a subscription. Returns `false` if it was not (or no longer)
    /// registered, in which case nothing happens.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subs = self.lock_subscribers();
        let before = subs.len();
        subs.retain(|s| s.id != id);
        let removed = subs.len() != before;
        drop(subs);

        debug!(bus = %self.id, subscription = id.0, removed, "observer unsubscribed");
        removed
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock_subscribers().len()
    }

    fn lock_subscribers(&self) -> MutexGuard<'_, Vec<Subscriber<V>>> {
        // Observers never run under this lock, so a poisoned list is still
        // consistent.
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<V: Clone + fmt::Debug> EventBus<V> {
    /// Start a job: `BeforeStarted`, the wrapped runner's start, `AfterStarted`.
    ///
    /// A runner error is returned as-is and suppresses `AfterStarted`.
    pub fn start_job(&self, job: &V) -> Result<()> {
        self.publish(&LifecycleEvent::job_event(
            self.id,
            LifecycleKind::BeforeStarted,
            job.clone(),
        ))?;
        self.runner.start_job(job)?;
        self.publish(&LifecycleEvent::job_event(
            self.id,
            LifecycleKind::AfterStarted,
            job.clone(),
        ))
    }

    /// Complete a job: `BeforeCompleted`, the wrapped runner's complete,
    /// `AfterCompleted`.
    pub fn complete_job(&self, job: &V) -> Result<()> {
        self.publish(&LifecycleEvent::job_event(
            self.id,
            LifecycleKind::BeforeCompleted,
            job.clone(),
        ))?;
        self.runner.complete_job(job)?;
        self.publish(&LifecycleEvent::job_event(
            self.id,
            LifecycleKind::AfterCompleted,
            job.clone(),
        ))
    }

    /// Deliver `event` once to every current subscriber.
    ///
    /// The first observer error stops delivery and is returned. Panics are
    /// not caught.
    pub fn publish(&self, event: &LifecycleEvent<V>) -> Result<()> {
        let snapshot: Vec<Arc<dyn JobObserver<V>>> = self
            .lock_subscribers()
            .iter()
            .map(|s| Arc::clone(&s.observer))
            .collect();

        trace!(
            bus = %self.id,
            kind = ?event.kind(),
            job = ?event.job(),
            subscribers = snapshot.len(),
            "publishing lifecycle event"
        );

        for observer in snapshot {
            observer.on_event(event)?;
        }
        Ok(())
    }
}
