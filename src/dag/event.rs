// src/dag/event.rs

//! Lifecycle events broadcast by an [`EventBus`](crate::dag::EventBus).

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_BUS_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of the bus that emitted an event.
///
/// Schedulers use it as a subject key to ignore events coming from a bus they
/// are not registered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BusId(u64);

impl BusId {
    pub(crate) fn next() -> Self {
        BusId(NEXT_BUS_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for BusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bus-{}", self.0)
    }
}

/// Discrete lifecycle transition carried by a [`LifecycleEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleKind {
    BeforeStarted,
    AfterStarted,
    BeforeCompleted,
    AfterCompleted,
    /// The scheduler driving this bus finished its run. Carries no job.
    SchedulerCompleted,
}

/// A single notification emitted by a bus.
///
/// Built at emission time, handed to every subscriber by reference and then
/// dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleEvent<V> {
    bus: BusId,
    kind: LifecycleKind,
    job: Option<V>,
}

impl<V> LifecycleEvent<V> {
    pub fn job_event(bus: BusId, kind: LifecycleKind, job: V) -> Self {
        Self {
            bus,
            kind,
            job: Some(job),
        }
    }

    pub fn scheduler_completed(bus: BusId) -> Self {
        Self {
            bus,
            kind: LifecycleKind::SchedulerCompleted,
            job: None,
        }
    }

    pub fn bus(&self) -> BusId {
        self.bus
    }

    pub fn kind(&self) -> LifecycleKind {
        self.kind
    }

    /// The job this event is about; `None` only for
    /// [`LifecycleKind::SchedulerCompleted`].
    pub fn job(&self) -> Option<&V> {
        self.job.as_ref()
    }
}
