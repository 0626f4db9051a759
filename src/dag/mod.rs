// src/dag/mod.rs

//! Job graph, lifecycle event plumbing and the schedulers built on it.
//!
//! - [`graph`] holds the immutable dependency graph of jobs.
//! - [`event`] defines the lifecycle events published on a bus.
//! - [`runner`] has the `JobRunner` / `JobObserver` capabilities.
//! - [`bus`] decorates a runner with before/after notifications.
//! - [`scheduler`] is the base lifecycle state machine and hook dispatch.
//! - [`graph_scheduler`] is the dependency-resolution policy on top of it.

pub mod bus;
pub mod event;
pub mod graph;
pub mod graph_scheduler;
pub mod runner;
pub mod scheduler;

pub use bus::{EventBus, SubscriptionId};
pub use event::{BusId, LifecycleEvent, LifecycleKind};
pub use graph::{JobGraph, JobGraphBuilder, JobId};
pub use graph_scheduler::{DependencyPolicy, GraphScheduler};
pub use runner::{JobObserver, JobRunner};
pub use scheduler::{Scheduler, SchedulerContext, SchedulerHooks, SchedulerState};
