// src/engine/mod.rs

//! Async runtime shell around the scheduler core.
//!
//! The core (`dag`) is synchronous and assumes a single writer. This module
//! provides that writer:
//! - [`runner`] forwards jobs the scheduler starts to the executor side,
//! - [`progress`] observes the bus to know how many jobs are in flight,
//! - [`runtime`] is the one dispatcher loop that turns executor reports into
//!   `EventBus::complete_job` calls, one at a time.

/// Job identifier used by the runtime: the `[job.<name>]` key.
pub type JobName = String;

/// Outcome of a job process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Success,
    Failed(i32),
}

/// Events flowing into the runtime from executors and signal handlers.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// A job process exited with a concrete outcome.
    JobFinished { job: JobName, outcome: JobOutcome },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

pub mod progress;
pub mod runner;
pub mod runtime;

pub use progress::ProgressObserver;
pub use runner::ChannelRunner;
pub use runtime::{RunSummary, Runtime, RuntimeOptions};
