// src/exec/mod.rs

//! Process execution layer.
//!
//! Runs the shell command of every started job on its own Tokio task and
//! reports back to the runtime via `RuntimeEvent::JobFinished`.
//!
//! - [`command`] owns the executor loop and the per-job process runner.
//! - [`backend`] provides the `ExecutorBackend` trait the runtime talks to
//!   and the production `ShellExecutor`; tests swap in a fake.

pub mod backend;
pub mod command;

pub use backend::{ExecutorBackend, ScheduledJob, ShellExecutor};
pub use command::spawn_executor;
