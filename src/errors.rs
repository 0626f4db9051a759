// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum JobdagError {
    #[error("graph unresolvable: the job graph has no vertices")]
    EmptyGraph,

    #[error("graph unresolvable: no job without dependencies")]
    Unresolvable,

    #[error("cannot start job {job}; unfulfilled dependencies {missing:?}")]
    UnfulfilledDependencies { job: String, missing: Vec<String> },

    #[error("remaining dependency count of job {job} would drop below zero")]
    DependencyUnderflow { job: String },

    #[error("cannot restart a stopped scheduler")]
    CannotRestart,

    #[error("scheduler is already running")]
    AlreadyRunning,

    #[error("job {job} failed with exit code {code}")]
    JobFailed { job: String, code: i32 },

    #[error("run timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Cycle detected in DAG: {0}")]
    DagCycle(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl JobdagError {
    /// Errors that mean the graph handed to the scheduler is malformed.
    ///
    /// These abort the run; everything else (runner and observer failures)
    /// is passed through to the caller without touching scheduler state.
    pub fn is_fatal_configuration(&self) -> bool {
        matches!(
            self,
            JobdagError::EmptyGraph
                | JobdagError::Unresolvable
                | JobdagError::UnfulfilledDependencies { .. }
                | JobdagError::DependencyUnderflow { .. }
        )
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, JobdagError>;
