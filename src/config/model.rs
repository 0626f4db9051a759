// src/config/model.rs

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::dag::JobGraph;
use crate::errors::{JobdagError, Result};

/// Job file as read from TOML, before semantic validation.
///
/// ```toml
/// [config]
/// timeout = "30s"
/// fail_fast = true
///
/// [job.fetch_orders]
/// cmd = "echo fetching orders"
///
/// [job.join]
/// cmd = "echo joining"
/// after = ["fetch_orders"]
/// ```
///
/// All sections are optional; validation rejects a file with no jobs.
#[derive(Debug, Clone, Deserialize)]
pub struct RawJobFile {
    /// Run-wide settings from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// All jobs from `[job.<name>]`, keyed by job name.
    #[serde(default)]
    pub job: BTreeMap<String, JobConfig>,
}

/// `[config]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigSection {
    /// Overall run timeout, e.g. `"500ms"`, `"30s"`, `"5m"`.
    ///
    /// The scheduler itself has no timeout; this is a watchdog applied by the
    /// runtime around the whole run.
    #[serde(default)]
    pub timeout: Option<String>,

    /// Stop the run with an error as soon as any job exits non-zero.
    ///
    /// When `false` (default) a failed job still counts as completed and its
    /// dependents are started.
    #[serde(default)]
    pub fail_fast: bool,
}

/// `[job.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct JobConfig {
    /// Shell command executed for this job.
    pub cmd: String,

    /// Jobs that must complete before this one starts.
    #[serde(default)]
    pub after: Vec<String>,
}

/// A validated job file: at least one job, only known dependencies, acyclic.
///
/// Only obtainable through `TryFrom<RawJobFile>`.
#[derive(Debug, Clone)]
pub struct JobFile {
    pub config: ConfigSection,
    pub job: BTreeMap<String, JobConfig>,
}

impl JobFile {
    pub(crate) fn new_unchecked(config: ConfigSection, job: BTreeMap<String, JobConfig>) -> Self {
        Self { config, job }
    }

    /// Build the dependency graph: one vertex per job, `dep -> job` for
    /// every entry in `after`.
    pub fn graph(&self) -> JobGraph<String> {
        let mut builder = JobGraph::builder();
        for name in self.job.keys() {
            builder = builder.job(name.clone());
        }
        for (name, job) in self.job.iter() {
            for dep in job.after.iter() {
                builder = builder.edge(dep.clone(), name.clone());
            }
        }
        builder.build()
    }

    pub fn command_of(&self, name: &str) -> Option<&str> {
        self.job.get(name).map(|j| j.cmd.as_str())
    }

    /// Parsed `[config].timeout`, if set.
    pub fn timeout(&self) -> Result<Option<Duration>> {
        self.config
            .timeout
            .as_deref()
            .map(parse_duration)
            .transpose()
            .map_err(JobdagError::ConfigError)
    }
}

/// Parse durations like `"250ms"`, `"3s"`, `"2m"`, `"1h"`.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| format!("duration '{}' is missing a unit suffix", s))?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;

    let secs_per_unit = match unit_part.trim().to_lowercase().as_str() {
        "ms" => return Ok(Duration::from_millis(value)),
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        other => {
            return Err(format!(
                "unsupported duration unit '{}'; expected ms, s, m, or h",
                other
            ));
        }
    };

    value
        .checked_mul(secs_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration '{}' is too large", s))
}
