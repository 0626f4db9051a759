#![allow(dead_code)]

use std::collections::BTreeMap;

use jobdag::config::{ConfigSection, JobConfig, JobFile, RawJobFile};
use jobdag::dag::JobGraph;

/// `A -> B, A -> C, B -> D, C -> D`.
pub fn diamond() -> JobGraph<&'static str> {
    JobGraph::from_edges([("A", "B"), ("A", "C"), ("B", "D"), ("C", "D")])
}

/// `P -> Q, P -> R`.
pub fn fan_out() -> JobGraph<&'static str> {
    JobGraph::from_edges([("P", "Q"), ("P", "R")])
}

/// `X -> Y, Y -> X`.
pub fn two_cycle() -> JobGraph<&'static str> {
    JobGraph::from_edges([("X", "Y"), ("Y", "X")])
}

/// `0 -> 1 -> ... -> n-1`.
pub fn chain(n: usize) -> JobGraph<usize> {
    let mut builder = JobGraph::builder();
    for i in 0..n {
        builder = builder.job(i);
    }
    for i in 1..n {
        builder = builder.edge(i - 1, i);
    }
    builder.build()
}

/// Builder for `JobFile` to simplify test setup.
pub struct JobFileBuilder {
    raw: RawJobFile,
}

impl JobFileBuilder {
    pub fn new() -> Self {
        Self {
            raw: RawJobFile {
                config: ConfigSection::default(),
                job: BTreeMap::new(),
            },
        }
    }

    pub fn with_job(mut self, name: &str, cmd: &str, after: &[&str]) -> Self {
        self.raw.job.insert(
            name.to_string(),
            JobConfig {
                cmd: cmd.to_string(),
                after: after.iter().map(|s| s.to_string()).collect(),
            },
        );
        self
    }

    pub fn with_timeout(mut self, timeout: &str) -> Self {
        self.raw.config.timeout = Some(timeout.to_string());
        self
    }

    pub fn with_fail_fast(mut self, val: bool) -> Self {
        self.raw.config.fail_fast = val;
        self
    }

    pub fn build(self) -> JobFile {
        JobFile::try_from(self.raw).expect("Failed to build valid job file from builder")
    }
}

impl Default for JobFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}
