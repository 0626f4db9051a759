#![allow(dead_code)]

use std::collections::HashSet;

use jobdag::dag::{EventBus, JobGraph, JobId};
use jobdag::errors::Result;
use jobdag_test_utils::recording::{RecordingRunner, RunnerCall};

/// Complete started-but-unfinished jobs one at a time, oldest first, until
/// nothing is left running. Returns how many completions were issued.
pub fn complete_all<V: JobId>(bus: &EventBus<V>, runner: &RecordingRunner<V>) -> Result<usize> {
    let mut issued = 0;
    loop {
        let completed = runner.completed();
        let next = runner
            .started()
            .into_iter()
            .find(|job| !completed.contains(job));

        match next {
            Some(job) => {
                bus.complete_job(&job)?;
                issued += 1;
            }
            None => return Ok(issued),
        }
    }
}

/// Assert every `Start(v)` in the log comes after `Complete(p)` for each
/// predecessor `p` of `v`.
pub fn assert_no_premature_start<V: JobId>(graph: &JobGraph<V>, calls: &[RunnerCall<V>]) {
    let mut completed: HashSet<V> = HashSet::new();
    for call in calls {
        match call {
            RunnerCall::Complete(job) => {
                completed.insert(job.clone());
            }
            RunnerCall::Start(job) => {
                for dep in graph.predecessors_of(job) {
                    assert!(
                        completed.contains(dep),
                        "{:?} started before its dependency {:?} completed",
                        job,
                        dep
                    );
                }
            }
        }
    }
}

pub fn sorted<T: Ord + Clone>(items: &[T]) -> Vec<T> {
    let mut v = items.to_vec();
    v.sort();
    v
}
