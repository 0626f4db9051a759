// tests/runtime_fake_executor.rs

use std::error::Error;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;

use jobdag::config::JobFile;
use jobdag::engine::{RunSummary, Runtime, RuntimeEvent, RuntimeOptions};
use jobdag::errors::{JobdagError, Result};
use jobdag::exec::{ExecutorBackend, ScheduledJob};
use jobdag_test_utils::builders::JobFileBuilder;
use jobdag_test_utils::fake_executor::FakeExecutor;
use jobdag_test_utils::{init_tracing, with_timeout};

type TestResult = std::result::Result<(), Box<dyn Error>>;

/// A -> {B, C} -> D
fn diamond_job_file() -> JobFileBuilder {
    JobFileBuilder::new()
        .with_job("A", "echo A", &[])
        .with_job("B", "echo B", &["A"])
        .with_job("C", "echo C", &["A"])
        .with_job("D", "echo D", &["B", "C"])
}

/// Accepts jobs and never reports them finished.
struct SilentExecutor {
    received: Arc<Mutex<Vec<String>>>,
}

impl ExecutorBackend for SilentExecutor {
    fn spawn_jobs(
        &mut self,
        jobs: Vec<ScheduledJob>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let received = Arc::clone(&self.received);
        Box::pin(async move {
            received
                .lock()
                .unwrap()
                .extend(jobs.into_iter().map(|j| j.name));
            Ok(())
        })
    }
}

async fn run_with_fake(
    cfg: JobFile,
    configure: impl FnOnce(FakeExecutor) -> FakeExecutor,
) -> (Result<RunSummary>, Vec<String>) {
    let (tx, rx) = mpsc::channel::<RuntimeEvent>(64);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor = configure(FakeExecutor::new(tx, Arc::clone(&executed)));
    let options = RuntimeOptions::from_job_file(&cfg).unwrap();

    let runtime = Runtime::new(&cfg, rx, executor, options);
    let result = with_timeout(runtime.run()).await;

    let executed = executed.lock().unwrap().clone();
    (result, executed)
}

#[tokio::test]
async fn diamond_runs_every_job_in_dependency_order() -> TestResult {
    init_tracing();
    let (result, executed) = run_with_fake(diamond_job_file().build(), |e| e).await;

    let summary = result?;
    assert_eq!(summary.started, 4);
    assert_eq!(summary.completed, 4);
    assert!(summary.failed.is_empty());
    assert!(!summary.interrupted);

    assert_eq!(executed.len(), 4);
    assert_eq!(executed.first().map(String::as_str), Some("A"));
    assert_eq!(executed.last().map(String::as_str), Some("D"));
    Ok(())
}

#[tokio::test]
async fn independent_jobs_are_dispatched_together() -> TestResult {
    let cfg = JobFileBuilder::new()
        .with_job("x", "true", &[])
        .with_job("y", "true", &[])
        .with_job("z", "true", &["x", "y"])
        .build();

    let (result, executed) = run_with_fake(cfg, |e| e).await;

    assert_eq!(result?.completed, 3);
    assert_eq!(executed, vec!["x", "y", "z"]);
    Ok(())
}

#[tokio::test]
async fn failed_job_still_unlocks_dependents_by_default() -> TestResult {
    let (result, executed) =
        run_with_fake(diamond_job_file().build(), |e| e.failing("B", 2)).await;

    let summary = result?;
    assert_eq!(summary.failed, vec!["B".to_string()]);
    assert_eq!(summary.completed, 4);
    assert!(executed.contains(&"D".to_string()));
    Ok(())
}

#[tokio::test]
async fn fail_fast_stops_on_first_failure() -> TestResult {
    let cfg = diamond_job_file().with_fail_fast(true).build();
    let (result, executed) = run_with_fake(cfg, |e| e.failing("A", 7)).await;

    match result {
        Err(JobdagError::JobFailed { job, code }) => {
            assert_eq!(job, "A");
            assert_eq!(code, 7);
        }
        other => panic!("expected JobFailed, got {:?}", other),
    }
    assert_eq!(executed, vec!["A"]);
    Ok(())
}

#[tokio::test]
async fn run_times_out_when_jobs_never_finish() -> TestResult {
    let cfg = diamond_job_file().with_timeout("50ms").build();
    let (_tx, rx) = mpsc::channel::<RuntimeEvent>(8);
    let received = Arc::new(Mutex::new(Vec::new()));
    let executor = SilentExecutor {
        received: Arc::clone(&received),
    };
    let options = RuntimeOptions::from_job_file(&cfg)?;
    assert_eq!(options.timeout, Some(Duration::from_millis(50)));

    let result = with_timeout(Runtime::new(&cfg, rx, executor, options).run()).await;

    assert!(matches!(result, Err(JobdagError::Timeout(_))));
    assert_eq!(*received.lock().unwrap(), vec!["A"]);
    Ok(())
}

#[tokio::test]
async fn shutdown_request_interrupts_the_run() -> TestResult {
    let cfg = diamond_job_file().build();
    let (tx, rx) = mpsc::channel::<RuntimeEvent>(8);
    let executor = SilentExecutor {
        received: Arc::new(Mutex::new(Vec::new())),
    };
    tx.send(RuntimeEvent::ShutdownRequested).await?;

    let runtime = Runtime::new(&cfg, rx, executor, RuntimeOptions::default());
    let summary = with_timeout(runtime.run()).await?;

    assert!(summary.interrupted);
    assert_eq!(summary.started, 1);
    assert_eq!(summary.completed, 0);
    Ok(())
}

#[tokio::test]
async fn closed_event_channel_is_an_error() -> TestResult {
    let cfg = diamond_job_file().build();
    let (tx, rx) = mpsc::channel::<RuntimeEvent>(8);
    drop(tx);
    let executor = SilentExecutor {
        received: Arc::new(Mutex::new(Vec::new())),
    };

    let result = with_timeout(Runtime::new(&cfg, rx, executor, RuntimeOptions::default()).run()).await;

    let err = result.unwrap_err();
    assert!(err.to_string().contains("channel closed"));
    Ok(())
}
