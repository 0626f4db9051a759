// tests/scheduler_hooks.rs

use std::sync::{Arc, Mutex};

use jobdag::dag::{
    EventBus, LifecycleEvent, LifecycleKind, Scheduler, SchedulerContext, SchedulerHooks,
    SchedulerState,
};
use jobdag::errors::{JobdagError, Result};
use jobdag_test_utils::init_tracing;
use jobdag_test_utils::recording::RecordingRunner;

type Job = &'static str;

/// Records every hook invocation as a short string.
#[derive(Debug, Default)]
struct TracingHooks {
    calls: Mutex<Vec<String>>,
    start_with: Option<Job>,
}

impl TracingHooks {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn push(&self, entry: String) {
        self.calls.lock().unwrap().push(entry);
    }
}

impl SchedulerHooks<Job> for TracingHooks {
    fn on_scheduler_start(&self, ctx: &SchedulerContext<'_, Job>) -> Result<()> {
        self.push("start".to_string());
        match self.start_with {
            Some(job) => ctx.start_job(&job),
            None => Ok(()),
        }
    }

    fn on_before_job_started(&self, _ctx: &SchedulerContext<'_, Job>, job: &Job) -> Result<()> {
        self.push(format!("before_started:{job}"));
        Ok(())
    }

    fn on_after_job_started(&self, _ctx: &SchedulerContext<'_, Job>, job: &Job) -> Result<()> {
        self.push(format!("after_started:{job}"));
        Ok(())
    }

    fn on_before_job_completed(&self, _ctx: &SchedulerContext<'_, Job>, job: &Job) -> Result<()> {
        self.push(format!("before_completed:{job}"));
        Ok(())
    }

    fn on_after_job_completed(&self, _ctx: &SchedulerContext<'_, Job>, job: &Job) -> Result<()> {
        self.push(format!("after_completed:{job}"));
        Ok(())
    }

    fn on_scheduler_completed(&self, ctx: &SchedulerContext<'_, Job>) -> Result<()> {
        self.push(format!("completed:{}", ctx.is_completed()));
        Ok(())
    }
}

/// Uses nothing but the defaults.
struct NoopHooks;

impl SchedulerHooks<Job> for NoopHooks {}

#[test]
fn events_are_dispatched_to_matching_hooks() -> Result<()> {
    init_tracing();
    let bus = Arc::new(EventBus::new(RecordingRunner::<Job>::new()));
    let scheduler = Scheduler::new(Arc::clone(&bus), TracingHooks::default());

    scheduler.start()?;
    bus.start_job(&"A")?;
    bus.complete_job(&"A")?;
    scheduler.stop()?;

    assert_eq!(
        scheduler.hooks().calls(),
        vec![
            "start",
            "before_started:A",
            "after_started:A",
            "before_completed:A",
            "after_completed:A",
            "completed:true",
        ]
    );
    Ok(())
}

#[test]
fn start_hook_can_start_jobs_through_the_context() -> Result<()> {
    let runner = RecordingRunner::new();
    let bus = Arc::new(EventBus::new(runner.clone()));
    let hooks = TracingHooks {
        start_with: Some("seed"),
        ..Default::default()
    };
    let scheduler = Scheduler::new(Arc::clone(&bus), hooks);

    scheduler.start()?;

    assert_eq!(runner.started(), vec!["seed"]);
    assert_eq!(
        scheduler.hooks().calls(),
        vec!["start", "before_started:seed", "after_started:seed"]
    );
    Ok(())
}

#[test]
fn events_from_another_bus_are_ignored() -> Result<()> {
    let bus = Arc::new(EventBus::new(RecordingRunner::<Job>::new()));
    let other = EventBus::new(RecordingRunner::<Job>::new());
    let scheduler = Scheduler::new(Arc::clone(&bus), TracingHooks::default());
    scheduler.start()?;

    bus.publish(&LifecycleEvent::job_event(
        other.id(),
        LifecycleKind::AfterCompleted,
        "A",
    ))?;

    assert_eq!(scheduler.hooks().calls(), vec!["start"]);
    Ok(())
}

#[test]
fn stop_unsubscribes_and_blocks_restart() -> Result<()> {
    let bus = Arc::new(EventBus::new(RecordingRunner::<Job>::new()));
    let scheduler = Scheduler::new(Arc::clone(&bus), TracingHooks::default());

    assert_eq!(scheduler.state(), SchedulerState::Idle);
    scheduler.start()?;
    assert_eq!(bus.subscriber_count(), 1);

    scheduler.stop()?;
    assert!(scheduler.is_completed());
    assert_eq!(bus.subscriber_count(), 0);

    // Further traffic is not observed.
    bus.start_job(&"late")?;
    assert!(!scheduler.hooks().calls().iter().any(|c| c.contains("late")));

    match scheduler.start() {
        Err(err @ JobdagError::CannotRestart) => {
            assert_eq!(err.to_string(), "cannot restart a stopped scheduler");
        }
        other => panic!("expected CannotRestart, got {:?}", other),
    }
    Ok(())
}

#[test]
fn stopping_twice_is_safe() -> Result<()> {
    let bus = Arc::new(EventBus::new(RecordingRunner::<Job>::new()));
    let scheduler = Scheduler::new(Arc::clone(&bus), NoopHooks);

    scheduler.start()?;
    scheduler.stop()?;
    scheduler.stop()?;

    assert!(scheduler.is_completed());
    assert_eq!(bus.subscriber_count(), 0);
    Ok(())
}

#[test]
fn default_hooks_do_nothing() -> Result<()> {
    let runner = RecordingRunner::new();
    let bus = Arc::new(EventBus::new(runner.clone()));
    let scheduler = Scheduler::new(Arc::clone(&bus), NoopHooks);

    scheduler.start()?;
    bus.start_job(&"A")?;
    bus.complete_job(&"A")?;

    assert_eq!(scheduler.state(), SchedulerState::Running);
    assert_eq!(runner.calls().len(), 2);
    Ok(())
}
