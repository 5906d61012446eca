//! End-to-end scenario: the Task Scheduler drives a small mixed workload of
//! indexing, contemplation, and bridge-retention tasks across priority
//! levels, dependencies, and a retryable failure, exactly the shape the
//! assembled daemon's event loop drives it through (spec §4.1).

use noesis_core::{Priority, Scheduler, Task, TaskStatus};
use std::time::Duration;

#[test]
fn high_priority_indexing_job_preempts_a_deferred_optimization_pass() {
    let scheduler = Scheduler::new(2);

    let optimization = scheduler.submit(Task::new("semantic_optimize", Priority::Deferred));
    let indexing = scheduler.submit(Task::new("index_new_conversation", Priority::High).user_triggered());

    let first = scheduler.tick().expect("a task should be ready");
    assert_eq!(first.id, indexing, "high priority user-triggered work runs before a deferred sweep");

    scheduler.complete(indexing, Ok("indexed".to_string()));
    assert_eq!(scheduler.status(optimization), Some(TaskStatus::Queued));
}

#[test]
fn contemplation_cycle_waits_on_its_indexing_dependency() {
    let scheduler = Scheduler::new(2);

    let index_task = scheduler.submit(Task::new("index_batch", Priority::Normal));
    let contemplate = Task::new("contemplation_cycle", Priority::Normal).depends_on([index_task]);
    let contemplate_id = scheduler.submit(contemplate);

    let next = scheduler.tick().expect("the indexing task should run first");
    assert_eq!(next.id, index_task);
    assert!(
        scheduler.tick().is_none(),
        "contemplation must not start before its indexing dependency completes"
    );

    scheduler.complete(index_task, Ok("1 chunk indexed".to_string()));
    let contemplation_run = scheduler.tick().expect("contemplation is now unblocked");
    assert_eq!(contemplation_run.id, contemplate_id);
}

#[test]
fn transient_embedding_failure_retries_the_indexing_task_at_lower_priority() {
    let scheduler = Scheduler::new(1);
    let task = Task::new("index_conversation", Priority::High).with_max_retries(1);
    let id = scheduler.submit(task);

    scheduler.tick().unwrap();
    scheduler.complete(id, Err("embedding service unavailable".to_string()));
    assert_eq!(scheduler.status(id), Some(TaskStatus::FailedRetryable));

    let retried = scheduler.tick().expect("the task is requeued for retry");
    assert_eq!(retried.id, id);
    assert_eq!(retried.priority, Priority::Low);

    scheduler.complete(id, Ok("indexed on retry".to_string()));
    assert_eq!(scheduler.status(id), Some(TaskStatus::Completed));
}

#[test]
fn periodic_bridge_retention_sweep_fires_once_its_interval_elapses() {
    let scheduler = Scheduler::new(2);
    scheduler.register_periodic("bridge_retention_sweep", Duration::from_millis(0), Priority::Low);
    std::thread::sleep(Duration::from_millis(5));

    let due = scheduler.tick().expect("the periodic sweep should have fired");
    assert_eq!(due.name, "bridge_retention_sweep");
}
