//! Task lifecycle through the dispatcher and runner on the in-memory queue.

mod common;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use sidequest_core::domains::Pipeline;
use sidequest_core::kernel::jobs::{
    BackoffPolicy, ErrorKind, InMemoryJobQueue, JobQueue, JobRunner, JobRunnerConfig, JobStatus, TaskDispatcher,
};
use sidequest_core::kernel::{MockAI, TestDependencies};
use sidequest_core::server::build_registry;
use tokio_test::{assert_err, assert_ok};

use crate::common::{developer_profile, three_side_jobs};

struct Rig {
    queue: Arc<InMemoryJobQueue>,
    dispatcher: TaskDispatcher,
    runner: JobRunner,
    ai: Arc<MockAI>,
    store: sidequest_core::kernel::InMemoryStore,
}

fn rig(ai: MockAI, max_retries: i32) -> Rig {
    let queue = Arc::new(InMemoryJobQueue::new());
    let registry = build_registry();
    let test_deps = TestDependencies::new().with_ai(ai);
    let ai = test_deps.ai.clone();
    let store = test_deps.store.clone();

    let job_queue: Arc<dyn JobQueue> = queue.clone();
    let dispatcher = TaskDispatcher::new(job_queue.clone(), registry.clone())
        .with_retry_policy(max_retries, BackoffPolicy::immediate());
    let config = JobRunnerConfig {
        poll_interval: Duration::from_millis(10),
        ..Default::default()
    };
    let runner = JobRunner::with_config(job_queue, registry, test_deps.into_deps(), config);

    Rig {
        queue,
        dispatcher,
        runner,
        ai,
        store,
    }
}

/// Drive the runner until the queue has nothing claimable.
async fn drain(runner: &JobRunner) {
    for _ in 0..20 {
        if assert_ok!(runner.process_batch().await) == 0 {
            return;
        }
    }
    panic!("queue did not drain");
}

#[tokio::test]
async fn task_that_fails_twice_then_succeeds_ends_succeeded() {
    let ai = MockAI::new()
        .with_error("connection reset")
        .with_error("upstream timeout")
        .with_json_response(three_side_jobs());
    let rig = rig(ai, 3);

    let payload = serde_json::to_value(developer_profile(1)).unwrap();
    let task_id = assert_ok!(rig.dispatcher.submit(Pipeline::GenerateSideJobs.as_str(), payload).await);
    drain(&rig.runner).await;

    let outcome = rig.dispatcher.result(task_id).await.unwrap().unwrap();
    assert_eq!(outcome.status, JobStatus::Succeeded);
    assert!(outcome.ready && outcome.successful);
    assert_eq!(outcome.error, None);
    let saved = outcome.result.unwrap()["saved_entities"].as_array().unwrap().len();
    assert_eq!(saved, 3);

    let job = rig.queue.jobs().await.remove(0);
    assert_eq!(job.attempt, 3);
    assert_eq!(job.retry_count, 2);
    assert_eq!(rig.ai.call_count(), 3);
    // Only the successful attempt reached the database
    assert_eq!(rig.store.count("side_jobs"), 3);
}

#[tokio::test]
async fn task_that_always_fails_stops_after_max_retries() {
    let ai = MockAI::new()
        .with_error("boom 1")
        .with_error("boom 2")
        .with_error("boom 3")
        .with_error("boom 4");
    let rig = rig(ai, 3);

    let payload = serde_json::to_value(developer_profile(1)).unwrap();
    let task_id = rig
        .dispatcher
        .submit(Pipeline::GenerateSideJobs.as_str(), payload)
        .await
        .unwrap();
    drain(&rig.runner).await;

    let outcome = rig.dispatcher.result(task_id).await.unwrap().unwrap();
    assert_eq!(outcome.status, JobStatus::Failed);
    assert!(outcome.ready);
    assert!(!outcome.successful);
    assert!(outcome.error.unwrap().contains("boom 3"));

    let job = rig.queue.jobs().await.remove(0);
    assert_eq!(job.attempt, 3);
    assert_eq!(job.error_kind, Some(ErrorKind::Retryable));
    assert_eq!(rig.ai.call_count(), 3);
}

#[tokio::test]
async fn empty_generation_is_retried() {
    let ai = MockAI::new()
        .with_json_response(json!({"side_jobs": []}))
        .with_json_response(three_side_jobs());
    let rig = rig(ai, 3);

    let payload = serde_json::to_value(developer_profile(1)).unwrap();
    let task_id = rig
        .dispatcher
        .submit(Pipeline::GenerateSideJobs.as_str(), payload)
        .await
        .unwrap();
    drain(&rig.runner).await;

    assert_eq!(
        rig.dispatcher.status(task_id).await.unwrap(),
        Some(JobStatus::Succeeded)
    );
    assert_eq!(rig.ai.call_count(), 2);
}

#[tokio::test]
async fn malformed_payload_fails_without_retry() {
    let rig = rig(MockAI::new(), 3);

    let task_id = rig
        .dispatcher
        .submit(Pipeline::GenerateMissions.as_str(), json!({"title": "no ids"}))
        .await
        .unwrap();
    drain(&rig.runner).await;

    let job = rig.queue.jobs().await.remove(0);
    assert_eq!(job.id, task_id);
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.attempt, 1);
    assert_eq!(job.error_kind, Some(ErrorKind::NonRetryable));
    assert!(!rig.ai.was_called_with("no ids"));
}

#[tokio::test]
async fn duplicate_submission_returns_existing_task() {
    let rig = rig(MockAI::new().with_json_response(three_side_jobs()), 3);
    let payload = serde_json::to_value(developer_profile(1)).unwrap();

    let first = rig
        .dispatcher
        .submit_with_key("generate_side_jobs", payload.clone(), "profile-1")
        .await
        .unwrap();
    let second = rig
        .dispatcher
        .submit_with_key("generate_side_jobs", payload, "profile-1")
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(rig.queue.jobs().await.len(), 1);
}

#[tokio::test]
async fn unknown_pipeline_is_rejected_at_submit() {
    let rig = rig(MockAI::new(), 3);
    assert_err!(rig.dispatcher.submit("generate_everything", json!({})).await);
    assert!(rig.queue.jobs().await.is_empty());
}

#[tokio::test]
async fn wait_returns_once_the_runner_finishes() {
    let rig = rig(MockAI::new().with_json_response(three_side_jobs()), 3);
    let payload = serde_json::to_value(developer_profile(1)).unwrap();
    let task_id = rig
        .dispatcher
        .submit(Pipeline::GenerateSideJobs.as_str(), payload)
        .await
        .unwrap();

    let shutdown = rig.runner.shutdown_handle();
    let worker = tokio::spawn(rig.runner.run());

    let outcome = rig
        .dispatcher
        .wait(task_id, Duration::from_secs(5), Duration::from_millis(10))
        .await
        .unwrap()
        .unwrap();
    shutdown.store(true, std::sync::atomic::Ordering::SeqCst);
    let _ = worker.await;

    assert!(outcome.successful);
}
