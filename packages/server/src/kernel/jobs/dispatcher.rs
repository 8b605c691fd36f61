//! Task submission and polling.
//!
//! `TaskDispatcher` is what callers see: submit a pipeline by name with a
//! JSON payload, get a task id back immediately, then poll status and result.
//! Execution happens on whichever `JobRunner` claims the job.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use super::job::{BackoffPolicy, Job, JobStatus};
use super::queue::{JobQueue, NewJob};
use super::registry::{RegistryError, SharedJobRegistry};

/// Snapshot of a task as reported to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskOutcome {
    pub task_id: Uuid,
    pub status: JobStatus,
    /// The task reached a terminal state
    pub ready: bool,
    pub successful: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TaskOutcome {
    fn from_job(job: Job) -> Self {
        let ready = job.status.is_terminal();
        let successful = job.status == JobStatus::Succeeded;
        Self {
            task_id: job.id,
            status: job.status,
            ready,
            successful,
            result: if successful { job.result } else { None },
            // Intermediate failures stay internal until the task gives up
            error: if job.status == JobStatus::Failed {
                job.error_message
            } else {
                None
            },
        }
    }
}

#[derive(Clone)]
pub struct TaskDispatcher {
    queue: Arc<dyn JobQueue>,
    registry: SharedJobRegistry,
    max_retries: i32,
    backoff: BackoffPolicy,
}

impl TaskDispatcher {
    pub fn new(queue: Arc<dyn JobQueue>, registry: SharedJobRegistry) -> Self {
        Self {
            queue,
            registry,
            max_retries: 3,
            backoff: BackoffPolicy::default(),
        }
    }

    /// Retry envelope applied to every submitted task.
    pub fn with_retry_policy(mut self, max_retries: i32, backoff: BackoffPolicy) -> Self {
        self.max_retries = max_retries;
        self.backoff = backoff;
        self
    }

    /// Pipelines this dispatcher accepts.
    pub fn pipelines(&self) -> Vec<&'static str> {
        self.registry.job_types()
    }

    /// Enqueue a pipeline run. Returns as soon as the task is stored.
    pub async fn submit(&self, pipeline: &str, payload: serde_json::Value) -> Result<Uuid> {
        self.enqueue(pipeline, payload, None).await
    }

    /// Like [`submit`](Self::submit), but a live task with the same key is
    /// returned instead of starting another run.
    pub async fn submit_with_key(
        &self,
        pipeline: &str,
        payload: serde_json::Value,
        idempotency_key: impl Into<String>,
    ) -> Result<Uuid> {
        self.enqueue(pipeline, payload, Some(idempotency_key.into()))
            .await
    }

    async fn enqueue(
        &self,
        pipeline: &str,
        payload: serde_json::Value,
        idempotency_key: Option<String>,
    ) -> Result<Uuid> {
        if !self.registry.is_registered(pipeline) {
            return Err(RegistryError::UnknownJobType(pipeline.to_string()).into());
        }

        let mut new_job = NewJob::new(pipeline, payload);
        new_job.max_retries = self.max_retries;
        new_job.backoff = self.backoff;
        new_job.idempotency_key = idempotency_key;

        let enqueued = self.queue.enqueue(new_job).await?;
        let task_id = enqueued.job_id();
        if enqueued.is_created() {
            info!(task_id = %task_id, pipeline, "task submitted");
        } else {
            info!(task_id = %task_id, pipeline, "duplicate submission, returning existing task");
        }
        Ok(task_id)
    }

    /// Current status, or `None` for an unknown id.
    pub async fn status(&self, task_id: Uuid) -> Result<Option<JobStatus>> {
        Ok(self.queue.find(task_id).await?.map(|job| job.status))
    }

    /// Status plus result (on success) or final error (on failure).
    pub async fn result(&self, task_id: Uuid) -> Result<Option<TaskOutcome>> {
        Ok(self.queue.find(task_id).await?.map(TaskOutcome::from_job))
    }

    /// Poll until the task is terminal or `timeout` elapses, returning the
    /// last observed outcome either way.
    pub async fn wait(
        &self,
        task_id: Uuid,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<Option<TaskOutcome>> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let outcome = self.result(task_id).await?;
            let done = outcome.as_ref().map_or(true, |o| o.ready);
            if done || tokio::time::Instant::now() >= deadline {
                return Ok(outcome);
            }
            tokio::time::sleep(poll_interval).await;
        }
    }
}
