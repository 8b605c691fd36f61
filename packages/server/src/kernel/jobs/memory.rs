//! In-process job queue.
//!
//! Same state machine as [`PostgresJobQueue`](super::PostgresJobQueue), kept in
//! a mutex-guarded map. Used by tests and by single-process runs that have no
//! database for the queue.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use super::job::{ErrorKind, FailureOutcome, Job, JobStatus};
use super::queue::{ClaimedJob, EnqueueResult, JobQueue, NewJob, DEFAULT_LEASE};

#[derive(Clone)]
pub struct InMemoryJobQueue {
    jobs: Arc<Mutex<HashMap<Uuid, Job>>>,
    lease: Duration,
}

impl Default for InMemoryJobQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryJobQueue {
    pub fn new() -> Self {
        Self::with_lease(DEFAULT_LEASE)
    }

    /// Lease granted to each claim; see [`JobRunnerConfig::lease_duration`](super::JobRunnerConfig::lease_duration).
    pub fn with_lease(lease: Duration) -> Self {
        Self {
            jobs: Arc::new(Mutex::new(HashMap::new())),
            lease,
        }
    }

    /// Snapshot of every job, oldest first.
    pub async fn jobs(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = self.jobs.lock().await.values().cloned().collect();
        jobs.sort_by_key(|job| job.created_at);
        jobs
    }
}

#[async_trait]
impl JobQueue for InMemoryJobQueue {
    async fn enqueue(&self, new_job: NewJob) -> Result<EnqueueResult> {
        let mut jobs = self.jobs.lock().await;

        if let Some(key) = &new_job.idempotency_key {
            let existing = jobs.values().find(|job| {
                job.job_type == new_job.job_type
                    && job.idempotency_key.as_deref() == Some(key.as_str())
                    && job.status != JobStatus::Failed
            });
            if let Some(existing) = existing {
                return Ok(EnqueueResult::Duplicate(existing.id));
            }
        }

        let job = new_job.into_job();
        let id = job.id;
        jobs.insert(id, job);
        Ok(EnqueueResult::Created(id))
    }

    async fn claim(&self, worker_id: &str, limit: i64) -> Result<Vec<ClaimedJob>> {
        let now = Utc::now();
        let lease = chrono::Duration::from_std(self.lease)?;
        let mut jobs = self.jobs.lock().await;

        for job in jobs
            .values_mut()
            .filter(|job| job.lease_expired(now) && job.attempts_remaining() == 0)
        {
            job.fail_expired_lease(now);
            warn!(job_id = %job.id, attempts = job.attempt, "lease expired on final attempt, job failed");
        }

        let mut ready: Vec<&mut Job> = jobs.values_mut().filter(|j| j.is_claimable(now)).collect();
        ready.sort_by_key(|job| job.next_run_at.unwrap_or(job.created_at));

        Ok(ready
            .into_iter()
            .take(limit.max(0) as usize)
            .map(|job| {
                job.status = JobStatus::Running;
                job.attempt += 1;
                job.worker_id = Some(worker_id.to_string());
                job.lease_expires_at = Some(now + lease);
                job.updated_at = now;
                ClaimedJob {
                    id: job.id,
                    job: job.clone(),
                }
            })
            .collect())
    }

    async fn mark_succeeded(&self, job_id: Uuid, result: serde_json::Value) -> Result<()> {
        let mut jobs = self.jobs.lock().await;
        let job = jobs
            .get_mut(&job_id)
            .ok_or_else(|| anyhow!("job {} not found", job_id))?;

        job.status = JobStatus::Succeeded;
        job.result = Some(result);
        job.error_message = None;
        job.error_kind = None;
        job.lease_expires_at = None;
        job.updated_at = Utc::now();
        Ok(())
    }

    async fn mark_failed(&self, job_id: Uuid, error: &str, kind: ErrorKind) -> Result<JobStatus> {
        let now = Utc::now();
        let mut jobs = self.jobs.lock().await;
        let job = jobs
            .get_mut(&job_id)
            .ok_or_else(|| anyhow!("job {} not found", job_id))?;

        job.error_message = Some(error.to_string());
        job.error_kind = Some(kind);
        job.lease_expires_at = None;
        job.updated_at = now;

        match job.failure_outcome(kind, now) {
            FailureOutcome::Retry { run_at } => {
                job.status = JobStatus::Retrying;
                job.retry_count += 1;
                job.next_run_at = Some(run_at);
                info!(job_id = %job_id, attempt = job.attempt, retry_at = %run_at, "job requeued for retry");
            }
            FailureOutcome::Fail => {
                job.status = JobStatus::Failed;
                warn!(job_id = %job_id, attempts = job.attempt, error = %error, "job failed permanently");
            }
        }

        Ok(job.status)
    }

    async fn find(&self, job_id: Uuid) -> Result<Option<Job>> {
        Ok(self.jobs.lock().await.get(&job_id).cloned())
    }
}
