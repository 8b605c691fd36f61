//! Job queue trait and the PostgreSQL-backed implementation.

use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use super::job::{BackoffPolicy, ErrorKind, FailureOutcome, Job, JobStatus, LEASE_EXPIRED_PREFIX};

/// Lease used when no soft time limit is known.
pub const DEFAULT_LEASE: Duration = Duration::from_secs(300);

/// Result type for enqueue operations that handles idempotency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueResult {
    /// Job was enqueued, returns new job ID
    Created(Uuid),
    /// A live job with the same idempotency key exists, returns its ID
    Duplicate(Uuid),
}

impl EnqueueResult {
    /// Get the job ID regardless of whether it was created or duplicate
    pub fn job_id(&self) -> Uuid {
        match self {
            EnqueueResult::Created(id) | EnqueueResult::Duplicate(id) => *id,
        }
    }

    /// Returns true if this was a newly created job
    pub fn is_created(&self) -> bool {
        matches!(self, EnqueueResult::Created(_))
    }
}

/// A claimed job ready for execution.
#[derive(Debug, Clone)]
pub struct ClaimedJob {
    pub id: Uuid,
    pub job: Job,
}

impl ClaimedJob {
    pub fn job_type(&self) -> &str {
        &self.job.job_type
    }

    pub fn attempt(&self) -> i32 {
        self.job.attempt
    }
}

/// Everything needed to create a job.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub job_type: String,
    pub args: serde_json::Value,
    pub max_retries: i32,
    pub backoff: BackoffPolicy,
    pub idempotency_key: Option<String>,
}

impl NewJob {
    pub fn new(job_type: impl Into<String>, args: serde_json::Value) -> Self {
        Self {
            job_type: job_type.into(),
            args,
            max_retries: 3,
            backoff: BackoffPolicy::default(),
            idempotency_key: None,
        }
    }

    pub fn into_job(self) -> Job {
        let job = Job::builder()
            .job_type(self.job_type)
            .args(self.args)
            .max_retries(self.max_retries.max(1))
            .build()
            .with_backoff(self.backoff);
        Job {
            idempotency_key: self.idempotency_key,
            ..job
        }
    }
}

/// Trait for job queue operations.
///
/// Implementations store serialized pipeline payloads and track each job
/// through `pending -> running -> {succeeded | retrying -> running | failed}`.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Enqueue a job for immediate execution.
    ///
    /// If the job carries an idempotency key and a job of the same type with
    /// that key is pending, running, retrying or succeeded, returns
    /// `EnqueueResult::Duplicate` with the existing job ID.
    async fn enqueue(&self, job: NewJob) -> Result<EnqueueResult>;

    /// Claim up to `limit` runnable jobs and mark them running.
    ///
    /// Jobs whose lease expired are reclaimed while attempts remain. Those
    /// that used their last attempt are marked failed with
    /// `ErrorKind::TimedOut` instead.
    async fn claim(&self, worker_id: &str, limit: i64) -> Result<Vec<ClaimedJob>>;

    /// Store the result and mark the job succeeded.
    async fn mark_succeeded(&self, job_id: Uuid, result: serde_json::Value) -> Result<()>;

    /// Record a failed attempt.
    ///
    /// Requeues as `retrying` with backoff while attempts remain, otherwise
    /// marks the job `failed`. Returns the resulting status.
    async fn mark_failed(&self, job_id: Uuid, error: &str, kind: ErrorKind) -> Result<JobStatus>;

    async fn find(&self, job_id: Uuid) -> Result<Option<Job>>;
}

/// PostgreSQL-backed job queue implementation.
#[derive(Clone)]
pub struct PostgresJobQueue {
    pool: PgPool,
    lease_ms: i64,
}

impl PostgresJobQueue {
    pub fn new(pool: PgPool) -> Self {
        Self::with_lease(pool, DEFAULT_LEASE)
    }

    /// Create with a custom lease duration.
    ///
    /// Keep it longer than the runner's soft time limit, or live attempts get
    /// reclaimed; see [`JobRunnerConfig::lease_duration`](super::JobRunnerConfig::lease_duration).
    pub fn with_lease(pool: PgPool, lease: Duration) -> Self {
        Self {
            pool,
            lease_ms: i64::try_from(lease.as_millis()).unwrap_or(i64::MAX),
        }
    }

    /// Find a live job of `job_type` with the given idempotency key.
    pub async fn find_by_idempotency_key(&self, job_type: &str, key: &str) -> Result<Option<Job>> {
        let job = sqlx::query_as::<_, Job>(
            r#"
            SELECT *
            FROM jobs
            WHERE job_type = $1
              AND idempotency_key = $2
              AND status IN ('pending', 'running', 'retrying', 'succeeded')
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(job_type)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(job)
    }

    /// Fail running jobs whose lease expired on their final attempt.
    ///
    /// Returns how many jobs were failed.
    pub async fn fail_exhausted_leases(&self) -> Result<u64> {
        let failed = sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'failed',
                error_kind = 'timed_out',
                error_message = $1 || attempt,
                lease_expires_at = NULL,
                updated_at = NOW()
            WHERE status = 'running'
              AND lease_expires_at < NOW()
              AND attempt >= max_retries
            "#,
        )
        .bind(LEASE_EXPIRED_PREFIX)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if failed > 0 {
            warn!(count = failed, "failed jobs whose lease expired on their final attempt");
        }
        Ok(failed)
    }

    async fn insert(&self, job: &Job) -> Result<Job> {
        let inserted = sqlx::query_as::<_, Job>(
            r#"
            INSERT INTO jobs (id, job_type, args, status, attempt, retry_count, max_retries,
                              backoff_base_ms, backoff_max_ms, idempotency_key, next_run_at,
                              created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *
            "#,
        )
        .bind(job.id)
        .bind(&job.job_type)
        .bind(&job.args)
        .bind(job.status)
        .bind(job.attempt)
        .bind(job.retry_count)
        .bind(job.max_retries)
        .bind(job.backoff_base_ms)
        .bind(job.backoff_max_ms)
        .bind(&job.idempotency_key)
        .bind(job.next_run_at)
        .bind(job.created_at)
        .bind(job.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(inserted)
    }
}

#[async_trait]
impl JobQueue for PostgresJobQueue {
    async fn enqueue(&self, job: NewJob) -> Result<EnqueueResult> {
        // Check idempotency first
        if let Some(key) = &job.idempotency_key {
            if let Some(existing) = self.find_by_idempotency_key(&job.job_type, key).await? {
                return Ok(EnqueueResult::Duplicate(existing.id));
            }
        }

        // The partial unique index on idempotency_key backs up the check above
        let inserted = self.insert(&job.into_job()).await?;
        Ok(EnqueueResult::Created(inserted.id))
    }

    async fn claim(&self, worker_id: &str, limit: i64) -> Result<Vec<ClaimedJob>> {
        self.fail_exhausted_leases().await?;

        let jobs = sqlx::query_as::<_, Job>(
            r#"
            WITH next_jobs AS (
                SELECT id
                FROM jobs
                WHERE
                    (status IN ('pending', 'retrying') AND (next_run_at IS NULL OR next_run_at <= NOW()))
                    OR (status = 'running' AND lease_expires_at < NOW() AND attempt < max_retries)
                ORDER BY COALESCE(next_run_at, created_at)
                LIMIT $1
                FOR UPDATE SKIP LOCKED
            )
            UPDATE jobs
            SET
                status = 'running',
                attempt = attempt + 1,
                worker_id = $2,
                lease_expires_at = NOW() + ($3 || ' milliseconds')::INTERVAL,
                updated_at = NOW()
            WHERE id IN (SELECT id FROM next_jobs)
            RETURNING *
            "#,
        )
        .bind(limit)
        .bind(worker_id)
        .bind(self.lease_ms.to_string())
        .fetch_all(&self.pool)
        .await?;

        Ok(jobs
            .into_iter()
            .map(|job| ClaimedJob { id: job.id, job })
            .collect())
    }

    async fn mark_succeeded(&self, job_id: Uuid, result: serde_json::Value) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'succeeded',
                result = $1,
                error_message = NULL,
                error_kind = NULL,
                lease_expires_at = NULL,
                updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(result)
        .bind(job_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn mark_failed(&self, job_id: Uuid, error: &str, kind: ErrorKind) -> Result<JobStatus> {
        let job = self
            .find(job_id)
            .await?
            .ok_or_else(|| anyhow!("job {} not found", job_id))?;

        match job.failure_outcome(kind, Utc::now()) {
            FailureOutcome::Retry { run_at } => {
                sqlx::query(
                    r#"
                    UPDATE jobs
                    SET status = 'retrying',
                        retry_count = retry_count + 1,
                        next_run_at = $1,
                        error_message = $2,
                        error_kind = $3,
                        lease_expires_at = NULL,
                        updated_at = NOW()
                    WHERE id = $4
                    "#,
                )
                .bind(run_at)
                .bind(error)
                .bind(kind)
                .bind(job_id)
                .execute(&self.pool)
                .await?;

                info!(job_id = %job_id, attempt = job.attempt, retry_at = %run_at, "job requeued for retry");
                Ok(JobStatus::Retrying)
            }
            FailureOutcome::Fail => {
                sqlx::query(
                    r#"
                    UPDATE jobs
                    SET status = 'failed',
                        error_message = $1,
                        error_kind = $2,
                        lease_expires_at = NULL,
                        updated_at = NOW()
                    WHERE id = $3
                    "#,
                )
                .bind(error)
                .bind(kind)
                .bind(job_id)
                .execute(&self.pool)
                .await?;

                warn!(job_id = %job_id, attempts = job.attempt, error = %error, "job failed permanently");
                Ok(JobStatus::Failed)
            }
        }
    }

    async fn find(&self, job_id: Uuid) -> Result<Option<Job>> {
        let job = sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = $1")
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(job)
    }
}
