//! Job model for background pipeline execution.
//!
//! A job is the queued envelope around one pipeline run: the pipeline name,
//! its JSON payload, and the retry bookkeeping.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use typed_builder::TypedBuilder;
use uuid::Uuid;

// ============================================================================
// Enums
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "job_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Pending,
    Running,
    /// Failed at least once and waiting for its backoff to elapse
    Retrying,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Retrying => "retrying",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "error_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Transient error - will retry if attempts remain
    #[default]
    Retryable,
    /// Permanent error - will not retry
    NonRetryable,
    /// Exceeded the soft time limit - will retry
    TimedOut,
}

impl ErrorKind {
    /// Whether this error kind should trigger a retry
    pub fn should_retry(&self) -> bool {
        matches!(self, ErrorKind::Retryable | ErrorKind::TimedOut)
    }
}

// ============================================================================
// Backoff
// ============================================================================

/// Exponential backoff: `base * 2^(attempt - 1)`, capped at `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub max: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(1),
            max: Duration::from_secs(3600),
        }
    }
}

impl BackoffPolicy {
    /// No delay between attempts.
    pub fn immediate() -> Self {
        Self {
            base: Duration::ZERO,
            max: Duration::ZERO,
        }
    }

    /// Delay before the attempt that follows failed attempt number `attempt`.
    pub fn delay_for(&self, attempt: i32) -> Duration {
        let exponent = attempt.saturating_sub(1).clamp(0, 31) as u32;
        self.base
            .saturating_mul(2u32.saturating_pow(exponent))
            .min(self.max)
    }
}

// ============================================================================
// Job Model
// ============================================================================

#[derive(FromRow, Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct Job {
    #[builder(default = Uuid::now_v7())]
    pub id: Uuid,

    /// Pipeline name the registry dispatches on
    pub job_type: String,
    pub args: serde_json::Value,

    #[builder(default)]
    pub status: JobStatus,

    // Retry bookkeeping
    /// Number of attempts started so far
    #[builder(default = 0)]
    pub attempt: i32,
    /// Number of failed attempts that were requeued
    #[builder(default = 0)]
    pub retry_count: i32,
    /// Total attempts allowed, including the first
    #[builder(default = 3)]
    pub max_retries: i32,
    #[builder(default = 1000)]
    pub backoff_base_ms: i64,
    #[builder(default = 3_600_000)]
    pub backoff_max_ms: i64,

    #[builder(default, setter(strip_option))]
    pub idempotency_key: Option<String>,
    #[builder(default, setter(strip_option))]
    pub next_run_at: Option<DateTime<Utc>>,

    // Lease for crash recovery
    #[builder(default, setter(strip_option))]
    pub worker_id: Option<String>,
    #[builder(default, setter(strip_option))]
    pub lease_expires_at: Option<DateTime<Utc>>,

    // Outcome
    #[builder(default, setter(strip_option))]
    pub result: Option<serde_json::Value>,
    #[builder(default, setter(strip_option))]
    pub error_message: Option<String>,
    #[builder(default, setter(strip_option))]
    pub error_kind: Option<ErrorKind>,

    #[builder(default = Utc::now())]
    pub created_at: DateTime<Utc>,
    #[builder(default = Utc::now())]
    pub updated_at: DateTime<Utc>,
}

/// What happens to a job after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    /// Requeue as `retrying`, eligible again at the given time
    Retry { run_at: DateTime<Utc> },
    /// Attempts exhausted or error not retryable
    Fail,
}

impl Job {
    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy {
            base: Duration::from_millis(self.backoff_base_ms.max(0) as u64),
            max: Duration::from_millis(self.backoff_max_ms.max(0) as u64),
        }
    }

    pub fn with_backoff(mut self, policy: BackoffPolicy) -> Self {
        self.backoff_base_ms = policy.base.as_millis() as i64;
        self.backoff_max_ms = policy.max.as_millis() as i64;
        self
    }

    pub fn attempts_remaining(&self) -> i32 {
        (self.max_retries - self.attempt).max(0)
    }

    /// Decide between requeue and terminal failure for the attempt just run.
    pub fn failure_outcome(&self, kind: ErrorKind, now: DateTime<Utc>) -> FailureOutcome {
        if !kind.should_retry() || self.attempts_remaining() == 0 {
            return FailureOutcome::Fail;
        }
        let delay = chrono::Duration::from_std(self.backoff().delay_for(self.attempt))
            .unwrap_or_else(|_| chrono::Duration::hours(1));
        FailureOutcome::Retry { run_at: now + delay }
    }

    /// Running, but the worker's lease ran out before it reported back.
    pub fn lease_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == JobStatus::Running && self.lease_expires_at.is_some_and(|at| at < now)
    }

    /// Whether a worker may pick this job up at `now`.
    ///
    /// An expired lease is only reclaimed while attempts remain; an exhausted
    /// one is failed by the queue instead.
    pub fn is_claimable(&self, now: DateTime<Utc>) -> bool {
        match self.status {
            JobStatus::Pending | JobStatus::Retrying => {
                self.next_run_at.map_or(true, |at| at <= now)
            }
            JobStatus::Running => self.lease_expired(now) && self.attempts_remaining() > 0,
            JobStatus::Succeeded | JobStatus::Failed => false,
        }
    }

    /// Fail a job whose final attempt lost its lease.
    pub fn fail_expired_lease(&mut self, now: DateTime<Utc>) {
        self.status = JobStatus::Failed;
        self.error_kind = Some(ErrorKind::TimedOut);
        self.error_message = Some(lease_expired_message(self.attempt));
        self.lease_expires_at = None;
        self.updated_at = now;
    }
}

pub(crate) const LEASE_EXPIRED_PREFIX: &str = "lease expired on final attempt ";

/// Error recorded when the last allowed attempt never reported back.
pub fn lease_expired_message(attempt: i32) -> String {
    format!("{}{}", LEASE_EXPIRED_PREFIX, attempt)
}
