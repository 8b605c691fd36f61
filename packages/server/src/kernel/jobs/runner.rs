//! Job runner service for processing background jobs.
//!
//! The `JobRunner` is a background service that:
//! - Polls the queue for ready jobs
//! - Executes each claimed job through the registry under a soft time limit
//! - Records the result, or hands the failure to the queue's retry policy
//!
//! # Architecture
//!
//! ```text
//! JobRunner
//!     │
//!     ├─► Claim batch (JobQueue)
//!     ├─► Run each job concurrently via JobRegistry (deserialize + pipeline)
//!     └─► Mark succeeded/failed (JobQueue handles retries and backoff)
//! ```
//!
//! # Example
//!
//! ```ignore
//! let registry = Arc::new(build_job_registry());
//! let runner = JobRunner::new(job_queue, registry, deps);
//!
//! // Spawn as background task
//! tokio::spawn(runner.run());
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use futures::future::join_all;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::queue::{ClaimedJob, JobQueue};
use super::registry::{RegistryError, SharedJobRegistry};
use super::ErrorKind;
use crate::kernel::ServerDeps;
use crate::workflow::WorkflowError;

/// Extra lease time on top of the soft time limit, so a live attempt is
/// always abandoned by its own runner before another worker may reclaim it.
pub const LEASE_GRACE: Duration = Duration::from_secs(30);

/// Configuration for the job runner.
#[derive(Debug, Clone)]
pub struct JobRunnerConfig {
    /// Maximum number of jobs to claim at once
    pub batch_size: i64,
    /// How long to wait when no jobs are available
    pub poll_interval: Duration,
    /// Attempts running longer than this are abandoned and retried
    pub soft_time_limit: Duration,
    /// Worker ID for this instance
    pub worker_id: String,
}

impl Default for JobRunnerConfig {
    fn default() -> Self {
        Self {
            batch_size: 4,
            poll_interval: Duration::from_secs(1),
            soft_time_limit: Duration::from_secs(120),
            worker_id: format!("runner-{}", Uuid::new_v4()),
        }
    }
}

impl JobRunnerConfig {
    /// Lease a queue should grant each claim: strictly longer than the soft
    /// time limit.
    pub fn lease_duration(&self) -> Duration {
        self.soft_time_limit.saturating_add(LEASE_GRACE)
    }

    /// Create a new config with a specific worker ID.
    pub fn with_worker_id(worker_id: impl Into<String>) -> Self {
        Self {
            worker_id: worker_id.into(),
            ..Default::default()
        }
    }
}

/// Background service that processes jobs from the queue.
pub struct JobRunner {
    job_queue: Arc<dyn JobQueue>,
    registry: SharedJobRegistry,
    deps: Arc<ServerDeps>,
    config: JobRunnerConfig,
    shutdown: Arc<AtomicBool>,
}

impl JobRunner {
    pub fn new(job_queue: Arc<dyn JobQueue>, registry: SharedJobRegistry, deps: Arc<ServerDeps>) -> Self {
        Self::with_config(job_queue, registry, deps, JobRunnerConfig::default())
    }

    pub fn with_config(
        job_queue: Arc<dyn JobQueue>,
        registry: SharedJobRegistry,
        deps: Arc<ServerDeps>,
        config: JobRunnerConfig,
    ) -> Self {
        Self {
            job_queue,
            registry,
            deps,
            config,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get a shutdown handle for graceful shutdown.
    ///
    /// Call `store(true, Ordering::SeqCst)` on the returned Arc to signal shutdown.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Claim one batch and run it to completion. Returns the number of jobs run.
    pub async fn process_batch(&self) -> Result<usize> {
        let jobs = self
            .job_queue
            .claim(&self.config.worker_id, self.config.batch_size)
            .await?;

        if jobs.is_empty() {
            return Ok(0);
        }
        debug!(count = jobs.len(), "claimed jobs");

        let count = jobs.len();
        join_all(jobs.iter().map(|job| self.run_job(job))).await;
        Ok(count)
    }

    async fn run_job(&self, job: &ClaimedJob) {
        let job_id = job.id;
        let job_type = job.job_type();
        debug!(job_id = %job_id, job_type = %job_type, attempt = job.attempt(), "executing job");

        let outcome = tokio::time::timeout(
            self.config.soft_time_limit,
            self.registry.execute(job, self.deps.clone()),
        )
        .await;

        let (error, kind) = match outcome {
            Ok(Ok(result)) => {
                info!(job_id = %job_id, job_type = %job_type, attempt = job.attempt(), "job succeeded");
                if let Err(e) = self.job_queue.mark_succeeded(job_id, result).await {
                    error!(job_id = %job_id, error = %e, "failed to mark job as succeeded");
                }
                return;
            }
            Ok(Err(e)) => {
                let kind = classify_error(&e);
                (e, kind)
            }
            // Dropping the timed-out future rolls back any open transaction
            Err(_) => (
                anyhow!("soft time limit of {:?} exceeded", self.config.soft_time_limit),
                ErrorKind::TimedOut,
            ),
        };

        warn!(
            job_id = %job_id,
            job_type = %job_type,
            attempt = job.attempt(),
            error = %format!("{:#}", error),
            "job attempt failed"
        );

        if let Err(mark_err) = self
            .job_queue
            .mark_failed(job_id, &format!("{:#}", error), kind)
            .await
        {
            error!(job_id = %job_id, error = %mark_err, "failed to mark job as failed");
        }
    }

    /// Run the job runner until shutdown is requested.
    pub async fn run(self) -> Result<()> {
        info!(
            worker_id = %self.config.worker_id,
            batch_size = self.config.batch_size,
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            job_types = ?self.registry.job_types(),
            "job runner starting"
        );

        while !self.is_shutdown_requested() {
            match self.process_batch().await {
                Ok(0) => tokio::time::sleep(self.config.poll_interval).await,
                Ok(_) => {}
                Err(e) => {
                    error!(error = %e, "failed to claim jobs");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }

        info!(worker_id = %self.config.worker_id, "job runner stopped");
        Ok(())
    }

    /// Run until a shutdown signal is received.
    ///
    /// Convenience method that listens for Ctrl+C.
    pub async fn run_until_shutdown(self) -> Result<()> {
        let shutdown = self.shutdown_handle();

        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("received shutdown signal");
            shutdown.store(true, Ordering::SeqCst);
        });

        self.run().await
    }
}

/// Classify an error to determine retry behavior.
///
/// Bad payloads, unknown pipelines and invalid graphs fail the same way on
/// every attempt. Everything else (model calls, parse failures that produced
/// nothing, database errors) is retryable.
pub fn classify_error(error: &anyhow::Error) -> ErrorKind {
    for cause in error.chain() {
        if cause.downcast_ref::<RegistryError>().is_some() {
            return ErrorKind::NonRetryable;
        }
        if let Some(workflow_error) = cause.downcast_ref::<WorkflowError>() {
            if !workflow_error.is_retryable() {
                return ErrorKind::NonRetryable;
            }
        }
    }
    ErrorKind::Retryable
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = JobRunnerConfig::default();
        assert_eq!(config.batch_size, 4);
        assert!(config.worker_id.starts_with("runner-"));
    }

    #[test]
    fn test_lease_outlives_soft_time_limit() {
        let config = JobRunnerConfig {
            soft_time_limit: Duration::from_secs(600),
            ..Default::default()
        };
        assert!(config.lease_duration() > config.soft_time_limit);
        assert_eq!(config.lease_duration(), Duration::from_secs(630));
    }

    #[test]
    fn test_config_with_worker_id() {
        let config = JobRunnerConfig::with_worker_id("my-runner");
        assert_eq!(config.worker_id, "my-runner");
    }

    #[test]
    fn test_classify_error_retryable() {
        let error = anyhow!("connection timeout");
        assert_eq!(classify_error(&error), ErrorKind::Retryable);
    }

    #[test]
    fn test_classify_error_unknown_job_type() {
        let error = anyhow::Error::from(RegistryError::UnknownJobType("nope".into()));
        assert_eq!(classify_error(&error), ErrorKind::NonRetryable);
    }

    #[test]
    fn test_classify_error_empty_generation_is_retryable() {
        let error = anyhow::Error::from(WorkflowError::EmptyGeneration {
            pipeline: "generate_side_jobs",
        });
        assert_eq!(classify_error(&error), ErrorKind::Retryable);
    }

    #[test]
    fn test_classify_error_invalid_graph() {
        let error = anyhow::Error::from(WorkflowError::InvalidGraph {
            graph: "generate_side_jobs".into(),
            reason: "node save is unreachable".into(),
        })
        .context("building pipeline");
        assert_eq!(classify_error(&error), ErrorKind::NonRetryable);
    }
}
