//! Job infrastructure for background pipeline execution.
//!
//! This module provides the kernel-level infrastructure for running pipelines
//! as retryable background tasks:
//! - [`TaskDispatcher`] - Submit pipelines by name, poll status and results
//! - [`PostgresJobQueue`] / [`InMemoryJobQueue`] - Durable and in-process queues
//! - [`JobRunner`] - Long-running service that claims and executes jobs
//! - [`JobRegistry`] - Maps pipeline names to typed handlers
//!
//! # Architecture
//!
//! ```text
//! HTTP handler calls dispatcher.submit("generate_side_jobs", payload)
//!     │
//!     └─► JobQueue.enqueue()  ──►  status = pending
//!
//! JobRunner
//!     │
//!     ├─► Claim jobs (status = running, attempt += 1)
//!     ├─► JobRegistry.execute() deserializes payload, runs pipeline
//!     └─► Mark succeeded, or failed -> retrying with backoff / failed
//! ```
//!
//! Pipelines themselves live in their domains; this module only moves them
//! through the queue.

mod dispatcher;
mod job;
mod memory;
mod queue;
mod registry;
mod runner;

pub use dispatcher::{TaskDispatcher, TaskOutcome};
pub use job::{BackoffPolicy, ErrorKind, FailureOutcome, Job, JobStatus};
pub use memory::InMemoryJobQueue;
pub use queue::{ClaimedJob, EnqueueResult, JobQueue, NewJob, PostgresJobQueue, DEFAULT_LEASE};
pub use registry::{JobRegistry, RegistryError, SharedJobRegistry};
pub use runner::{classify_error, JobRunner, JobRunnerConfig, LEASE_GRACE};
