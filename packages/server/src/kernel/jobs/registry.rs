//! Job registry for deserializing and executing jobs.
//!
//! The registry maps job type strings (e.g., "generate_side_jobs") to:
//! - Deserializers that reconstruct the typed request from JSON
//! - Handlers that run the pipeline and return its serialized result
//!
//! This allows the JobRunner to claim jobs from the queue and dispatch them
//! to the appropriate domain pipeline without knowing the concrete types.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use super::queue::ClaimedJob;
use crate::kernel::ServerDeps;

/// Type alias for the async handler function.
///
/// Handlers receive the raw JSON payload and ServerDeps and return the
/// pipeline result as JSON.
type BoxedHandler = Box<
    dyn Fn(serde_json::Value, Arc<ServerDeps>) -> Pin<Box<dyn Future<Output = Result<serde_json::Value>> + Send>>
        + Send
        + Sync,
>;

/// Failures that retrying cannot fix.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("no handler registered for job type {0}")]
    UnknownJobType(String),

    #[error("invalid payload for {job_type}: {source}")]
    InvalidPayload {
        job_type: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Registry that maps job type strings to handlers.
///
/// Each domain registers its pipelines at startup.
///
/// # Example
///
/// ```ignore
/// let mut registry = JobRegistry::new();
///
/// registry.register::<GenerateSideJobRequest, _, _, _>(
///     "generate_side_jobs",
///     |request, deps| async move { side_jobs::run_generate(request, &deps).await },
/// );
///
/// // Later, in JobRunner
/// let result = registry.execute(&claimed_job, deps.clone()).await?;
/// ```
#[derive(Default)]
pub struct JobRegistry {
    registrations: HashMap<&'static str, BoxedHandler>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self {
            registrations: HashMap::new(),
        }
    }

    /// Register a job type with its handler.
    ///
    /// The payload is deserialized into `J` before the handler runs; a payload
    /// that does not fit fails with [`RegistryError::InvalidPayload`].
    pub fn register<J, R, F, Fut>(&mut self, job_type: &'static str, handler: F)
    where
        J: DeserializeOwned + Send + 'static,
        R: Serialize + Send + 'static,
        F: Fn(J, Arc<ServerDeps>) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = Result<R>> + Send + 'static,
    {
        let boxed_handler: BoxedHandler = Box::new(move |value, deps| {
            let handler = handler.clone();
            Box::pin(async move {
                let job: J = serde_json::from_value(value)
                    .map_err(|source| RegistryError::InvalidPayload { job_type, source })?;
                let output = handler(job, deps).await?;
                serde_json::to_value(output).map_err(anyhow::Error::from)
            })
        });

        self.registrations.insert(job_type, boxed_handler);
    }

    pub fn is_registered(&self, job_type: &str) -> bool {
        self.registrations.contains_key(job_type)
    }

    pub fn job_types(&self) -> Vec<&'static str> {
        let mut types: Vec<&'static str> = self.registrations.keys().copied().collect();
        types.sort_unstable();
        types
    }

    /// Execute a claimed job using its registered handler.
    pub async fn execute(&self, job: &ClaimedJob, deps: Arc<ServerDeps>) -> Result<serde_json::Value> {
        self.execute_raw(job.job_type(), job.job.args.clone(), deps).await
    }

    /// Run a handler directly, bypassing the queue.
    pub async fn execute_raw(
        &self,
        job_type: &str,
        args: serde_json::Value,
        deps: Arc<ServerDeps>,
    ) -> Result<serde_json::Value> {
        let handler = self
            .registrations
            .get(job_type)
            .ok_or_else(|| RegistryError::UnknownJobType(job_type.to_string()))?;
        handler(args, deps).await
    }
}

/// Shared registry handle for use across async tasks.
pub type SharedJobRegistry = Arc<JobRegistry>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::test_dependencies::TestDependencies;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Deserialize)]
    struct Echo {
        value: i64,
    }

    fn registry() -> JobRegistry {
        let mut registry = JobRegistry::new();
        registry.register::<Echo, _, _, _>("echo", |job, _deps| async move {
            Ok::<_, anyhow::Error>(json!({ "doubled": job.value * 2 }))
        });
        registry
    }

    #[tokio::test]
    async fn test_execute_registered_handler() {
        let deps = TestDependencies::new().into_deps();
        let result = registry()
            .execute_raw("echo", json!({"value": 21}), deps)
            .await
            .unwrap();
        assert_eq!(result, json!({"doubled": 42}));
    }

    #[tokio::test]
    async fn test_unknown_job_type() {
        let deps = TestDependencies::new().into_deps();
        let err = registry()
            .execute_raw("missing", json!({}), deps)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RegistryError>(),
            Some(RegistryError::UnknownJobType(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_payload() {
        let deps = TestDependencies::new().into_deps();
        let err = registry()
            .execute_raw("echo", json!({"value": "not a number"}), deps)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RegistryError>(),
            Some(RegistryError::InvalidPayload { job_type: "echo", .. })
        ));
    }

    #[test]
    fn test_job_types_sorted() {
        let mut registry = registry();
        registry.register::<Echo, _, _, _>("another", |job, _deps| async move {
            Ok::<_, anyhow::Error>(job.value)
        });
        assert_eq!(registry.job_types(), vec!["another", "echo"]);
        assert!(registry.is_registered("echo"));
    }
}
