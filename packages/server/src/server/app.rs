//! Application setup and server configuration.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::Extension,
    http::{header::CONTENT_TYPE, HeaderName, Method},
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::domains::register_pipelines;
use crate::kernel::jobs::{JobQueue, JobRegistry, JobRunner, PostgresJobQueue, SharedJobRegistry, TaskDispatcher};
use crate::kernel::ServerDeps;
use crate::server::routes::{
    chat, generate_mission, generate_mission_step, generate_side_job, health_handler,
    regenerate_mission_step, regenerate_side_job, task_result, task_status, IDEMPOTENCY_HEADER,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub dispatcher: TaskDispatcher,
    /// Longest a `?wait=true` request blocks before answering with the pending task
    pub wait_timeout: Duration,
    pub wait_poll_interval: Duration,
}

impl AppState {
    pub fn new(db_pool: PgPool, dispatcher: TaskDispatcher) -> Self {
        Self {
            db_pool,
            dispatcher,
            wait_timeout: Duration::from_secs(60),
            wait_poll_interval: Duration::from_millis(250),
        }
    }

    pub fn with_wait(mut self, timeout: Duration, poll_interval: Duration) -> Self {
        self.wait_timeout = timeout;
        self.wait_poll_interval = poll_interval;
        self
    }
}

/// Registry with every pipeline registered.
pub fn build_registry() -> SharedJobRegistry {
    let mut registry = JobRegistry::new();
    register_pipelines(&mut registry);
    Arc::new(registry)
}

/// Build the Axum application router
pub fn build_router(state: AppState) -> Router {
    // Synchronous waits get a little headroom over the poll deadline
    let request_timeout = state.wait_timeout + Duration::from_secs(5);

    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE, HeaderName::from_static(IDEMPOTENCY_HEADER)]);

    Router::new()
        .route("/ai/generate-side-job", post(generate_side_job))
        .route("/ai/regenerate-side-job", post(regenerate_side_job))
        .route("/ai/generate-mission", post(generate_mission))
        .route("/ai/generate-mission-step", post(generate_mission_step))
        .route("/ai/regenerate-mission-step", post(regenerate_mission_step))
        .route("/ai/chat", post(chat))
        .route("/tasks/:task_id", get(task_status))
        .route("/tasks/:task_id/result", get(task_result))
        .route("/health", get(health_handler))
        // Middleware layers (applied in reverse order - last added runs first)
        .layer(Extension(state))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Wire production dependencies, optionally start the in-process worker, and
/// return the router.
pub fn build_app(pool: PgPool, config: &Config) -> Router {
    let registry = build_registry();
    let runner_config = config.job_runner_config();
    let job_queue: Arc<dyn JobQueue> =
        Arc::new(PostgresJobQueue::with_lease(pool.clone(), runner_config.lease_duration()));

    let dispatcher = TaskDispatcher::new(job_queue.clone(), registry.clone())
        .with_retry_policy(config.task_max_retries, config.backoff);

    if config.run_worker {
        let deps = Arc::new(ServerDeps::from_config(config, pool.clone()));
        let runner = JobRunner::with_config(job_queue, registry, deps, runner_config);
        tokio::spawn(async move {
            if let Err(e) = runner.run().await {
                tracing::error!(error = %e, "Job runner exited with error");
            }
        });
    } else {
        tracing::info!("RUN_WORKER disabled; tasks wait for an external worker");
    }

    let state = AppState::new(pool, dispatcher)
        .with_wait(config.sync_wait_timeout, Duration::from_millis(250));
    build_router(state)
}
