use axum::{
    extract::{Extension, Path},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::kernel::jobs::{JobStatus, TaskOutcome};
use crate::server::app::AppState;
use crate::server::error::{ApiError, ApiResult};

#[derive(Debug, Serialize)]
pub struct TaskStatusResponse {
    pub task_id: Uuid,
    pub status: JobStatus,
    pub ready: bool,
    pub successful: bool,
}

/// `GET /tasks/:id`
pub async fn task_status(
    Extension(state): Extension<AppState>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<TaskStatusResponse>> {
    let outcome = find(&state, task_id).await?;
    Ok(Json(TaskStatusResponse {
        task_id: outcome.task_id,
        status: outcome.status,
        ready: outcome.ready,
        successful: outcome.successful,
    }))
}

/// `GET /tasks/:id/result`
pub async fn task_result(
    Extension(state): Extension<AppState>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<TaskOutcome>> {
    Ok(Json(find(&state, task_id).await?))
}

async fn find(state: &AppState, task_id: Uuid) -> ApiResult<TaskOutcome> {
    state
        .dispatcher
        .result(task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("task {}", task_id)))
}
