//! `POST /ai/*` endpoints: validate the request body, submit the matching
//! pipeline, and answer with the task id.
//!
//! Body rejections go through [`ApiError`] so they share the JSON error shape.
//!
//! `?wait=true` polls the task until it finishes or the configured wait
//! timeout elapses. An `Idempotency-Key` header deduplicates submissions.

use axum::{
    extract::{rejection::JsonRejection, Extension, Query},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::domains::chat::ChatRequest;
use crate::domains::mission_steps::{GenerateMissionStepRequest, RegenerateMissionStepsRequest};
use crate::domains::missions::GenerateMissionRequest;
use crate::domains::side_jobs::{GenerateSideJobRequest, RegenerateSideJobRequest};
use crate::domains::Pipeline;
use crate::server::app::AppState;
use crate::server::error::{ApiError, ApiResult};

pub const IDEMPOTENCY_HEADER: &str = "idempotency-key";

#[derive(Debug, Default, Deserialize)]
pub struct SubmitQuery {
    #[serde(default)]
    pub wait: bool,
}

async fn submit<T: Serialize>(
    state: &AppState,
    pipeline: Pipeline,
    request: &T,
    query: &SubmitQuery,
    headers: &HeaderMap,
) -> ApiResult<Response> {
    let payload = serde_json::to_value(request).map_err(anyhow::Error::from)?;
    let key = headers
        .get(IDEMPOTENCY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty());

    let submitted = match key {
        Some(key) => {
            state
                .dispatcher
                .submit_with_key(pipeline.as_str(), payload, key)
                .await
        }
        None => state.dispatcher.submit(pipeline.as_str(), payload).await,
    };
    let task_id = submitted.map_err(ApiError::from_submit)?;

    if !query.wait {
        return Ok((StatusCode::ACCEPTED, Json(json!({ "task_id": task_id }))).into_response());
    }

    let outcome = state
        .dispatcher
        .wait(task_id, state.wait_timeout, state.wait_poll_interval)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("task {}", task_id)))?;

    let status = if outcome.ready {
        StatusCode::OK
    } else {
        StatusCode::ACCEPTED
    };
    Ok((status, Json(outcome)).into_response())
}

pub async fn generate_side_job(
    Extension(state): Extension<AppState>,
    Query(query): Query<SubmitQuery>,
    headers: HeaderMap,
    body: Result<Json<GenerateSideJobRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(request) = body?;
    submit(&state, Pipeline::GenerateSideJobs, &request, &query, &headers).await
}

pub async fn regenerate_side_job(
    Extension(state): Extension<AppState>,
    Query(query): Query<SubmitQuery>,
    headers: HeaderMap,
    body: Result<Json<RegenerateSideJobRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(request) = body?;
    submit(&state, Pipeline::RegenerateSideJobs, &request, &query, &headers).await
}

pub async fn generate_mission(
    Extension(state): Extension<AppState>,
    Query(query): Query<SubmitQuery>,
    headers: HeaderMap,
    body: Result<Json<GenerateMissionRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(request) = body?;
    submit(&state, Pipeline::GenerateMissions, &request, &query, &headers).await
}

pub async fn generate_mission_step(
    Extension(state): Extension<AppState>,
    Query(query): Query<SubmitQuery>,
    headers: HeaderMap,
    body: Result<Json<GenerateMissionStepRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(request) = body?;
    submit(&state, Pipeline::GenerateMissionSteps, &request, &query, &headers).await
}

pub async fn regenerate_mission_step(
    Extension(state): Extension<AppState>,
    Query(query): Query<SubmitQuery>,
    headers: HeaderMap,
    body: Result<Json<RegenerateMissionStepsRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(request) = body?;
    submit(&state, Pipeline::RegenerateMissionSteps, &request, &query, &headers).await
}

pub async fn chat(
    Extension(state): Extension<AppState>,
    Query(query): Query<SubmitQuery>,
    headers: HeaderMap,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(request) = body?;
    submit(&state, Pipeline::Chat, &request, &query, &headers).await
}
