//! Pipeline Definition API Handlers
//!
//! HTTP endpoints for pipeline definition management.

use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
};

use atelier_core::domain::pipeline::PipelineStep;
use atelier_core::dto::pipeline::{CreateStep, Reorder, UpdateStep};

use crate::api::AppState;
use crate::api::error::ApiResult;
use crate::service::pipeline as pipeline_service;

/// GET /pipeline
/// The pipeline in order, filtered to the stages the acting role may see
pub async fn get_visible_steps(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<PipelineStep>>> {
    let ctx = state.context(&headers)?;
    let steps = pipeline_service::visible_steps(&ctx).await?;
    Ok(Json(steps))
}

/// POST /pipeline/step
/// Append a step to the pipeline
pub async fn add_step(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateStep>,
) -> ApiResult<Json<PipelineStep>> {
    tracing::info!("Adding pipeline step: {}", req.id);

    let ctx = state.context(&headers)?;
    let step = pipeline_service::add_step(&ctx, req).await?;
    Ok(Json(step))
}

/// PATCH /pipeline/step/{id}
/// Update fields of an existing step
pub async fn update_step(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<UpdateStep>,
) -> ApiResult<Json<PipelineStep>> {
    tracing::info!("Updating pipeline step: {}", id);

    let ctx = state.context(&headers)?;
    let step = pipeline_service::update_step(&ctx, &id, req).await?;
    Ok(Json(step))
}

/// DELETE /pipeline/step/{id}
/// Delete a step (rejected while active batches sit on it)
pub async fn delete_step(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    tracing::info!("Deleting pipeline step: {}", id);

    let ctx = state.context(&headers)?;
    pipeline_service::delete_step(&ctx, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /pipeline/reorder
/// Move a step to a new position in the order
pub async fn reorder(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<Reorder>,
) -> ApiResult<Json<Vec<String>>> {
    tracing::info!("Reordering pipeline: {} -> {}", req.from_index, req.to_index);

    let ctx = state.context(&headers)?;
    let order = pipeline_service::reorder(&ctx, req).await?;
    Ok(Json(order))
}
