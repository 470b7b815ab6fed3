//! Batch API Handlers
//!
//! HTTP endpoints for batch state transitions.

use axum::{
    Json,
    extract::{Path, State},
    http::HeaderMap,
};
use uuid::Uuid;

use atelier_core::domain::batch::Batch;
use atelier_core::domain::branch::TransitionOption;
use atelier_core::dto::batch::{MoveBatch, SplitBatch};

use crate::api::AppState;
use crate::api::error::ApiResult;
use crate::service::{batch as batch_service, branch as branch_service};

/// GET /batch/{id}
/// Get batch by ID
pub async fn get_batch(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Batch>> {
    let ctx = state.context(&headers)?;
    let batch = batch_service::get_batch(&ctx, id).await?;
    Ok(Json(batch))
}

/// POST /batch/{id}/advance
/// Advance a batch to its natural next step
pub async fn advance(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Batch>> {
    tracing::info!("Advancing batch: {}", id);

    let ctx = state.context(&headers)?;
    let batch = batch_service::advance(&ctx, id).await?;
    Ok(Json(batch))
}

/// POST /batch/{id}/move
/// Move a batch to an explicit target step
pub async fn move_to_step(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<MoveBatch>,
) -> ApiResult<Json<Batch>> {
    tracing::info!("Moving batch {} to step {}", id, req.target_step_id);

    let ctx = state.context(&headers)?;
    let batch = batch_service::move_to_step(&ctx, id, &req.target_step_id).await?;
    Ok(Json(batch))
}

/// POST /batch/{id}/mark-lost
/// Send a batch to the lost terminal step
pub async fn mark_lost(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Batch>> {
    tracing::info!("Marking batch lost: {}", id);

    let ctx = state.context(&headers)?;
    let batch = batch_service::mark_lost(&ctx, id).await?;
    Ok(Json(batch))
}

/// POST /batch/{id}/split
/// Peel a subset of environments into a new batch
pub async fn split(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<SplitBatch>,
) -> ApiResult<Json<Batch>> {
    tracing::info!("Splitting batch: {}", id);

    let ctx = state.context(&headers)?;
    let new_batch = batch_service::split(&ctx, id, req).await?;
    Ok(Json(new_batch))
}

/// GET /batch/{id}/branches
/// Cataloged transition options from the batch's current step
pub async fn branch_options(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<TransitionOption>>> {
    let ctx = state.context(&headers)?;
    let batch = batch_service::get_batch(&ctx, id).await?;
    let options = branch_service::branch_options(&ctx, &batch.current_step_id).to_vec();
    Ok(Json(options))
}
