//! Project API Handlers
//!
//! HTTP endpoints for project creation and the aggregated read model.

use axum::{
    Json,
    extract::{Path, State},
    http::HeaderMap,
};
use uuid::Uuid;

use atelier_core::domain::project::Project;
use atelier_core::dto::project::{CreateProject, CreatedProject, ProjectSummary};

use crate::api::AppState;
use crate::api::error::ApiResult;
use crate::service::project as project_service;

/// POST /project/create
/// Create a project and its initial full-span batch
pub async fn create_project(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateProject>,
) -> ApiResult<Json<CreatedProject>> {
    tracing::info!("Creating project for client: {}", req.client);

    let ctx = state.context(&headers)?;
    let (project, initial_batch) = project_service::create_project(&ctx, req).await?;
    Ok(Json(CreatedProject {
        project,
        initial_batch,
    }))
}

/// GET /project/list
/// List all projects
pub async fn list_projects(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<Project>>> {
    let ctx = state.context(&headers)?;
    let projects = project_service::list_projects(&ctx).await?;
    Ok(Json(projects))
}

/// GET /project/{id}
/// Get project by ID
pub async fn get_project(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Project>> {
    let ctx = state.context(&headers)?;
    let project = project_service::get_project(&ctx, id).await?;
    Ok(Json(project))
}

/// GET /project/{id}/summary
/// Whole-project view aggregated across every batch
pub async fn get_summary(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ProjectSummary>> {
    let ctx = state.context(&headers)?;
    let summary = project_service::project_summary(&ctx, id).await?;
    Ok(Json(summary))
}
