//! Permission API Handlers
//!
//! Role permission management. Edits land in the persisted table and take
//! effect on the next check; nothing is cached per session.

use axum::{Json, extract::State, http::HeaderMap};

use atelier_core::domain::permission::RolePermission;

use crate::api::AppState;
use crate::api::error::ApiResult;
use crate::service::permission as permission_service;

/// PUT /permission/role
/// Create or replace one role's permission row
pub async fn set_role(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<RolePermission>,
) -> ApiResult<Json<RolePermission>> {
    tracing::info!("Setting permissions for role: {}", req.role);

    let ctx = state.context(&headers)?;
    permission_service::set_role_permission(&ctx, req.clone()).await?;
    Ok(Json(req))
}
