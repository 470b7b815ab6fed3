//! API Module
//!
//! HTTP API layer for the engine.
//! Each submodule handles endpoints for a specific domain. The acting user
//! arrives in `x-user-id`/`x-user-role` headers; identity itself is vouched
//! for by the proxy in front of the engine.

pub mod batch;
pub mod error;
pub mod health;
pub mod permission;
pub mod pipeline;
pub mod project;

use std::sync::Arc;

use axum::{
    Router,
    http::HeaderMap,
    routing::{delete, get, patch, post, put},
};
use tower_http::trace::TraceLayer;

use atelier_core::session::UserSession;

use crate::api::error::ApiError;
use crate::config::EngineTables;
use crate::notify::Notifier;
use crate::service::EngineContext;
use crate::store::Store;

/// Shared handles behind every request.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub tables: Arc<EngineTables>,
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    /// Build the per-request engine context from the identity headers.
    pub fn context(&self, headers: &HeaderMap) -> Result<EngineContext, ApiError> {
        let user = header_value(headers, "x-user-id")?;
        let role = header_value(headers, "x-user-role")?;
        Ok(EngineContext {
            session: UserSession::new(&user, &role),
            store: self.store.clone(),
            tables: self.tables.clone(),
            notifier: self.notifier.clone(),
        })
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Result<String, ApiError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ApiError::Unauthorized(format!("missing {name} header")))
}

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Pipeline definition endpoints
        .route("/pipeline", get(pipeline::get_visible_steps))
        .route("/pipeline/step", post(pipeline::add_step))
        .route("/pipeline/step/{id}", patch(pipeline::update_step))
        .route("/pipeline/step/{id}", delete(pipeline::delete_step))
        .route("/pipeline/reorder", post(pipeline::reorder))
        // Project endpoints
        .route("/project/create", post(project::create_project))
        .route("/project/list", get(project::list_projects))
        .route("/project/{id}", get(project::get_project))
        .route("/project/{id}/summary", get(project::get_summary))
        // Batch endpoints
        .route("/batch/{id}", get(batch::get_batch))
        .route("/batch/{id}/advance", post(batch::advance))
        .route("/batch/{id}/move", post(batch::move_to_step))
        .route("/batch/{id}/mark-lost", post(batch::mark_lost))
        .route("/batch/{id}/split", post(batch::split))
        .route("/batch/{id}/branches", get(batch::branch_options))
        // Permission endpoints
        .route("/permission/role", put(permission::set_role))
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
