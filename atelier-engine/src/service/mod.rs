//! Engine services
//!
//! Business logic for the workflow engine. Every operation takes an explicit
//! [`EngineContext`] (acting session, store handle, lookup tables) instead
//! of ambient globals. The pipeline definition and the permission table are
//! re-read from the store on each operation; nothing here caches them.

pub mod batch;
pub mod branch;
pub mod permission;
pub mod pipeline;
pub mod project;

use std::sync::Arc;

use uuid::Uuid;

use atelier_core::domain::batch::Batch;
use atelier_core::domain::permission::PermissionTable;
use atelier_core::domain::pipeline::{DefinitionError, PipelineDefinition};
use atelier_core::domain::project::Project;
use atelier_core::session::UserSession;

use crate::config::EngineTables;
use crate::notify::Notifier;
use crate::store::{self, PERMISSIONS_DOC, PIPELINE_DOC, Store, StoreError, collections};

/// Engine error type
#[derive(Debug)]
pub enum EngineError {
    /// Actionable-step or capability check failed; surfaced, never retried.
    PermissionDenied(String),
    /// Unknown target step, bad split subset, etc. Rejected before mutation.
    InvalidTransition(String),
    /// Duplicate step id, locked-step mutation, or a delete that would leave
    /// live batches dangling.
    ConfigConflict(String),
    NotFound(String),
    /// Propagated as-is; retry policy belongs to the caller.
    Persistence(StoreError),
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        EngineError::Persistence(err)
    }
}

impl From<DefinitionError> for EngineError {
    fn from(err: DefinitionError) -> Self {
        match err {
            DefinitionError::DuplicateStep(id) => {
                EngineError::ConfigConflict(format!("step {id} already exists"))
            }
            DefinitionError::LockedStep(id) => {
                EngineError::ConfigConflict(format!("step {id} is locked"))
            }
            DefinitionError::UnknownStep(id) => {
                EngineError::NotFound(format!("step {id} not found"))
            }
            DefinitionError::OutOfRange { index, len } => EngineError::InvalidTransition(format!(
                "order index {index} out of range (len {len})"
            )),
        }
    }
}

/// Everything an engine operation needs, injected per call site.
#[derive(Clone)]
pub struct EngineContext {
    pub session: UserSession,
    pub store: Arc<dyn Store>,
    pub tables: Arc<EngineTables>,
    pub notifier: Arc<dyn Notifier>,
}

pub(crate) async fn load_definition(store: &dyn Store) -> Result<PipelineDefinition, EngineError> {
    store::load(store, collections::CONFIG, PIPELINE_DOC)
        .await?
        .ok_or_else(|| EngineError::ConfigConflict("pipeline definition not seeded".to_string()))
}

pub(crate) async fn save_definition(
    store: &dyn Store,
    definition: &PipelineDefinition,
) -> Result<(), EngineError> {
    store::save(store, collections::CONFIG, PIPELINE_DOC, definition).await?;
    Ok(())
}

pub(crate) async fn load_permission_table(
    store: &dyn Store,
) -> Result<PermissionTable, EngineError> {
    Ok(store::load(store, collections::CONFIG, PERMISSIONS_DOC)
        .await?
        .unwrap_or_default())
}

pub(crate) async fn load_batch(store: &dyn Store, id: Uuid) -> Result<Batch, EngineError> {
    store::load(store, collections::BATCHES, &id.to_string())
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("batch {id} not found")))
}

pub(crate) async fn load_project(store: &dyn Store, id: Uuid) -> Result<Project, EngineError> {
    store::load(store, collections::PROJECTS, &id.to_string())
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("project {id} not found")))
}
