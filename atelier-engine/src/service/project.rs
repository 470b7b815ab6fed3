//! Project service
//!
//! Project creation spawns one batch spanning the full environment set at the
//! pipeline's first step. Because splits are never re-merged, the summary
//! here is the only whole-project view: it aggregates across every batch
//! belonging to the project.

use chrono::Utc;
use uuid::Uuid;

use atelier_core::domain::batch::{Batch, BatchStatus};
use atelier_core::domain::project::{Environment, EnvironmentStatus, Project};
use atelier_core::dto::batch::BatchSummary;
use atelier_core::dto::project::{CreateProject, ProjectSummary};

use super::{EngineContext, EngineError, load_definition, load_project};
use crate::store::{self, collections};

pub async fn create_project(
    ctx: &EngineContext,
    req: CreateProject,
) -> Result<(Project, Batch), EngineError> {
    if req.client.trim().is_empty() {
        return Err(EngineError::InvalidTransition(
            "client name cannot be empty".to_string(),
        ));
    }
    if req.environments.is_empty() {
        return Err(EngineError::InvalidTransition(
            "a project needs at least one environment".to_string(),
        ));
    }

    let definition = load_definition(ctx.store.as_ref()).await?;
    let first_step = definition
        .first_step_id()
        .ok_or_else(|| EngineError::ConfigConflict("pipeline order is empty".to_string()))?
        .to_string();

    let now = Utc::now();
    let project = Project {
        id: Uuid::new_v4(),
        client: req.client,
        seller_id: req.seller_id.or_else(|| Some(ctx.session.id.clone())),
        environments: req
            .environments
            .into_iter()
            .map(|e| Environment {
                id: Uuid::new_v4(),
                name: e.name,
                status: EnvironmentStatus::Pending,
                value: e.value,
            })
            .collect(),
        created_at: now,
    };

    // The initial batch spans the whole environment set.
    let batch = Batch {
        id: Uuid::new_v4(),
        project_id: project.id,
        name: format!("{} - all environments", project.client),
        current_step_id: first_step,
        member_environment_ids: project.environments.iter().map(|e| e.id).collect(),
        status: BatchStatus::Active,
        created_at: now,
        last_transition_at: now,
        sla_breach_notified: false,
        sla_preventive_notified: false,
        auxiliary_deadline: None,
        version: 0,
    };

    store::save(
        ctx.store.as_ref(),
        collections::PROJECTS,
        &project.id.to_string(),
        &project,
    )
    .await?;
    store::save(
        ctx.store.as_ref(),
        collections::BATCHES,
        &batch.id.to_string(),
        &batch,
    )
    .await?;

    tracing::info!(
        project = %project.id,
        batch = %batch.id,
        environments = project.environments.len(),
        "project created"
    );

    Ok((project, batch))
}

pub async fn get_project(ctx: &EngineContext, id: Uuid) -> Result<Project, EngineError> {
    load_project(ctx.store.as_ref(), id).await
}

pub async fn list_projects(ctx: &EngineContext) -> Result<Vec<Project>, EngineError> {
    Ok(store::load_all(ctx.store.as_ref(), collections::PROJECTS).await?)
}

/// All batches belonging to one project, split or not.
pub async fn project_batches(ctx: &EngineContext, id: Uuid) -> Result<Vec<Batch>, EngineError> {
    let batches: Vec<Batch> = store::load_all(ctx.store.as_ref(), collections::BATCHES).await?;
    Ok(batches.into_iter().filter(|b| b.project_id == id).collect())
}

pub async fn project_summary(ctx: &EngineContext, id: Uuid) -> Result<ProjectSummary, EngineError> {
    let project = load_project(ctx.store.as_ref(), id).await?;
    let mut batches = project_batches(ctx, id).await?;
    batches.sort_by_key(|b| b.created_at);

    Ok(ProjectSummary {
        id: project.id,
        client: project.client.clone(),
        total_value: project.total_value(),
        environment_count: project.environments.len(),
        batches: batches.iter().map(BatchSummary::from).collect(),
    })
}
