//! Pipeline definition service
//!
//! CRUD + reorder over the persisted pipeline definition document. Mutations
//! load the document, apply the pure core operation, and write it back;
//! rejected operations never touch the store.

use atelier_core::domain::batch::Batch;
use atelier_core::domain::permission::Capability;
use atelier_core::domain::pipeline::{PipelineDefinition, PipelineStep};
use atelier_core::dto::pipeline::{CreateStep, Reorder, UpdateStep};

use super::{EngineContext, EngineError, load_definition, permission, save_definition};
use crate::store::{self, collections};

pub async fn get_definition(ctx: &EngineContext) -> Result<PipelineDefinition, EngineError> {
    load_definition(ctx.store.as_ref()).await
}

/// Steps the acting role may see, in order, filtered by stage visibility.
pub async fn visible_steps(ctx: &EngineContext) -> Result<Vec<PipelineStep>, EngineError> {
    let definition = load_definition(ctx.store.as_ref()).await?;
    let mut steps = Vec::new();
    for id in &definition.order {
        if let Some(step) = definition.steps.get(id) {
            if permission::can_view_stage(ctx.store.as_ref(), &ctx.session.role, step.stage)
                .await?
            {
                steps.push(step.clone());
            }
        }
    }
    Ok(steps)
}

pub async fn add_step(ctx: &EngineContext, req: CreateStep) -> Result<PipelineStep, EngineError> {
    permission::require_capability(ctx, Capability::EditPipeline).await?;
    validate_step_id(&req.id)?;

    let mut definition = load_definition(ctx.store.as_ref()).await?;
    let step: PipelineStep = req.into();
    definition.add_step(step.clone())?;
    save_definition(ctx.store.as_ref(), &definition).await?;

    tracing::info!(step = %step.id, "pipeline step added");
    Ok(step)
}

pub async fn update_step(
    ctx: &EngineContext,
    id: &str,
    req: UpdateStep,
) -> Result<PipelineStep, EngineError> {
    permission::require_capability(ctx, Capability::EditPipeline).await?;

    let mut definition = load_definition(ctx.store.as_ref()).await?;
    definition.update_step(id, req.into())?;
    save_definition(ctx.store.as_ref(), &definition).await?;

    tracing::info!(step = %id, "pipeline step updated");
    definition
        .steps
        .get(id)
        .cloned()
        .ok_or_else(|| EngineError::NotFound(format!("step {id} not found")))
}

/// Delete a step. Locked terminals reject; so does any step still referenced
/// by an Active batch, since live work is never silently migrated.
pub async fn delete_step(ctx: &EngineContext, id: &str) -> Result<(), EngineError> {
    permission::require_capability(ctx, Capability::EditPipeline).await?;

    let referencing = batches_at_step(ctx, id).await?;
    if referencing > 0 {
        return Err(EngineError::ConfigConflict(format!(
            "step {id} is still referenced by {referencing} active batch(es)"
        )));
    }

    let mut definition = load_definition(ctx.store.as_ref()).await?;
    definition.delete_step(id)?;
    save_definition(ctx.store.as_ref(), &definition).await?;

    tracing::info!(step = %id, "pipeline step deleted");
    Ok(())
}

pub async fn reorder(ctx: &EngineContext, req: Reorder) -> Result<Vec<String>, EngineError> {
    permission::require_capability(ctx, Capability::EditPipeline).await?;

    let mut definition = load_definition(ctx.store.as_ref()).await?;
    definition.reorder(req.from_index, req.to_index)?;
    save_definition(ctx.store.as_ref(), &definition).await?;

    tracing::info!(from = req.from_index, to = req.to_index, "pipeline reordered");
    Ok(definition.order)
}

async fn batches_at_step(ctx: &EngineContext, step_id: &str) -> Result<usize, EngineError> {
    let batches: Vec<Batch> = store::load_all(ctx.store.as_ref(), collections::BATCHES).await?;
    Ok(batches
        .iter()
        .filter(|b| b.is_active() && b.current_step_id == step_id)
        .count())
}

fn validate_step_id(id: &str) -> Result<(), EngineError> {
    if id.trim().is_empty() {
        return Err(EngineError::InvalidTransition(
            "step id cannot be empty".to_string(),
        ));
    }
    Ok(())
}
