//! Batch state machine
//!
//! Owns the batch lifecycle: linear advance, arbitrary moves (branch-driven
//! or corrective), explicit mark-lost, and splits. Every transition gates on
//! the step being departed, commits the write before returning, and fires the
//! transition notification hook fire-and-forget.

use chrono::Utc;
use uuid::Uuid;

use atelier_core::calendar;
use atelier_core::domain::batch::{Batch, BatchStatus};
use atelier_core::domain::pipeline::PipelineDefinition;
use atelier_core::dto::batch::SplitBatch;

use super::{EngineContext, EngineError, load_batch, load_definition, load_project, permission};
use crate::store::{self, collections};
use atelier_core::domain::permission::Capability;
use atelier_core::domain::project::EnvironmentStatus;

pub async fn get_batch(ctx: &EngineContext, batch_id: Uuid) -> Result<Batch, EngineError> {
    load_batch(ctx.store.as_ref(), batch_id).await
}

/// Advance a batch to its natural next step in the order.
///
/// No-op on a terminal batch. When the linear successor is the Lost terminal,
/// the override table redirects to Completed: natural progression never marks
/// work lost; that takes an explicit branch choice or [`mark_lost`].
pub async fn advance(ctx: &EngineContext, batch_id: Uuid) -> Result<Batch, EngineError> {
    let batch = load_batch(ctx.store.as_ref(), batch_id).await?;
    let definition = load_definition(ctx.store.as_ref()).await?;

    if batch.status == BatchStatus::Terminal || definition.is_terminal(&batch.current_step_id) {
        return Ok(batch);
    }

    permission::require_transition(ctx, &batch.current_step_id).await?;

    let mut next = definition
        .natural_next(&batch.current_step_id)
        .ok_or_else(|| {
            EngineError::InvalidTransition(format!(
                "step {} has no natural successor",
                batch.current_step_id
            ))
        })?
        .to_string();
    if let Some(redirect) = ctx.tables.natural_next_override.get(&next) {
        next = redirect.clone();
    }

    commit_transition(ctx, batch, &definition, &next).await
}

/// Unconditional jump to any existing step, forward, backward, or sideways.
///
/// The gate is checked against the *source* step regardless of destination;
/// branch catalogs are advisory and do not restrict targets here.
pub async fn move_to_step(
    ctx: &EngineContext,
    batch_id: Uuid,
    target_step_id: &str,
) -> Result<Batch, EngineError> {
    let batch = load_batch(ctx.store.as_ref(), batch_id).await?;
    let definition = load_definition(ctx.store.as_ref()).await?;

    if !definition.steps.contains_key(target_step_id) {
        return Err(EngineError::InvalidTransition(format!(
            "unknown target step {target_step_id}"
        )));
    }

    permission::require_transition(ctx, &batch.current_step_id).await?;

    commit_transition(ctx, batch, &definition, target_step_id).await
}

/// Explicitly mark a batch lost. With a branch option targeting the Lost
/// terminal, this is one of only two paths to Lost.
pub async fn mark_lost(ctx: &EngineContext, batch_id: Uuid) -> Result<Batch, EngineError> {
    let batch = load_batch(ctx.store.as_ref(), batch_id).await?;
    let definition = load_definition(ctx.store.as_ref()).await?;

    if batch.status == BatchStatus::Terminal {
        return Ok(batch);
    }

    permission::require_capability(ctx, Capability::MarkLost).await?;
    permission::require_transition(ctx, &batch.current_step_id).await?;

    let lost = definition.lost_step_id.clone();
    commit_transition(ctx, batch, &definition, &lost).await
}

/// Carve `environment_ids` out of a batch into a new, independently
/// progressing batch.
///
/// Without a target the split is in place (parallel tracks at the same
/// step). The source shrinks by the subset and is dropped when emptied.
/// There is no merge: project views aggregate across all batches.
pub async fn split(
    ctx: &EngineContext,
    batch_id: Uuid,
    req: SplitBatch,
) -> Result<Batch, EngineError> {
    let mut source = load_batch(ctx.store.as_ref(), batch_id).await?;
    let definition = load_definition(ctx.store.as_ref()).await?;

    permission::require_capability(ctx, Capability::SplitBatch).await?;

    if req.environment_ids.is_empty() {
        return Err(EngineError::InvalidTransition(
            "split subset is empty".to_string(),
        ));
    }
    if !req
        .environment_ids
        .is_subset(&source.member_environment_ids)
    {
        return Err(EngineError::InvalidTransition(
            "split subset is not part of the batch".to_string(),
        ));
    }

    let target = req
        .target_step_id
        .unwrap_or_else(|| source.current_step_id.clone());
    if !definition.steps.contains_key(&target) {
        return Err(EngineError::InvalidTransition(format!(
            "unknown target step {target}"
        )));
    }

    let now = Utc::now();
    let new_batch = Batch {
        id: Uuid::new_v4(),
        project_id: source.project_id,
        name: req
            .name
            .unwrap_or_else(|| format!("{} (split)", source.name)),
        current_step_id: target.clone(),
        member_environment_ids: req.environment_ids.clone(),
        status: if definition.is_terminal(&target) {
            BatchStatus::Terminal
        } else {
            BatchStatus::Active
        },
        created_at: now,
        last_transition_at: now,
        sla_breach_notified: false,
        sla_preventive_notified: false,
        auxiliary_deadline: None,
        version: 0,
    };
    store::save(
        ctx.store.as_ref(),
        collections::BATCHES,
        &new_batch.id.to_string(),
        &new_batch,
    )
    .await?;

    source
        .member_environment_ids
        .retain(|id| !req.environment_ids.contains(id));
    let source_write = if source.member_environment_ids.is_empty() {
        // Dropped, not archived: an empty batch has nothing left to track.
        ctx.store
            .delete(collections::BATCHES, &source.id.to_string())
            .await
    } else {
        source.version += 1;
        store::save(
            ctx.store.as_ref(),
            collections::BATCHES,
            &source.id.to_string(),
            &source,
        )
        .await
    };
    if let Err(err) = source_write {
        // Undo the first write. Two Active batches must never share a member.
        if let Err(undo) = ctx
            .store
            .delete(collections::BATCHES, &new_batch.id.to_string())
            .await
        {
            tracing::error!(
                ?undo,
                batch = %new_batch.id,
                "failed to remove orphaned split batch"
            );
        }
        return Err(err.into());
    }

    tracing::info!(
        source = %source.id,
        new = %new_batch.id,
        members = new_batch.member_environment_ids.len(),
        target = %target,
        "batch split"
    );

    sync_environment_status(ctx, &new_batch, &definition).await;

    Ok(new_batch)
}

/// Refresh the member environments' status from the holding batch's position.
///
/// Derived display state, recomputed on every transition: Delivered at the
/// Completed terminal, InProduction at or past the configured production
/// stage, Pending before it. Lost batches keep whatever status they had.
/// Best-effort; the batch record stays the source of truth and a failed
/// refresh only leaves the view stale until the next transition.
async fn sync_environment_status(
    ctx: &EngineContext,
    batch: &Batch,
    definition: &PipelineDefinition,
) {
    let Some(step) = definition.steps.get(&batch.current_step_id) else {
        return;
    };
    let status = if batch.current_step_id == definition.completed_step_id {
        EnvironmentStatus::Delivered
    } else if definition.is_terminal(&batch.current_step_id) {
        return;
    } else if step.stage >= ctx.tables.production_stage {
        EnvironmentStatus::InProduction
    } else {
        EnvironmentStatus::Pending
    };

    let mut project = match load_project(ctx.store.as_ref(), batch.project_id).await {
        Ok(project) => project,
        // Batches can outlive their project document; nothing to refresh.
        Err(EngineError::NotFound(_)) => return,
        Err(e) => {
            tracing::warn!(?e, project = %batch.project_id, "environment status refresh failed");
            return;
        }
    };

    let mut changed = false;
    for environment in project.environments.iter_mut() {
        if batch.member_environment_ids.contains(&environment.id) && environment.status != status {
            environment.status = status;
            changed = true;
        }
    }
    if !changed {
        return;
    }
    if let Err(e) = store::save(
        ctx.store.as_ref(),
        collections::PROJECTS,
        &project.id.to_string(),
        &project,
    )
    .await
    {
        tracing::warn!(?e, project = %project.id, "environment status refresh failed");
    }
}

/// Shared post-transition effects: checkpoint deadline, timestamps, SLA flag
/// reset, terminal status, persisted write, then the notification hook.
async fn commit_transition(
    ctx: &EngineContext,
    mut batch: Batch,
    definition: &PipelineDefinition,
    target: &str,
) -> Result<Batch, EngineError> {
    let departed = batch.current_step_id.clone();
    let now = Utc::now();

    // Checkpoint side-effect: leaving a designated step computes an auxiliary
    // deadline in business days. Table-driven, not a general rule.
    if let Some(offset) = ctx.tables.checkpoint_offsets.get(&departed) {
        batch.auxiliary_deadline = Some(calendar::add_business_days(now, *offset));
    }

    batch.current_step_id = target.to_string();
    batch.last_transition_at = now;
    batch.sla_breach_notified = false;
    batch.sla_preventive_notified = false;
    batch.status = if definition.is_terminal(target) {
        BatchStatus::Terminal
    } else {
        BatchStatus::Active
    };
    batch.version += 1;

    store::save(
        ctx.store.as_ref(),
        collections::BATCHES,
        &batch.id.to_string(),
        &batch,
    )
    .await?;

    tracing::info!(
        batch = %batch.id,
        from = %departed,
        to = %target,
        by = %ctx.session.id,
        "batch transition committed"
    );

    sync_environment_status(ctx, &batch, definition).await;

    // Best-effort hook, decoupled from the committed write.
    if let Some(step) = definition.steps.get(target) {
        let notifier = ctx.notifier.clone();
        let destination = step.owner_role.clone();
        let message = format!(
            "Batch \"{}\" moved from {} to {} ({})",
            batch.name, departed, target, step.label
        );
        tokio::spawn(async move {
            match notifier.send(&destination, &message).await {
                Ok(true) => {}
                Ok(false) => tracing::warn!(%destination, "transition notification rejected"),
                Err(e) => tracing::warn!(?e, %destination, "transition notification failed"),
            }
        });
    }

    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;
    use std::collections::BTreeSet;

    #[tokio::test]
    async fn test_advance_moves_to_next_step() {
        let ctx = testutil::ctx("m1", "manager").await;
        let batch = testutil::batch_at("A", 2);
        testutil::put_batch(&ctx, &batch).await;

        let moved = advance(&ctx, batch.id).await.unwrap();
        assert_eq!(moved.current_step_id, "B");
        assert_eq!(moved.status, BatchStatus::Active);
        assert!(moved.last_transition_at >= batch.last_transition_at);
    }

    #[tokio::test]
    async fn test_advance_on_terminal_batch_is_noop() {
        let ctx = testutil::ctx("m1", "manager").await;
        let mut batch = testutil::batch_at("done", 1);
        batch.status = BatchStatus::Terminal;
        testutil::put_batch(&ctx, &batch).await;

        let same = advance(&ctx, batch.id).await.unwrap();
        assert_eq!(same.current_step_id, "done");
        assert_eq!(same.version, batch.version);
    }

    #[tokio::test]
    async fn test_advance_redirects_lost_to_completed() {
        let ctx = testutil::ctx("m1", "manager").await;
        // Topology where the linear successor of C is the Lost terminal.
        let mut definition = crate::service::load_definition(ctx.store.as_ref())
            .await
            .unwrap();
        definition.order = ["A", "B", "C", "lost", "done"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        testutil::seed_definition(&ctx, &definition).await;

        let batch = testutil::batch_at("C", 1);
        testutil::put_batch(&ctx, &batch).await;

        let moved = advance(&ctx, batch.id).await.unwrap();
        assert_eq!(moved.current_step_id, "done");
        assert_eq!(moved.status, BatchStatus::Terminal);
    }

    #[tokio::test]
    async fn test_advance_clears_sla_flags() {
        let ctx = testutil::ctx("m1", "manager").await;
        let mut batch = testutil::batch_at("A", 1);
        batch.sla_breach_notified = true;
        batch.sla_preventive_notified = true;
        testutil::put_batch(&ctx, &batch).await;

        let moved = advance(&ctx, batch.id).await.unwrap();
        assert!(!moved.sla_breach_notified);
        assert!(!moved.sla_preventive_notified);
        assert_eq!(moved.version, batch.version + 1);
    }

    #[tokio::test]
    async fn test_leaving_checkpoint_sets_auxiliary_deadline() {
        let ctx = testutil::ctx("m1", "manager").await;
        let batch = testutil::batch_at("B", 1);
        testutil::put_batch(&ctx, &batch).await;

        let moved = advance(&ctx, batch.id).await.unwrap();
        let deadline = moved.auxiliary_deadline.expect("deadline set");
        assert!(deadline > moved.last_transition_at);
    }

    #[tokio::test]
    async fn test_leaving_plain_step_leaves_deadline_alone() {
        let ctx = testutil::ctx("m1", "manager").await;
        let batch = testutil::batch_at("A", 1);
        testutil::put_batch(&ctx, &batch).await;

        let moved = advance(&ctx, batch.id).await.unwrap();
        assert!(moved.auxiliary_deadline.is_none());
    }

    #[tokio::test]
    async fn test_move_to_unknown_step_rejected() {
        let ctx = testutil::ctx("m1", "manager").await;
        let batch = testutil::batch_at("A", 1);
        testutil::put_batch(&ctx, &batch).await;

        let result = move_to_step(&ctx, batch.id, "9.9").await;
        assert!(matches!(result, Err(EngineError::InvalidTransition(_))));
    }

    #[tokio::test]
    async fn test_move_gate_checks_source_step() {
        // Seller may act on A only; the batch sits at B.
        let ctx = testutil::ctx("s1", "seller").await;
        let batch = testutil::batch_at("B", 1);
        testutil::put_batch(&ctx, &batch).await;

        let result = move_to_step(&ctx, batch.id, "A").await;
        assert!(matches!(result, Err(EngineError::PermissionDenied(_))));
    }

    #[tokio::test]
    async fn test_move_backward_is_allowed() {
        let ctx = testutil::ctx("m1", "manager").await;
        let batch = testutil::batch_at("C", 1);
        testutil::put_batch(&ctx, &batch).await;

        let moved = move_to_step(&ctx, batch.id, "A").await.unwrap();
        assert_eq!(moved.current_step_id, "A");
    }

    #[tokio::test]
    async fn test_branch_option_to_lost_terminates_batch() {
        let ctx = testutil::ctx("t1", "technical").await;
        let batch = testutil::batch_at("B", 1);
        testutil::put_batch(&ctx, &batch).await;

        // The B branch catalog offers a "Mark lost" option targeting `lost`.
        let option = ctx.tables.branch_table.options("B")[1].clone();
        let moved = move_to_step(&ctx, batch.id, &option.target_step_id)
            .await
            .unwrap();
        assert_eq!(moved.current_step_id, "lost");
        assert_eq!(moved.status, BatchStatus::Terminal);
    }

    #[tokio::test]
    async fn test_mark_lost_requires_capability() {
        let ctx = testutil::ctx("t1", "technical").await;
        let batch = testutil::batch_at("B", 1);
        testutil::put_batch(&ctx, &batch).await;

        let result = mark_lost(&ctx, batch.id).await;
        assert!(matches!(result, Err(EngineError::PermissionDenied(_))));
    }

    #[tokio::test]
    async fn test_mark_lost_moves_to_lost_terminal() {
        let ctx = testutil::ctx("s1", "seller").await;
        let batch = testutil::batch_at("A", 2);
        testutil::put_batch(&ctx, &batch).await;

        let moved = mark_lost(&ctx, batch.id).await.unwrap();
        assert_eq!(moved.current_step_id, "lost");
        assert_eq!(moved.status, BatchStatus::Terminal);
    }

    #[tokio::test]
    async fn test_split_into_target_step() {
        let ctx = testutil::ctx("m1", "manager").await;
        let batch = testutil::batch_at("A", 3);
        testutil::put_batch(&ctx, &batch).await;

        let members: Vec<_> = batch.member_environment_ids.iter().copied().collect();
        let subset: BTreeSet<_> = [members[0]].into();

        let new_batch = split(
            &ctx,
            batch.id,
            SplitBatch {
                environment_ids: subset.clone(),
                target_step_id: Some("C".to_string()),
                name: None,
            },
        )
        .await
        .unwrap();

        assert_eq!(new_batch.current_step_id, "C");
        assert_eq!(new_batch.member_environment_ids, subset);
        assert!(!new_batch.sla_breach_notified);

        let source = get_batch(&ctx, batch.id).await.unwrap();
        assert_eq!(source.current_step_id, "A");
        assert_eq!(source.member_environment_ids.len(), 2);
        assert!(source.member_environment_ids.is_disjoint(&subset));
    }

    #[tokio::test]
    async fn test_split_in_place_by_default() {
        let ctx = testutil::ctx("m1", "manager").await;
        let batch = testutil::batch_at("B", 2);
        testutil::put_batch(&ctx, &batch).await;

        let first = *batch.member_environment_ids.iter().next().unwrap();
        let new_batch = split(
            &ctx,
            batch.id,
            SplitBatch {
                environment_ids: [first].into(),
                target_step_id: None,
                name: Some("Parallel track".to_string()),
            },
        )
        .await
        .unwrap();

        assert_eq!(new_batch.current_step_id, "B");
        assert_eq!(new_batch.name, "Parallel track");
    }

    #[tokio::test]
    async fn test_split_empty_subset_rejected() {
        let ctx = testutil::ctx("m1", "manager").await;
        let batch = testutil::batch_at("A", 2);
        testutil::put_batch(&ctx, &batch).await;

        let result = split(
            &ctx,
            batch.id,
            SplitBatch {
                environment_ids: BTreeSet::new(),
                target_step_id: None,
                name: None,
            },
        )
        .await;
        assert!(matches!(result, Err(EngineError::InvalidTransition(_))));
    }

    #[tokio::test]
    async fn test_split_foreign_subset_rejected() {
        let ctx = testutil::ctx("m1", "manager").await;
        let batch = testutil::batch_at("A", 2);
        testutil::put_batch(&ctx, &batch).await;

        let result = split(
            &ctx,
            batch.id,
            SplitBatch {
                environment_ids: [uuid::Uuid::new_v4()].into(),
                target_step_id: None,
                name: None,
            },
        )
        .await;
        assert!(matches!(result, Err(EngineError::InvalidTransition(_))));
    }

    #[tokio::test]
    async fn test_split_full_set_drops_source() {
        let ctx = testutil::ctx("m1", "manager").await;
        let batch = testutil::batch_at("A", 2);
        testutil::put_batch(&ctx, &batch).await;

        split(
            &ctx,
            batch.id,
            SplitBatch {
                environment_ids: batch.member_environment_ids.clone(),
                target_step_id: Some("B".to_string()),
                name: None,
            },
        )
        .await
        .unwrap();

        let result = get_batch(&ctx, batch.id).await;
        assert!(matches!(result, Err(EngineError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_split_requires_capability() {
        let ctx = testutil::ctx("s1", "seller").await;
        let batch = testutil::batch_at("A", 2);
        testutil::put_batch(&ctx, &batch).await;

        let first = *batch.member_environment_ids.iter().next().unwrap();
        let result = split(
            &ctx,
            batch.id,
            SplitBatch {
                environment_ids: [first].into(),
                target_step_id: None,
                name: None,
            },
        )
        .await;
        assert!(matches!(result, Err(EngineError::PermissionDenied(_))));
    }

    /// Wraps `MemoryStore` to fail `put` for one configured document id.
    struct FlakyStore {
        inner: crate::store::MemoryStore,
        fail_put_for: std::sync::Mutex<Option<String>>,
    }

    #[async_trait::async_trait]
    impl crate::store::Store for FlakyStore {
        async fn get(
            &self,
            collection: &str,
            id: &str,
        ) -> Result<Option<serde_json::Value>, crate::store::StoreError> {
            self.inner.get(collection, id).await
        }

        async fn put(
            &self,
            collection: &str,
            id: &str,
            doc: serde_json::Value,
        ) -> Result<(), crate::store::StoreError> {
            if self.fail_put_for.lock().unwrap().as_deref() == Some(id) {
                return Err(crate::store::StoreError::Database(sqlx::Error::PoolClosed));
            }
            self.inner.put(collection, id, doc).await
        }

        async fn merge(
            &self,
            collection: &str,
            id: &str,
            fields: serde_json::Value,
        ) -> Result<(), crate::store::StoreError> {
            self.inner.merge(collection, id, fields).await
        }

        async fn put_versioned(
            &self,
            collection: &str,
            id: &str,
            doc: serde_json::Value,
            expected_version: u64,
        ) -> Result<bool, crate::store::StoreError> {
            self.inner
                .put_versioned(collection, id, doc, expected_version)
                .await
        }

        async fn delete(
            &self,
            collection: &str,
            id: &str,
        ) -> Result<(), crate::store::StoreError> {
            self.inner.delete(collection, id).await
        }

        async fn list(
            &self,
            collection: &str,
        ) -> Result<Vec<serde_json::Value>, crate::store::StoreError> {
            self.inner.list(collection).await
        }

        fn subscribe(&self) -> tokio::sync::broadcast::Receiver<crate::store::ChangeEvent> {
            self.inner.subscribe()
        }
    }

    #[tokio::test]
    async fn test_split_source_write_failure_removes_new_batch() {
        let flaky = std::sync::Arc::new(FlakyStore {
            inner: crate::store::MemoryStore::new(),
            fail_put_for: std::sync::Mutex::new(None),
        });
        let (ctx, _) = testutil::ctx_with_store("m1", "manager", flaky.clone()).await;
        let batch = testutil::batch_at("A", 3);
        testutil::put_batch(&ctx, &batch).await;

        // The shrink write on the source batch fails after the new batch
        // has already been persisted.
        *flaky.fail_put_for.lock().unwrap() = Some(batch.id.to_string());

        let first = *batch.member_environment_ids.iter().next().unwrap();
        let result = split(
            &ctx,
            batch.id,
            SplitBatch {
                environment_ids: [first].into(),
                target_step_id: Some("B".to_string()),
                name: None,
            },
        )
        .await;
        assert!(matches!(result, Err(EngineError::Persistence(_))));

        // No environment may end up owned by two Active batches: the orphaned
        // new batch is removed and the source keeps its full member set.
        let batches: Vec<Batch> = crate::store::load_all(ctx.store.as_ref(), collections::BATCHES)
            .await
            .unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].id, batch.id);
        assert_eq!(
            batches[0].member_environment_ids,
            batch.member_environment_ids
        );
    }

    #[tokio::test]
    async fn test_transitions_refresh_environment_status() {
        use atelier_core::dto::project::{CreateEnvironment, CreateProject};
        use crate::service::project as project_service;

        let ctx = testutil::ctx("m1", "manager").await;
        let (project, batch) = project_service::create_project(
            &ctx,
            CreateProject {
                client: "Moreira residence".to_string(),
                seller_id: Some("s1".to_string()),
                environments: vec![
                    CreateEnvironment {
                        name: "Kitchen".to_string(),
                        value: 100.0,
                    },
                    CreateEnvironment {
                        name: "Office".to_string(),
                        value: 50.0,
                    },
                ],
            },
        )
        .await
        .unwrap();
        assert!(
            project
                .environments
                .iter()
                .all(|e| e.status == EnvironmentStatus::Pending)
        );

        // C sits at the production-stage threshold.
        move_to_step(&ctx, batch.id, "C").await.unwrap();
        let project = project_service::get_project(&ctx, project.id).await.unwrap();
        assert!(
            project
                .environments
                .iter()
                .all(|e| e.status == EnvironmentStatus::InProduction)
        );

        // C's natural successor is the Completed terminal.
        advance(&ctx, batch.id).await.unwrap();
        let project = project_service::get_project(&ctx, project.id).await.unwrap();
        assert!(
            project
                .environments
                .iter()
                .all(|e| e.status == EnvironmentStatus::Delivered)
        );
    }

    #[tokio::test]
    async fn test_mark_lost_keeps_environment_status() {
        use atelier_core::dto::project::{CreateEnvironment, CreateProject};
        use crate::service::project as project_service;

        let ctx = testutil::ctx("m1", "manager").await;
        let (project, batch) = project_service::create_project(
            &ctx,
            CreateProject {
                client: "Costa loft".to_string(),
                seller_id: None,
                environments: vec![CreateEnvironment {
                    name: "Living room".to_string(),
                    value: 10.0,
                }],
            },
        )
        .await
        .unwrap();

        move_to_step(&ctx, batch.id, "C").await.unwrap();
        mark_lost(&ctx, batch.id).await.unwrap();

        let project = project_service::get_project(&ctx, project.id).await.unwrap();
        assert_eq!(
            project.environments[0].status,
            EnvironmentStatus::InProduction
        );
    }

    #[tokio::test]
    async fn test_back_to_back_splits_progress_independently() {
        let ctx = testutil::ctx("m1", "manager").await;
        let batch = testutil::batch_at("A", 3);
        testutil::put_batch(&ctx, &batch).await;
        let members: Vec<_> = batch.member_environment_ids.iter().copied().collect();

        let second = split(
            &ctx,
            batch.id,
            SplitBatch {
                environment_ids: [members[0]].into(),
                target_step_id: Some("B".to_string()),
                name: None,
            },
        )
        .await
        .unwrap();
        let third = split(
            &ctx,
            batch.id,
            SplitBatch {
                environment_ids: [members[1]].into(),
                target_step_id: Some("C".to_string()),
                name: None,
            },
        )
        .await
        .unwrap();

        // Three independent batches, unrelated schedules.
        advance(&ctx, second.id).await.unwrap();
        let first = get_batch(&ctx, batch.id).await.unwrap();
        let second = get_batch(&ctx, second.id).await.unwrap();
        let third = get_batch(&ctx, third.id).await.unwrap();
        assert_eq!(first.current_step_id, "A");
        assert_eq!(second.current_step_id, "C");
        assert_eq!(third.current_step_id, "C");

        // Member sets are pairwise disjoint and partition the original.
        let mut union = BTreeSet::new();
        for b in [&first, &second, &third] {
            assert!(union.is_disjoint(&b.member_environment_ids));
            union.extend(b.member_environment_ids.iter().copied());
        }
        assert_eq!(union, batch.member_environment_ids);
    }
}
