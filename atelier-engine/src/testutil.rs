//! Shared test fixtures: a small seeded pipeline, permission table, and a
//! recording notifier.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use uuid::Uuid;

use atelier_core::domain::batch::{Batch, BatchStatus};
use atelier_core::domain::permission::{Capability, RolePermission};
use atelier_core::domain::pipeline::{PipelineDefinition, PipelineStep};
use atelier_core::session::UserSession;

use crate::config::{
    BranchSeed, CheckpointSeed, EngineConfig, EngineTables, PipelineSeed, RecipientOverride,
    SlaSettings,
};
use crate::notify::{Notifier, NotifyError};
use crate::service::EngineContext;
use crate::store::{self, MemoryStore, PERMISSIONS_DOC, PIPELINE_DOC, Store, collections};

use atelier_core::domain::branch::TransitionOption;

pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn destinations(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(d, _)| d.clone())
            .collect()
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, destination: &str, message: &str) -> Result<bool, NotifyError> {
        self.sent
            .lock()
            .unwrap()
            .push((destination.to_string(), message.to_string()));
        Ok(true)
    }
}

fn step(id: &str, owner_role: &str, sla_days: u32, stage: u32, locked: bool) -> PipelineStep {
    PipelineStep {
        id: id.to_string(),
        label: format!("Step {id}"),
        owner_role: owner_role.to_string(),
        sla_days,
        stage,
        locked,
    }
}

fn role(
    name: &str,
    stages: &[u32],
    steps: &[&str],
    capabilities: &[Capability],
    elevated: bool,
) -> RolePermission {
    RolePermission {
        role: name.to_string(),
        viewable_stages: stages.iter().copied().collect(),
        actionable_steps: steps.iter().map(|s| s.to_string()).collect(),
        capabilities: capabilities.iter().copied().collect(),
        elevated,
    }
}

/// A compact pipeline: A → B → C → done, with `lost` parked at the end.
pub fn test_config() -> EngineConfig {
    EngineConfig {
        pipeline: PipelineSeed {
            completed_step_id: "done".to_string(),
            lost_step_id: "lost".to_string(),
            production_stage: 2,
            steps: vec![
                step("A", "seller", 0, 1, false),
                step("B", "technical", 4, 1, false),
                step("C", "production", 2, 2, false),
                step("done", "manager", 0, 10, true),
                step("lost", "manager", 0, 10, true),
            ],
        },
        branches: vec![BranchSeed {
            step_id: "B".to_string(),
            options: vec![
                TransitionOption {
                    label: "Proceed".to_string(),
                    description: None,
                    target_step_id: "C".to_string(),
                },
                TransitionOption {
                    label: "Mark lost".to_string(),
                    description: Some("Client withdrew".to_string()),
                    target_step_id: "lost".to_string(),
                },
            ],
        }],
        checkpoints: vec![CheckpointSeed {
            step_id: "B".to_string(),
            business_days: 5,
        }],
        overrides: Vec::new(),
        sla: SlaSettings {
            send_delay_ms: 0,
            recipients: vec![RecipientOverride {
                step_id: "B".to_string(),
                roles: vec![crate::config::ASSIGNED_SELLER_ROLE.to_string()],
            }],
            ..SlaSettings::default()
        },
        permissions: vec![
            role("seller", &[1, 2], &["A"], &[Capability::MarkLost], false),
            role("technical", &[1, 2], &["B"], &[], false),
            role("production", &[2], &["C"], &[Capability::SplitBatch], false),
            role(
                "manager",
                &[1, 2, 10],
                &[],
                &[
                    Capability::SplitBatch,
                    Capability::MarkLost,
                    Capability::EditPipeline,
                    Capability::ManagePermissions,
                    Capability::ViewAllProjects,
                ],
                true,
            ),
        ],
    }
}

/// Context over a fresh seeded `MemoryStore`, with a recording notifier.
pub async fn ctx(user: &str, user_role: &str) -> EngineContext {
    ctx_recording(user, user_role).await.0
}

pub async fn ctx_recording(
    user: &str,
    user_role: &str,
) -> (EngineContext, Arc<RecordingNotifier>) {
    ctx_with_store(user, user_role, Arc::new(MemoryStore::new())).await
}

/// Like [`ctx_recording`] but over a caller-supplied store, for tests that
/// wrap `MemoryStore` with failure or contention behavior.
pub async fn ctx_with_store(
    user: &str,
    user_role: &str,
    store: Arc<dyn Store>,
) -> (EngineContext, Arc<RecordingNotifier>) {
    let config = test_config();
    store::save(
        store.as_ref(),
        collections::CONFIG,
        PIPELINE_DOC,
        &config.pipeline_definition(),
    )
    .await
    .unwrap();
    store::save(
        store.as_ref(),
        collections::CONFIG,
        PERMISSIONS_DOC,
        &config.permission_table(),
    )
    .await
    .unwrap();

    let notifier = Arc::new(RecordingNotifier::new());
    let ctx = EngineContext {
        session: UserSession::new(user, user_role),
        store,
        tables: Arc::new(EngineTables::from_config(&config)),
        notifier: notifier.clone(),
    };
    (ctx, notifier)
}

/// Replace the seeded pipeline definition.
pub async fn seed_definition(ctx: &EngineContext, definition: &PipelineDefinition) {
    store::save(
        ctx.store.as_ref(),
        collections::CONFIG,
        PIPELINE_DOC,
        definition,
    )
    .await
    .unwrap();
}

/// A batch positioned at `step_id` with `members` fresh environment ids.
pub fn batch_at(step_id: &str, members: usize) -> Batch {
    let now = chrono::Utc::now();
    Batch {
        id: Uuid::new_v4(),
        project_id: Uuid::new_v4(),
        name: "Test batch".to_string(),
        current_step_id: step_id.to_string(),
        member_environment_ids: (0..members).map(|_| Uuid::new_v4()).collect::<BTreeSet<_>>(),
        status: BatchStatus::Active,
        created_at: now,
        last_transition_at: now,
        sla_breach_notified: false,
        sla_preventive_notified: false,
        auxiliary_deadline: None,
        version: 0,
    }
}

pub async fn put_batch(ctx: &EngineContext, batch: &Batch) {
    store::save(
        ctx.store.as_ref(),
        collections::BATCHES,
        &batch.id.to_string(),
        batch,
    )
    .await
    .unwrap();
}
