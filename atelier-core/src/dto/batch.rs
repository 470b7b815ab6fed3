//! Batch DTOs

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::batch::{Batch, BatchStatus};

/// Request to jump a batch to an arbitrary step (branch-driven or corrective).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveBatch {
    pub target_step_id: String,
}

/// Request to carve a subset of a batch's environments into a new batch.
///
/// Without `target_step_id` the new batch splits in place (a parallel track
/// at the same step); with it, the subset peels off into a different step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitBatch {
    pub environment_ids: BTreeSet<Uuid>,
    pub target_step_id: Option<String>,
    pub name: Option<String>,
}

/// Lightweight batch projection for listings and project summaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub current_step_id: String,
    pub status: BatchStatus,
    pub member_count: usize,
    pub last_transition_at: chrono::DateTime<chrono::Utc>,
}

impl From<&Batch> for BatchSummary {
    fn from(batch: &Batch) -> Self {
        Self {
            id: batch.id,
            project_id: batch.project_id,
            name: batch.name.clone(),
            current_step_id: batch.current_step_id.clone(),
            status: batch.status,
            member_count: batch.member_environment_ids.len(),
            last_transition_at: batch.last_transition_at,
        }
    }
}
