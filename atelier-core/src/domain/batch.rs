//! Batch domain types

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A subset of a project's environments progressing together through the
/// pipeline.
///
/// Batches are created at project creation (full environment set) or by
/// splitting an existing batch; they are dropped when their member set
/// empties and become `Terminal` on reaching Completed or Lost. There is no
/// merge operation: project-level views aggregate across all batches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub current_step_id: String,
    pub member_environment_ids: BTreeSet<Uuid>,
    pub status: BatchStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub last_transition_at: chrono::DateTime<chrono::Utc>,
    pub sla_breach_notified: bool,
    pub sla_preventive_notified: bool,
    /// Domain-exception deadline computed when the batch leaves a designated
    /// checkpoint step (business days, not calendar days).
    pub auxiliary_deadline: Option<chrono::DateTime<chrono::Utc>>,
    /// Bumped on every write; the SLA monitor's optimistic claim checks it.
    #[serde(default)]
    pub version: u64,
}

/// Batch lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchStatus {
    Active,
    Terminal,
}

impl Batch {
    pub fn is_active(&self) -> bool {
        self.status == BatchStatus::Active
    }
}
