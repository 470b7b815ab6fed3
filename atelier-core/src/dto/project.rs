//! Project DTOs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::batch::Batch;
use crate::domain::project::Project;
use crate::dto::batch::BatchSummary;

/// Request to create a project with its initial environments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProject {
    pub client: String,
    pub seller_id: Option<String>,
    pub environments: Vec<CreateEnvironment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEnvironment {
    pub name: String,
    #[serde(default)]
    pub value: f64,
}

/// Response to project creation: the project plus the batch spawned with it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedProject {
    pub project: Project,
    pub initial_batch: Batch,
}

/// Project-level aggregation across all of the project's batches.
///
/// There is no merge operation, so this is the only whole-project view: it
/// sums value and lists each independently progressing batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub id: Uuid,
    pub client: String,
    pub total_value: f64,
    pub environment_count: usize,
    pub batches: Vec<BatchSummary>,
}
