//! Pipeline definition DTOs

use serde::{Deserialize, Serialize};

use crate::domain::pipeline::{PipelineStep, UpdateStepFields};

/// Request to add a step to the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateStep {
    pub id: String,
    pub label: String,
    pub owner_role: String,
    #[serde(default)]
    pub sla_days: u32,
    pub stage: u32,
}

impl From<CreateStep> for PipelineStep {
    fn from(req: CreateStep) -> Self {
        PipelineStep {
            id: req.id,
            label: req.label,
            owner_role: req.owner_role,
            sla_days: req.sla_days,
            stage: req.stage,
            locked: false,
        }
    }
}

/// Partial step update; omitted fields are untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateStep {
    pub label: Option<String>,
    pub owner_role: Option<String>,
    pub sla_days: Option<u32>,
    pub stage: Option<u32>,
}

impl From<UpdateStep> for UpdateStepFields {
    fn from(req: UpdateStep) -> Self {
        UpdateStepFields {
            label: req.label,
            owner_role: req.owner_role,
            sla_days: req.sla_days,
            stage: req.stage,
        }
    }
}

/// Request to move a step id within the order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Reorder {
    pub from_index: usize,
    pub to_index: usize,
}
