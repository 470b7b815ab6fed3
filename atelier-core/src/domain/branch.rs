//! Branch catalog types
//!
//! Non-linear transitions are a data-driven overlay on the linear order:
//! steps present in the table are decision points offering named destinations;
//! steps absent from it support only linear advance. The catalog is advisory:
//! it feeds choice lists to callers of `move_to_step` but does not itself
//! restrict targets (only the permission gate does).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A named, human-readable transition choice offered at a decision point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOption {
    pub label: String,
    pub description: Option<String>,
    pub target_step_id: String,
}

/// step id → transition choices offered when departing that step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BranchTable {
    pub branches: HashMap<String, Vec<TransitionOption>>,
}

impl BranchTable {
    /// Choices for a step; empty for linear-only steps.
    pub fn options(&self, step_id: &str) -> &[TransitionOption] {
        self.branches.get(step_id).map(Vec::as_slice).unwrap_or(&[])
    }
}
