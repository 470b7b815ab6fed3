//! Pipeline definition types
//!
//! The production pipeline is data, not code: a map of steps plus an ordered
//! sequence of step ids. Order holds ids rather than copies, so reordering
//! never touches step identity and steps can be renumbered-free reordered.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One named position in the production pipeline.
///
/// `sla_days == 0` means the step carries no deadline. `locked` marks the two
/// reserved terminal steps (Completed, Lost), which reject mutation and
/// deletion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineStep {
    /// Dotted identifier, e.g. `"2.3"`. Stable across reorders.
    pub id: String,
    pub label: String,
    pub owner_role: String,
    pub sla_days: u32,
    /// Coarse grouping shared by several steps; used for visibility permissions.
    pub stage: u32,
    #[serde(default)]
    pub locked: bool,
}

/// Partial update for a step. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateStepFields {
    pub label: Option<String>,
    pub owner_role: Option<String>,
    pub sla_days: Option<u32>,
    pub stage: Option<u32>,
}

/// Errors from pure definition mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefinitionError {
    DuplicateStep(String),
    UnknownStep(String),
    LockedStep(String),
    OutOfRange { index: usize, len: usize },
}

/// The full pipeline definition: step map + decoupled order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDefinition {
    pub steps: HashMap<String, PipelineStep>,
    /// Explicit sequence of step ids defining linear "next" transitions.
    pub order: Vec<String>,
    /// Reserved terminal: work delivered and closed.
    pub completed_step_id: String,
    /// Reserved terminal: work abandoned. Never reached by natural advance.
    pub lost_step_id: String,
}

impl PipelineDefinition {
    /// Append a new step to the map and to the end of the order.
    pub fn add_step(&mut self, step: PipelineStep) -> Result<(), DefinitionError> {
        if self.steps.contains_key(&step.id) {
            return Err(DefinitionError::DuplicateStep(step.id));
        }
        self.order.push(step.id.clone());
        self.steps.insert(step.id.clone(), step);
        Ok(())
    }

    /// Patch a step's fields in place. Locked terminals reject mutation.
    pub fn update_step(
        &mut self,
        id: &str,
        fields: UpdateStepFields,
    ) -> Result<(), DefinitionError> {
        let step = self
            .steps
            .get_mut(id)
            .ok_or_else(|| DefinitionError::UnknownStep(id.to_string()))?;
        if step.locked {
            return Err(DefinitionError::LockedStep(id.to_string()));
        }
        if let Some(label) = fields.label {
            step.label = label;
        }
        if let Some(owner_role) = fields.owner_role {
            step.owner_role = owner_role;
        }
        if let Some(sla_days) = fields.sla_days {
            step.sla_days = sla_days;
        }
        if let Some(stage) = fields.stage {
            step.stage = stage;
        }
        Ok(())
    }

    /// Remove a step from the map and the order. Locked terminals reject
    /// deletion. The engine layer additionally forbids deleting steps still
    /// referenced by an active batch.
    pub fn delete_step(&mut self, id: &str) -> Result<PipelineStep, DefinitionError> {
        match self.steps.get(id) {
            None => return Err(DefinitionError::UnknownStep(id.to_string())),
            Some(step) if step.locked => {
                return Err(DefinitionError::LockedStep(id.to_string()));
            }
            Some(_) => {}
        }
        self.order.retain(|s| s != id);
        self.steps
            .remove(id)
            .ok_or_else(|| DefinitionError::UnknownStep(id.to_string()))
    }

    /// Move the id at `from` to position `to` within the order.
    pub fn reorder(&mut self, from: usize, to: usize) -> Result<(), DefinitionError> {
        let len = self.order.len();
        if from >= len {
            return Err(DefinitionError::OutOfRange { index: from, len });
        }
        if to >= len {
            return Err(DefinitionError::OutOfRange { index: to, len });
        }
        let id = self.order.remove(from);
        self.order.insert(to, id);
        Ok(())
    }

    /// Position of a step id within the order, if present.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.order.iter().position(|s| s == id)
    }

    /// Linear successor in the order. Terminal redirects (Lost → Completed on
    /// natural advance) are applied by the engine on top of this lookup.
    pub fn natural_next(&self, id: &str) -> Option<&str> {
        let pos = self.position(id)?;
        self.order.get(pos + 1).map(String::as_str)
    }

    pub fn is_terminal(&self, id: &str) -> bool {
        id == self.completed_step_id || id == self.lost_step_id
    }

    pub fn first_step_id(&self) -> Option<&str> {
        self.order.first().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(id: &str, stage: u32) -> PipelineStep {
        PipelineStep {
            id: id.to_string(),
            label: format!("Step {id}"),
            owner_role: "seller".to_string(),
            sla_days: 3,
            stage,
            locked: false,
        }
    }

    fn definition() -> PipelineDefinition {
        let mut def = PipelineDefinition {
            steps: HashMap::new(),
            order: Vec::new(),
            completed_step_id: "10.1".to_string(),
            lost_step_id: "10.2".to_string(),
        };
        for id in ["1.1", "2.1", "2.3"] {
            def.add_step(step(id, 1)).unwrap();
        }
        def.add_step(PipelineStep {
            locked: true,
            sla_days: 0,
            ..step("10.1", 10)
        })
        .unwrap();
        def.add_step(PipelineStep {
            locked: true,
            sla_days: 0,
            ..step("10.2", 10)
        })
        .unwrap();
        def
    }

    #[test]
    fn test_add_duplicate_step_conflicts() {
        let mut def = definition();
        let result = def.add_step(step("2.1", 2));
        assert_eq!(result, Err(DefinitionError::DuplicateStep("2.1".into())));
    }

    #[test]
    fn test_add_appends_to_order() {
        let mut def = definition();
        def.add_step(step("3.1", 3)).unwrap();
        assert_eq!(def.order.last().map(String::as_str), Some("3.1"));
    }

    #[test]
    fn test_update_locked_step_rejected() {
        let mut def = definition();
        let result = def.update_step(
            "10.1",
            UpdateStepFields {
                label: Some("renamed".into()),
                ..Default::default()
            },
        );
        assert_eq!(result, Err(DefinitionError::LockedStep("10.1".into())));
    }

    #[test]
    fn test_update_patches_only_given_fields() {
        let mut def = definition();
        def.update_step(
            "2.1",
            UpdateStepFields {
                sla_days: Some(7),
                ..Default::default()
            },
        )
        .unwrap();
        let step = &def.steps["2.1"];
        assert_eq!(step.sla_days, 7);
        assert_eq!(step.owner_role, "seller");
    }

    #[test]
    fn test_delete_locked_step_rejected() {
        let mut def = definition();
        assert_eq!(
            def.delete_step("10.2"),
            Err(DefinitionError::LockedStep("10.2".into()))
        );
    }

    #[test]
    fn test_delete_removes_from_map_and_order() {
        let mut def = definition();
        def.delete_step("2.1").unwrap();
        assert!(!def.steps.contains_key("2.1"));
        assert!(def.position("2.1").is_none());
    }

    #[test]
    fn test_reorder_moves_id() {
        let mut def = definition();
        def.reorder(0, 2).unwrap();
        assert_eq!(def.order[2], "1.1");
        // Step identity untouched.
        assert_eq!(def.steps["1.1"].label, "Step 1.1");
    }

    #[test]
    fn test_reorder_out_of_range() {
        let mut def = definition();
        assert!(matches!(
            def.reorder(0, 99),
            Err(DefinitionError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_natural_next_is_linear() {
        let def = definition();
        assert_eq!(def.natural_next("1.1"), Some("2.1"));
        assert_eq!(def.natural_next("10.2"), None);
    }

    #[test]
    fn test_terminals() {
        let def = definition();
        assert!(def.is_terminal("10.1"));
        assert!(def.is_terminal("10.2"));
        assert!(!def.is_terminal("1.1"));
    }
}
