//! Role permission types
//!
//! Capabilities are an enumerated set behind a single lookup rather than
//! one-off boolean getters. Step-level checks are always made against the
//! step being departed, never the destination.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

/// Coarse-grained actions a role may perform beyond plain step transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Capability {
    SplitBatch,
    MarkLost,
    EditPipeline,
    ManagePermissions,
    ViewAllProjects,
}

/// Permission record for one role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolePermission {
    pub role: String,
    /// Stage numbers this role may see. Elevated roles do NOT bypass this.
    pub viewable_stages: BTreeSet<u32>,
    /// Step ids this role may transition work out of.
    pub actionable_steps: BTreeSet<String>,
    pub capabilities: BTreeSet<Capability>,
    /// Elevated roles bypass step-level checks (but not stage visibility).
    #[serde(default)]
    pub elevated: bool,
}

impl RolePermission {
    pub fn can_act_on(&self, step_id: &str) -> bool {
        self.elevated || self.actionable_steps.contains(step_id)
    }

    pub fn has_capability(&self, capability: Capability) -> bool {
        self.elevated || self.capabilities.contains(&capability)
    }
}

/// The live permission table, persisted as a single document and re-read on
/// every check so edits take effect on the very next transition attempt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PermissionTable {
    pub roles: HashMap<String, RolePermission>,
}

impl PermissionTable {
    pub fn role(&self, role: &str) -> Option<&RolePermission> {
        self.roles.get(role)
    }
}
