//! Engine configuration
//!
//! Every per-step behavior that is not plain linear advance lives in data
//! loaded here, not in code: the pipeline seed, the branch catalog, the
//! checkpoint-deadline offsets, the natural-next override, and the SLA
//! monitor settings. A TOML file (`ATELIER_CONFIG`) overrides the compiled-in
//! defaults.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use atelier_core::domain::branch::{BranchTable, TransitionOption};
use atelier_core::domain::permission::{Capability, PermissionTable, RolePermission};
use atelier_core::domain::pipeline::{PipelineDefinition, PipelineStep};

/// Reserved recipient role that resolves to the project's assigned
/// salesperson instead of every user holding a role.
pub const ASSIGNED_SELLER_ROLE: &str = "assigned-seller";

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Parse(err)
    }
}

/// On-disk configuration shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub pipeline: PipelineSeed,
    #[serde(default)]
    pub branches: Vec<BranchSeed>,
    #[serde(default)]
    pub checkpoints: Vec<CheckpointSeed>,
    #[serde(default)]
    pub overrides: Vec<OverrideSeed>,
    #[serde(default)]
    pub sla: SlaSettings,
    #[serde(default)]
    pub permissions: Vec<RolePermission>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSeed {
    pub completed_step_id: String,
    pub lost_step_id: String,
    /// Environments held by a batch at or past this stage count as
    /// in production for status purposes.
    #[serde(default = "default_production_stage")]
    pub production_stage: u32,
    pub steps: Vec<PipelineStep>,
}

fn default_production_stage() -> u32 {
    4
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchSeed {
    pub step_id: String,
    pub options: Vec<TransitionOption>,
}

/// Leaving `step_id` computes an auxiliary deadline this many business days
/// out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointSeed {
    pub step_id: String,
    pub business_days: u32,
}

/// Redirect applied after the linear next-step lookup. The built-in entry
/// (Lost → Completed) keeps natural advance from ever marking work lost.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverrideSeed {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlaSettings {
    pub manager_role: String,
    pub preventive_enabled: bool,
    /// Fixed delay between outbound sends, respecting transport rate limits.
    pub send_delay_ms: u64,
    pub cadence: Cadence,
    #[serde(default)]
    pub recipients: Vec<RecipientOverride>,
}

impl Default for SlaSettings {
    fn default() -> Self {
        Self {
            manager_role: "manager".to_string(),
            preventive_enabled: true,
            send_delay_ms: 1500,
            cadence: Cadence::Interval { seconds: 300 },
            recipients: Vec::new(),
        }
    }
}

/// Monitor trigger cadence: continuous polling or a fixed daily wall-clock.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Cadence {
    Interval { seconds: u64 },
    DailyAt { hour: u32, minute: u32 },
}

/// Per-step recipient role list replacing the default
/// `[step.owner_role, manager_role]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipientOverride {
    pub step_id: String,
    pub roles: Vec<String>,
}

impl EngineConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    /// Build the seed pipeline definition document.
    pub fn pipeline_definition(&self) -> PipelineDefinition {
        let mut steps = HashMap::new();
        let mut order = Vec::new();
        for step in &self.pipeline.steps {
            order.push(step.id.clone());
            steps.insert(step.id.clone(), step.clone());
        }
        PipelineDefinition {
            steps,
            order,
            completed_step_id: self.pipeline.completed_step_id.clone(),
            lost_step_id: self.pipeline.lost_step_id.clone(),
        }
    }

    /// Build the seed permission table document.
    pub fn permission_table(&self) -> PermissionTable {
        let mut roles = HashMap::new();
        for permission in &self.permissions {
            roles.insert(permission.role.clone(), permission.clone());
        }
        PermissionTable { roles }
    }
}

/// Runtime lookup tables derived from [`EngineConfig`], shared by the
/// services and the SLA monitor.
#[derive(Debug, Clone)]
pub struct EngineTables {
    pub branch_table: BranchTable,
    pub checkpoint_offsets: HashMap<String, u32>,
    pub natural_next_override: HashMap<String, String>,
    pub production_stage: u32,
    pub sla: SlaSettings,
    pub sla_recipients: HashMap<String, Vec<String>>,
}

impl EngineTables {
    pub fn from_config(config: &EngineConfig) -> Self {
        let mut branches = HashMap::new();
        for seed in &config.branches {
            branches.insert(seed.step_id.clone(), seed.options.clone());
        }

        let mut checkpoint_offsets = HashMap::new();
        for seed in &config.checkpoints {
            checkpoint_offsets.insert(seed.step_id.clone(), seed.business_days);
        }

        // Natural advance must never land on Lost.
        let mut natural_next_override = HashMap::new();
        natural_next_override.insert(
            config.pipeline.lost_step_id.clone(),
            config.pipeline.completed_step_id.clone(),
        );
        for seed in &config.overrides {
            natural_next_override.insert(seed.from.clone(), seed.to.clone());
        }

        let mut sla_recipients = HashMap::new();
        for seed in &config.sla.recipients {
            sla_recipients.insert(seed.step_id.clone(), seed.roles.clone());
        }

        Self {
            branch_table: BranchTable { branches },
            checkpoint_offsets,
            natural_next_override,
            production_stage: config.pipeline.production_stage,
            sla: config.sla.clone(),
            sla_recipients,
        }
    }
}

fn step(id: &str, label: &str, owner_role: &str, sla_days: u32, stage: u32) -> PipelineStep {
    PipelineStep {
        id: id.to_string(),
        label: label.to_string(),
        owner_role: owner_role.to_string(),
        sla_days,
        stage,
        locked: false,
    }
}

fn locked_step(id: &str, label: &str, stage: u32) -> PipelineStep {
    PipelineStep {
        locked: true,
        ..step(id, label, "manager", 0, stage)
    }
}

fn option(label: &str, target: &str) -> TransitionOption {
    TransitionOption {
        label: label.to_string(),
        description: None,
        target_step_id: target.to_string(),
    }
}

fn role(
    name: &str,
    stages: &[u32],
    steps: &[&str],
    capabilities: &[Capability],
) -> RolePermission {
    RolePermission {
        role: name.to_string(),
        viewable_stages: stages.iter().copied().collect(),
        actionable_steps: steps.iter().map(|s| s.to_string()).collect(),
        capabilities: capabilities.iter().copied().collect(),
        elevated: false,
    }
}

/// Compiled-in default configuration, used when no TOML file is supplied.
pub fn default_config() -> EngineConfig {
    EngineConfig {
        pipeline: PipelineSeed {
            completed_step_id: "10.1".to_string(),
            lost_step_id: "10.2".to_string(),
            production_stage: 4,
            steps: vec![
                step("1.1", "Lead intake", "seller", 3, 1),
                step("1.2", "First meeting", "seller", 5, 1),
                step("2.1", "Measurement visit", "technical", 4, 2),
                step("2.3", "Design draft", "designer", 7, 2),
                step("2.7", "Proposal review", "seller", 5, 2),
                step("3.1", "Contract signing", "seller", 5, 3),
                step("4.1", "Fabrication queue", "production", 2, 4),
                step("4.2", "Fabrication", "production", 30, 4),
                step("5.1", "Delivery scheduling", "logistics", 5, 5),
                step("5.2", "Assembly", "assembler", 10, 5),
                step("6.1", "Final inspection", "technical", 3, 6),
                step("8.1", "Post-delivery service", "support", 0, 8),
                locked_step("10.1", "Completed", 10),
                locked_step("10.2", "Lost", 10),
            ],
        },
        branches: vec![
            BranchSeed {
                step_id: "2.7".to_string(),
                options: vec![
                    option("Approve proposal", "3.1"),
                    option("Request revision", "2.3"),
                    option("Mark lost", "10.2"),
                ],
            },
            BranchSeed {
                step_id: "6.1".to_string(),
                options: vec![
                    option("Handover complete", "10.1"),
                    option("Open service follow-up", "8.1"),
                ],
            },
        ],
        checkpoints: vec![
            CheckpointSeed {
                step_id: "3.1".to_string(),
                business_days: 10,
            },
            CheckpointSeed {
                step_id: "5.2".to_string(),
                business_days: 5,
            },
        ],
        overrides: Vec::new(),
        sla: SlaSettings {
            recipients: vec![RecipientOverride {
                step_id: "3.1".to_string(),
                roles: vec![ASSIGNED_SELLER_ROLE.to_string(), "manager".to_string()],
            }],
            ..SlaSettings::default()
        },
        permissions: vec![
            role(
                "seller",
                &[1, 2, 3],
                &["1.1", "1.2", "2.7", "3.1"],
                &[Capability::MarkLost],
            ),
            role("technical", &[2, 5, 6], &["2.1", "6.1"], &[]),
            role("designer", &[2], &["2.3"], &[]),
            role(
                "production",
                &[4],
                &["4.1", "4.2"],
                &[Capability::SplitBatch],
            ),
            role(
                "logistics",
                &[4, 5],
                &["5.1"],
                &[Capability::SplitBatch],
            ),
            role("assembler", &[5], &["5.2"], &[]),
            role("support", &[6, 8], &["8.1"], &[]),
            RolePermission {
                elevated: true,
                ..role(
                    "manager",
                    &[1, 2, 3, 4, 5, 6, 8, 10],
                    &[],
                    &[
                        Capability::SplitBatch,
                        Capability::MarkLost,
                        Capability::EditPipeline,
                        Capability::ManagePermissions,
                        Capability::ViewAllProjects,
                    ],
                )
            },
        ],
    }
}
