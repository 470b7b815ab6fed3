//! Domain types
//!
//! Core business entities shared between the engine (persists, transitions)
//! and any read-model consumer.

pub mod batch;
pub mod branch;
pub mod permission;
pub mod pipeline;
pub mod project;

pub use batch::{Batch, BatchStatus};
pub use branch::{BranchTable, TransitionOption};
pub use permission::{Capability, PermissionTable, RolePermission};
pub use pipeline::{DefinitionError, PipelineDefinition, PipelineStep, UpdateStepFields};
pub use project::{Environment, EnvironmentStatus, Project};
