//! DTOs
//!
//! Data transfer objects for the engine's outer surfaces. Read models are
//! plain projections of domain types; request types carry only what a caller
//! may set.

pub mod batch;
pub mod pipeline;
pub mod project;

pub use batch::{BatchSummary, MoveBatch, SplitBatch};
pub use pipeline::{CreateStep, Reorder, UpdateStep};
pub use project::{CreateEnvironment, CreateProject, ProjectSummary};
