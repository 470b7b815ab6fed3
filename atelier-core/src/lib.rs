//! Atelier Core
//!
//! Core types and abstractions for the Atelier order-tracking system.
//!
//! This crate contains:
//! - Domain types: Core business entities (PipelineDefinition, Project, Batch, etc.)
//! - DTOs: Data transfer objects for the engine's outer surfaces
//! - Business-calendar arithmetic shared by the engine and its consumers

pub mod calendar;
pub mod domain;
pub mod dto;
pub mod session;
