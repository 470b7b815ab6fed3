//! Project and environment domain types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A client project: one sale decomposed into environments (line items).
///
/// Structure shared between the engine (persists) and read-model consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub client: String,
    /// The salesperson responsible for this project; resolved by the SLA
    /// monitor when a recipient role names the assigned seller.
    pub seller_id: Option<String>,
    pub environments: Vec<Environment>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Project {
    pub fn environment(&self, id: Uuid) -> Option<&Environment> {
        self.environments.iter().find(|e| e.id == id)
    }

    /// Total contracted value across all environments.
    pub fn total_value(&self) -> f64 {
        self.environments.iter().map(|e| e.value).sum()
    }
}

/// A unit of client work (e.g. one room's furniture). Belongs to exactly one
/// active batch at a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Environment {
    pub id: Uuid,
    pub name: String,
    pub status: EnvironmentStatus,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnvironmentStatus {
    Pending,
    InProduction,
    Delivered,
}
