//! Acting-user session record
//!
//! Supplied by the external identity provider; consulted for permission
//! checks and for salesperson-targeted SLA recipients.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSession {
    pub id: String,
    pub role: String,
    pub store_id: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
}

impl UserSession {
    pub fn new(id: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: role.into(),
            store_id: None,
            name: None,
            phone: None,
        }
    }
}
