//! Servers and server groups.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use servwatch_core::types::{DbId, Timestamp};

/// A monitored host.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Server {
    pub id: DbId,
    pub hostname: String,
    pub ip_address: String,
    pub description: String,
    pub deleted_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateServer {
    pub hostname: String,
    #[serde(default)]
    pub ip_address: String,
    #[serde(default)]
    pub description: String,
}

/// A node in the server group tree.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ServerGroup {
    pub id: DbId,
    pub name: String,
    pub description: String,
    pub parent_id: Option<DbId>,
    pub deleted_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateServerGroup {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub parent_id: Option<DbId>,
}
