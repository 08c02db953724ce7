//! Audit log models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request log row, written before the handler runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct RequestLogEntry {
    /// Correlation id shared with the response log row.
    pub id: Uuid,
    pub method: String,
    pub path: String,
    /// `None` for anonymous requests.
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Response log row, keyed by its request log id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ResponseLogEntry {
    pub id: Uuid,
    pub status: i32,
    pub created_at: DateTime<Utc>,
}

/// Parameters for a new request log row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRequestLog {
    pub id: Uuid,
    pub method: String,
    pub path: String,
    pub user_id: Option<Uuid>,
}
