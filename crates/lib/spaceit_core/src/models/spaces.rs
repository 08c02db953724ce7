//! Space and permission models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A tenant resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Space {
    pub id: Uuid,
    pub name: String,
    pub owner: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Permission bits held by one user on one space.
///
/// At most one record exists per `(user_id, space_id)`. There is no admin
/// bit; admin is derived from all three bits being set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PermissionRecord {
    pub user_id: Uuid,
    pub space_id: Uuid,
    #[sqlx(rename = "read_permission")]
    pub read: bool,
    #[sqlx(rename = "write_permission")]
    pub write: bool,
    #[sqlx(rename = "delete_permission")]
    pub delete: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Requested permission bits for an upsert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionBits {
    pub read: bool,
    pub write: bool,
    pub delete: bool,
}

impl PermissionBits {
    pub const ALL: Self = Self {
        read: true,
        write: true,
        delete: true,
    };
}

/// Result of the transactional space creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedSpace {
    pub space: Space,
    pub owner_permission: PermissionRecord,
}
