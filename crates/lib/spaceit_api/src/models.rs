//! Request and response bodies.
//!
//! Wire names are camelCase.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use spaceit_core::models::auth::User;
use spaceit_core::models::spaces::{PermissionRecord, Space};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            created_at: user.created_at,
        }
    }
}

/// Returned by `POST /sessions`. The token goes back in `X-CSRF-Token`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSpaceRequest {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameSpaceRequest {
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpaceResponse {
    pub id: Uuid,
    pub name: String,
    pub owner: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Space> for SpaceResponse {
    fn from(space: Space) -> Self {
        Self {
            id: space.id,
            name: space.name,
            owner: space.owner,
            created_at: space.created_at,
            updated_at: space.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpaceListResponse {
    pub items: Vec<SpaceResponse>,
    pub limit: i64,
    pub offset: i64,
}

/// Query string for `GET /spaces`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSpacesQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// `permissions` maps `read`, `write` and `delete` to a flag; any other key is rejected.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberRequest {
    pub user_id: Uuid,
    pub permissions: HashMap<String, bool>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionResponse {
    pub user_id: Uuid,
    pub space_id: Uuid,
    pub read: bool,
    pub write: bool,
    pub delete: bool,
    pub admin: bool,
}

impl From<PermissionRecord> for PermissionResponse {
    fn from(record: PermissionRecord) -> Self {
        Self {
            admin: record.is_admin(),
            user_id: record.user_id,
            space_id: record.space_id,
            read: record.read,
            write: record.write,
            delete: record.delete,
        }
    }
}
