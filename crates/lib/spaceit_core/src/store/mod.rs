//! Persistence capability consumed by the request pipeline.
//!
//! One [`Store`] trait bundles every collaborator contract (users,
//! permissions, audit, spaces). Space creation is transactional: a store must
//! create the space and its owner's permission record atomically.
//! [`postgres::PgStore`] is the production implementation and
//! [`memory::MemoryStore`] backs tests and local development.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::audit::NewRequestLog;
use crate::models::auth::User;
use crate::models::spaces::{CreatedSpace, PermissionBits, PermissionRecord, Space};

/// PostgreSQL `unique_violation`.
const PG_UNIQUE_VIOLATION: &str = "23505";
/// PostgreSQL `foreign_key_violation`.
const PG_FOREIGN_KEY_VIOLATION: &str = "23503";

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record not found")]
    NotFound,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Db(sqlx::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::RowNotFound = e {
            return StoreError::NotFound;
        }
        if let Some(db) = e.as_database_error() {
            match db.code().as_deref() {
                Some(PG_UNIQUE_VIOLATION) => {
                    return StoreError::Conflict(
                        db.constraint().unwrap_or("unique constraint").to_string(),
                    );
                }
                Some(PG_FOREIGN_KEY_VIOLATION) => return StoreError::NotFound,
                _ => {}
            }
        }
        StoreError::Db(e)
    }
}

/// User lookups and registration.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> Result<User, StoreError>;

    /// Fails with [`StoreError::Conflict`] if the email is taken.
    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, StoreError>;
}

/// Per-space permission records.
#[async_trait]
pub trait PermissionStore: Send + Sync {
    async fn find_permission(
        &self,
        user_id: Uuid,
        space_id: Uuid,
    ) -> Result<PermissionRecord, StoreError>;

    /// Insert or replace the bits for `(user_id, space_id)`.
    async fn upsert_permission(
        &self,
        user_id: Uuid,
        space_id: Uuid,
        bits: PermissionBits,
    ) -> Result<PermissionRecord, StoreError>;
}

/// Request/response audit trail.
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Persist a request log row and return its correlation id.
    async fn create_request_log(&self, entry: &NewRequestLog) -> Result<Uuid, StoreError>;

    /// Persist the response status for an existing request log row.
    async fn create_response_log(&self, id: Uuid, status: i32) -> Result<(), StoreError>;
}

/// Space persistence.
#[async_trait]
pub trait SpaceStore: Send + Sync {
    /// Create a space and grant its owner every permission, atomically.
    async fn create_space_tx(&self, name: &str, owner: Uuid) -> Result<CreatedSpace, StoreError>;

    async fn get_space(&self, id: Uuid) -> Result<Space, StoreError>;

    /// Rename a space. Fails with [`StoreError::Conflict`] if the name is taken.
    async fn update_space(&self, id: Uuid, name: &str) -> Result<Space, StoreError>;

    /// Spaces `user_id` can read, oldest first.
    async fn list_readable_spaces(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Space>, StoreError>;

    async fn delete_space(&self, id: Uuid) -> Result<(), StoreError>;
}

/// Everything the pipeline and handlers need from persistence.
pub trait Store: UserStore + PermissionStore + AuditStore + SpaceStore {}

impl<T> Store for T where T: UserStore + PermissionStore + AuditStore + SpaceStore {}
