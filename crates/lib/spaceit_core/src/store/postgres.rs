//! PostgreSQL store.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{AuditStore, PermissionStore, SpaceStore, StoreError, UserStore};
use crate::models::audit::NewRequestLog;
use crate::models::auth::User;
use crate::models::spaces::{CreatedSpace, PermissionBits, PermissionRecord, Space};

const PERMISSION_COLUMNS: &str = "user_id, space_id, read_permission, write_permission, \
     delete_permission, created_at, updated_at";

/// [`Store`](super::Store) backed by a PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_user_by_email(&self, email: &str) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (email, password_hash) VALUES ($1, $2) \
             RETURNING id, email, password_hash, created_at",
        )
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }
}

#[async_trait]
impl PermissionStore for PgStore {
    async fn find_permission(
        &self,
        user_id: Uuid,
        space_id: Uuid,
    ) -> Result<PermissionRecord, StoreError> {
        let record = sqlx::query_as::<_, PermissionRecord>(&format!(
            "SELECT {PERMISSION_COLUMNS} FROM permissions WHERE user_id = $1 AND space_id = $2"
        ))
        .bind(user_id)
        .bind(space_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(record)
    }

    async fn upsert_permission(
        &self,
        user_id: Uuid,
        space_id: Uuid,
        bits: PermissionBits,
    ) -> Result<PermissionRecord, StoreError> {
        let record = sqlx::query_as::<_, PermissionRecord>(&format!(
            "INSERT INTO permissions \
                 (user_id, space_id, read_permission, write_permission, delete_permission) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (user_id, space_id) DO UPDATE SET \
                 read_permission = EXCLUDED.read_permission, \
                 write_permission = EXCLUDED.write_permission, \
                 delete_permission = EXCLUDED.delete_permission, \
                 updated_at = now() \
             RETURNING {PERMISSION_COLUMNS}"
        ))
        .bind(user_id)
        .bind(space_id)
        .bind(bits.read)
        .bind(bits.write)
        .bind(bits.delete)
        .fetch_one(&self.pool)
        .await?;
        Ok(record)
    }
}

#[async_trait]
impl AuditStore for PgStore {
    async fn create_request_log(&self, entry: &NewRequestLog) -> Result<Uuid, StoreError> {
        let id = sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO request_log (id, method, path, user_id) VALUES ($1, $2, $3, $4) \
             RETURNING id",
        )
        .bind(entry.id)
        .bind(&entry.method)
        .bind(&entry.path)
        .bind(entry.user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn create_response_log(&self, id: Uuid, status: i32) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO response_log (id, status) VALUES ($1, $2)")
            .bind(id)
            .bind(status)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl SpaceStore for PgStore {
    async fn create_space_tx(&self, name: &str, owner: Uuid) -> Result<CreatedSpace, StoreError> {
        let mut tx = self.pool.begin().await?;

        let space = sqlx::query_as::<_, Space>(
            "INSERT INTO spaces (name, owner) VALUES ($1, $2) \
             RETURNING id, name, owner, created_at, updated_at",
        )
        .bind(name)
        .bind(owner)
        .fetch_one(&mut *tx)
        .await?;

        let owner_permission = sqlx::query_as::<_, PermissionRecord>(&format!(
            "INSERT INTO permissions \
                 (user_id, space_id, read_permission, write_permission, delete_permission) \
             VALUES ($1, $2, true, true, true) \
             RETURNING {PERMISSION_COLUMNS}"
        ))
        .bind(owner)
        .bind(space.id)
        .fetch_one(&mut *tx)
        .await?;

        // Dropping `tx` on any early return above rolls back.
        tx.commit().await?;

        Ok(CreatedSpace {
            space,
            owner_permission,
        })
    }

    async fn get_space(&self, id: Uuid) -> Result<Space, StoreError> {
        let space = sqlx::query_as::<_, Space>(
            "SELECT id, name, owner, created_at, updated_at FROM spaces WHERE id = $1",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(space)
    }

    async fn update_space(&self, id: Uuid, name: &str) -> Result<Space, StoreError> {
        let space = sqlx::query_as::<_, Space>(
            "UPDATE spaces SET name = $2, updated_at = now() WHERE id = $1 \
             RETURNING id, name, owner, created_at, updated_at",
        )
        .bind(id)
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(space)
    }

    async fn list_readable_spaces(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Space>, StoreError> {
        let spaces = sqlx::query_as::<_, Space>(
            "SELECT s.id, s.name, s.owner, s.created_at, s.updated_at \
             FROM spaces s \
             JOIN permissions p ON p.space_id = s.id \
             WHERE p.user_id = $1 AND p.read_permission \
             ORDER BY s.created_at, s.id \
             LIMIT $2 OFFSET $3",
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(spaces)
    }

    async fn delete_space(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM spaces WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
