//! Space service: validation on top of the space and permission stores.

use std::collections::HashMap;

use tracing::info;
use uuid::Uuid;

use spaceit_core::models::spaces::{CreatedSpace, PermissionBits, PermissionRecord, Space};
use spaceit_core::store::{Store, StoreError};

use crate::error::{AppError, AppResult};

pub const MIN_SPACE_NAME_LEN: usize = 3;
pub const MAX_SPACE_NAME_LEN: usize = 255;

pub const DEFAULT_PAGE_LIMIT: i64 = 20;
pub const MAX_PAGE_LIMIT: i64 = 100;

fn validate_name(name: &str) -> AppResult<&str> {
    let name = name.trim();
    let len = name.chars().count();
    if !(MIN_SPACE_NAME_LEN..=MAX_SPACE_NAME_LEN).contains(&len) {
        return Err(AppError::MalformedInput(format!(
            "space name must be {MIN_SPACE_NAME_LEN} to {MAX_SPACE_NAME_LEN} characters"
        )));
    }
    Ok(name)
}

fn name_conflict(e: StoreError) -> AppError {
    match e {
        StoreError::Conflict(_) => AppError::Conflict("space name already taken".into()),
        other => other.into(),
    }
}

/// Create a space owned by `owner`, who receives every permission.
pub async fn create(store: &dyn Store, owner: Uuid, name: &str) -> AppResult<CreatedSpace> {
    let name = validate_name(name)?;
    let created = store
        .create_space_tx(name, owner)
        .await
        .map_err(name_conflict)?;
    info!(space_id = %created.space.id, %owner, "space created");
    Ok(created)
}

pub async fn get(store: &dyn Store, space_id: Uuid) -> AppResult<Space> {
    store.get_space(space_id).await.map_err(|e| match e {
        StoreError::NotFound => AppError::NotFound("space not found".into()),
        other => other.into(),
    })
}

pub async fn rename(store: &dyn Store, space_id: Uuid, name: &str) -> AppResult<Space> {
    let name = validate_name(name)?;
    store
        .update_space(space_id, name)
        .await
        .map_err(name_conflict)
}

pub async fn delete(store: &dyn Store, space_id: Uuid) -> AppResult<()> {
    store.delete_space(space_id).await.map_err(|e| match e {
        StoreError::NotFound => AppError::NotFound("space not found".into()),
        other => other.into(),
    })?;
    info!(%space_id, "space deleted");
    Ok(())
}

/// Clamp caller-supplied paging to `(limit, offset)`.
pub fn page(limit: Option<i64>, offset: Option<i64>) -> AppResult<(i64, i64)> {
    let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT);
    let offset = offset.unwrap_or(0);
    if limit < 1 || offset < 0 {
        return Err(AppError::MalformedInput(
            "limit must be positive and offset non-negative".into(),
        ));
    }
    Ok((limit.min(MAX_PAGE_LIMIT), offset))
}

pub async fn list_readable(
    store: &dyn Store,
    user_id: Uuid,
    limit: i64,
    offset: i64,
) -> AppResult<Vec<Space>> {
    Ok(store.list_readable_spaces(user_id, limit, offset).await?)
}

/// Turn a `{"read": true, ...}` map into permission bits.
///
/// Only `read`, `write` and `delete` are accepted. Keys left out are false.
pub fn permission_bits(requested: &HashMap<String, bool>) -> AppResult<PermissionBits> {
    let mut bits = PermissionBits::default();
    for (key, &granted) in requested {
        match key.as_str() {
            "read" => bits.read = granted,
            "write" => bits.write = granted,
            "delete" => bits.delete = granted,
            other => {
                return Err(AppError::MalformedInput(format!(
                    "unsupported permission: {other}"
                )));
            }
        }
    }
    Ok(bits)
}

/// Grant `user_id` the requested bits on `space_id`, replacing any earlier grant.
pub async fn add_member(
    store: &dyn Store,
    space_id: Uuid,
    user_id: Uuid,
    requested: &HashMap<String, bool>,
) -> AppResult<PermissionRecord> {
    let bits = permission_bits(requested)?;
    let record = store
        .upsert_permission(user_id, space_id, bits)
        .await
        .map_err(|e| match e {
            StoreError::NotFound => AppError::NotFound("user or space not found".into()),
            other => other.into(),
        })?;
    info!(%space_id, %user_id, read = bits.read, write = bits.write, delete = bits.delete, "member permissions set");
    Ok(record)
}
