//! In-memory store for tests and local development.
//!
//! All state lives behind one lock so multi-row operations such as
//! [`SpaceStore::create_space_tx`] are atomic. Fault switches let tests force
//! individual operations to fail the way an unavailable database would.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{AuditStore, PermissionStore, SpaceStore, StoreError, UserStore};
use crate::models::audit::{NewRequestLog, RequestLogEntry, ResponseLogEntry};
use crate::models::auth::User;
use crate::models::spaces::{CreatedSpace, PermissionBits, PermissionRecord, Space};

#[derive(Debug, Default)]
struct MemoryState {
    users: HashMap<Uuid, User>,
    spaces: HashMap<Uuid, Space>,
    permissions: HashMap<(Uuid, Uuid), PermissionRecord>,
    request_logs: Vec<RequestLogEntry>,
    response_logs: Vec<ResponseLogEntry>,
}

/// Operations that can be switched to fail.
#[derive(Debug, Default)]
pub struct Faults {
    pub request_log: AtomicBool,
    pub response_log: AtomicBool,
    pub permission_lookup: AtomicBool,
    pub user_lookup: AtomicBool,
}

impl Faults {
    fn check(flag: &AtomicBool, what: &str) -> Result<(), StoreError> {
        if flag.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!("{what} failed")));
        }
        Ok(())
    }
}

/// [`Store`](super::Store) kept entirely in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
    faults: Faults,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fault switches for this store.
    pub fn faults(&self) -> &Faults {
        &self.faults
    }

    /// Snapshot of all request log rows, in write order.
    pub async fn request_logs(&self) -> Vec<RequestLogEntry> {
        self.state.read().await.request_logs.clone()
    }

    /// Snapshot of all response log rows, in write order.
    pub async fn response_logs(&self) -> Vec<ResponseLogEntry> {
        self.state.read().await.response_logs.clone()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user_by_email(&self, email: &str) -> Result<User, StoreError> {
        Faults::check(&self.faults.user_lookup, "user lookup")?;
        self.state
            .read()
            .await
            .users
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, StoreError> {
        let mut state = self.state.write().await;
        if state.users.values().any(|u| u.email == email) {
            return Err(StoreError::Conflict("users_email_key".into()));
        }
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }
}

#[async_trait]
impl PermissionStore for MemoryStore {
    async fn find_permission(
        &self,
        user_id: Uuid,
        space_id: Uuid,
    ) -> Result<PermissionRecord, StoreError> {
        Faults::check(&self.faults.permission_lookup, "permission lookup")?;
        self.state
            .read()
            .await
            .permissions
            .get(&(user_id, space_id))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn upsert_permission(
        &self,
        user_id: Uuid,
        space_id: Uuid,
        bits: PermissionBits,
    ) -> Result<PermissionRecord, StoreError> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&user_id) || !state.spaces.contains_key(&space_id) {
            return Err(StoreError::NotFound);
        }
        let now = Utc::now();
        let record = state
            .permissions
            .entry((user_id, space_id))
            .and_modify(|r| {
                r.read = bits.read;
                r.write = bits.write;
                r.delete = bits.delete;
                r.updated_at = now;
            })
            .or_insert_with(|| PermissionRecord {
                user_id,
                space_id,
                read: bits.read,
                write: bits.write,
                delete: bits.delete,
                created_at: now,
                updated_at: now,
            })
            .clone();
        Ok(record)
    }
}

#[async_trait]
impl AuditStore for MemoryStore {
    async fn create_request_log(&self, entry: &NewRequestLog) -> Result<Uuid, StoreError> {
        Faults::check(&self.faults.request_log, "request log write")?;
        let mut state = self.state.write().await;
        if state.request_logs.iter().any(|r| r.id == entry.id) {
            return Err(StoreError::Conflict("request_log_pkey".into()));
        }
        state.request_logs.push(RequestLogEntry {
            id: entry.id,
            method: entry.method.clone(),
            path: entry.path.clone(),
            user_id: entry.user_id,
            created_at: Utc::now(),
        });
        Ok(entry.id)
    }

    async fn create_response_log(&self, id: Uuid, status: i32) -> Result<(), StoreError> {
        Faults::check(&self.faults.response_log, "response log write")?;
        let mut state = self.state.write().await;
        if !state.request_logs.iter().any(|r| r.id == id) {
            return Err(StoreError::NotFound);
        }
        if state.response_logs.iter().any(|r| r.id == id) {
            return Err(StoreError::Conflict("response_log_pkey".into()));
        }
        state.response_logs.push(ResponseLogEntry {
            id,
            status,
            created_at: Utc::now(),
        });
        Ok(())
    }
}

#[async_trait]
impl SpaceStore for MemoryStore {
    async fn create_space_tx(&self, name: &str, owner: Uuid) -> Result<CreatedSpace, StoreError> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&owner) {
            return Err(StoreError::NotFound);
        }
        if state.spaces.values().any(|s| s.name == name) {
            return Err(StoreError::Conflict("spaces_name_key".into()));
        }

        let now = Utc::now();
        let space = Space {
            id: Uuid::new_v4(),
            name: name.to_string(),
            owner,
            created_at: now,
            updated_at: now,
        };
        let owner_permission = PermissionRecord {
            user_id: owner,
            space_id: space.id,
            read: true,
            write: true,
            delete: true,
            created_at: now,
            updated_at: now,
        };
        state.spaces.insert(space.id, space.clone());
        state
            .permissions
            .insert((owner, space.id), owner_permission.clone());

        Ok(CreatedSpace {
            space,
            owner_permission,
        })
    }

    async fn get_space(&self, id: Uuid) -> Result<Space, StoreError> {
        self.state
            .read()
            .await
            .spaces
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn update_space(&self, id: Uuid, name: &str) -> Result<Space, StoreError> {
        let mut state = self.state.write().await;
        if state.spaces.values().any(|s| s.name == name && s.id != id) {
            return Err(StoreError::Conflict("spaces_name_key".into()));
        }
        let space = state.spaces.get_mut(&id).ok_or(StoreError::NotFound)?;
        space.name = name.to_string();
        space.updated_at = Utc::now();
        Ok(space.clone())
    }

    async fn list_readable_spaces(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Space>, StoreError> {
        let state = self.state.read().await;
        let mut spaces: Vec<Space> = state
            .permissions
            .values()
            .filter(|p| p.user_id == user_id && p.read)
            .filter_map(|p| state.spaces.get(&p.space_id).cloned())
            .collect();
        spaces.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(spaces
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(0))
            .take(usize::try_from(limit).unwrap_or(0))
            .collect())
    }

    async fn delete_space(&self, id: Uuid) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if state.spaces.remove(&id).is_none() {
            return Err(StoreError::NotFound);
        }
        state.permissions.retain(|(_, space_id), _| *space_id != id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::AccessLevel;
    use crate::uuid::correlation_id;

    async fn store_with_user(email: &str) -> (MemoryStore, User) {
        let store = MemoryStore::new();
        let user = store.create_user(email, "hash").await.unwrap();
        (store, user)
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let (store, _) = store_with_user("ada@example.com").await;
        let err = store
            .create_user("ada@example.com", "other")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn create_space_grants_owner_admin() {
        let (store, user) = store_with_user("ada@example.com").await;
        let created = store.create_space_tx("garden", user.id).await.unwrap();

        assert!(created.owner_permission.grants(AccessLevel::Admin));
        let record = store
            .find_permission(user.id, created.space.id)
            .await
            .unwrap();
        assert_eq!(record, created.owner_permission);
    }

    #[tokio::test]
    async fn duplicate_space_name_leaves_no_partial_rows() {
        let (store, user) = store_with_user("ada@example.com").await;
        store.create_space_tx("garden", user.id).await.unwrap();

        let err = store.create_space_tx("garden", user.id).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        let spaces = store.list_readable_spaces(user.id, 10, 0).await.unwrap();
        assert_eq!(spaces.len(), 1);
    }

    #[tokio::test]
    async fn upsert_replaces_bits() {
        let (store, owner) = store_with_user("owner@example.com").await;
        let member = store.create_user("member@example.com", "h").await.unwrap();
        let space = store.create_space_tx("garden", owner.id).await.unwrap().space;

        let first = store
            .upsert_permission(
                member.id,
                space.id,
                PermissionBits {
                    read: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let second = store
            .upsert_permission(member.id, space.id, PermissionBits::ALL)
            .await
            .unwrap();

        assert!(!first.write);
        assert!(second.is_admin());
        assert_eq!(first.created_at, second.created_at);
    }

    #[tokio::test]
    async fn response_log_requires_request_log() {
        let store = MemoryStore::new();
        let err = store
            .create_response_log(correlation_id(), 200)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
        assert!(store.response_logs().await.is_empty());
    }

    #[tokio::test]
    async fn audit_rows_share_correlation_id() {
        let store = MemoryStore::new();
        let id = store
            .create_request_log(&NewRequestLog {
                id: correlation_id(),
                method: "GET".into(),
                path: "/api/v1/health".into(),
                user_id: None,
            })
            .await
            .unwrap();
        store.create_response_log(id, 200).await.unwrap();

        assert_eq!(store.request_logs().await[0].id, id);
        assert_eq!(store.response_logs().await[0].id, id);
    }

    #[tokio::test]
    async fn faults_fail_the_selected_operation() {
        let store = MemoryStore::new();
        store.faults().request_log.store(true, Ordering::SeqCst);
        let err = store
            .create_request_log(&NewRequestLog {
                id: correlation_id(),
                method: "GET".into(),
                path: "/".into(),
                user_id: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }

    #[tokio::test]
    async fn rename_respects_unique_names() {
        let (store, user) = store_with_user("ada@example.com").await;
        let garden = store.create_space_tx("garden", user.id).await.unwrap().space;
        store.create_space_tx("orchard", user.id).await.unwrap();

        let renamed = store.update_space(garden.id, "meadow").await.unwrap();
        assert_eq!(renamed.name, "meadow");
        assert!(matches!(
            store.update_space(garden.id, "orchard").await,
            Err(StoreError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn delete_space_drops_permissions() {
        let (store, user) = store_with_user("ada@example.com").await;
        let space = store.create_space_tx("garden", user.id).await.unwrap().space;

        store.delete_space(space.id).await.unwrap();

        assert!(matches!(
            store.find_permission(user.id, space.id).await,
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            store.delete_space(space.id).await,
            Err(StoreError::NotFound)
        ));
    }
}
