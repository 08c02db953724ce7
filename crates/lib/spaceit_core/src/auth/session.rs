//! Server-side session storage.
//!
//! Sessions are keyed by a random [`SessionKey`] carried in the client's
//! session cookie, so each client channel owns its own entry and concurrent
//! clients never contend on the same key. Blobs are opaque to the store.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rand::{Rng, rng};
use thiserror::Error;
use tracing::debug;

/// Expired sessions are kept this long so late verifications can report
/// expiry instead of an unknown session.
const EXPIRED_RETENTION_SECS: i64 = 60 * 60;

/// Session storage errors.
#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("Session backend unavailable: {0}")]
    Unavailable(String),
}

/// Cookie value naming one server-side session. Rotated on every login.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SessionKey(String);

impl SessionKey {
    /// Generate a fresh random key (256 bits).
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rng().fill(&mut bytes);
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Wrap a key presented by the client.
    pub fn from_cookie(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionKey(<redacted>)")
    }
}

/// Channel-scoped session persistence.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the blob stored under `key`, if any.
    async fn load(&self, key: &SessionKey) -> Result<Option<String>, SessionStoreError>;

    /// Store `blob` under `key`, replacing any previous value.
    async fn save(
        &self,
        key: &SessionKey,
        blob: String,
        expires_at: DateTime<Utc>,
    ) -> Result<(), SessionStoreError>;

    /// Explicitly expire the session under `key`.
    async fn invalidate(&self, key: &SessionKey) -> Result<(), SessionStoreError>;
}

#[derive(Debug, Clone)]
struct StoredSession {
    blob: String,
    expires_at: DateTime<Utc>,
}

/// In-process session store on a sharded map.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: DashMap<SessionKey, StoredSession>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions, expired ones included.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drop every session that expired before `cutoff`.
    pub fn purge_expired(&self, cutoff: DateTime<Utc>) {
        let before = self.sessions.len();
        self.sessions.retain(|_, s| s.expires_at > cutoff);
        let purged = before.saturating_sub(self.sessions.len());
        if purged > 0 {
            debug!(purged, "purged expired sessions");
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, key: &SessionKey) -> Result<Option<String>, SessionStoreError> {
        Ok(self.sessions.get(key).map(|s| s.blob.clone()))
    }

    async fn save(
        &self,
        key: &SessionKey,
        blob: String,
        expires_at: DateTime<Utc>,
    ) -> Result<(), SessionStoreError> {
        self.purge_expired(Utc::now() - Duration::seconds(EXPIRED_RETENTION_SECS));
        self.sessions
            .insert(key.clone(), StoredSession { blob, expires_at });
        Ok(())
    }

    async fn invalidate(&self, key: &SessionKey) -> Result<(), SessionStoreError> {
        self.sessions.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_are_unique() {
        let a = SessionKey::generate();
        let b = SessionKey::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 43);
    }

    #[test]
    fn debug_hides_key() {
        let key = SessionKey::from_cookie("super-secret-cookie");
        assert!(!format!("{key:?}").contains("super-secret-cookie"));
    }

    #[tokio::test]
    async fn save_load_invalidate() {
        let store = MemorySessionStore::new();
        let key = SessionKey::generate();
        let expires = Utc::now() + Duration::minutes(5);

        store.save(&key, "blob".into(), expires).await.unwrap();
        assert_eq!(store.load(&key).await.unwrap().as_deref(), Some("blob"));

        store.invalidate(&key).await.unwrap();
        assert_eq!(store.load(&key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn channels_are_isolated() {
        let store = MemorySessionStore::new();
        let a = SessionKey::generate();
        let b = SessionKey::generate();
        let expires = Utc::now() + Duration::minutes(5);

        store.save(&a, "a".into(), expires).await.unwrap();
        store.save(&b, "b".into(), expires).await.unwrap();
        store.invalidate(&a).await.unwrap();

        assert_eq!(store.load(&a).await.unwrap(), None);
        assert_eq!(store.load(&b).await.unwrap().as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn purge_drops_only_old_sessions() {
        let store = MemorySessionStore::new();
        let now = Utc::now();
        let old = SessionKey::generate();
        let fresh = SessionKey::generate();

        store.save(&old, "old".into(), now - Duration::hours(3)).await.unwrap();
        store.save(&fresh, "fresh".into(), now + Duration::minutes(5)).await.unwrap();
        store.purge_expired(now);

        assert_eq!(store.len(), 1);
        assert!(store.load(&fresh).await.unwrap().is_some());
    }
}
