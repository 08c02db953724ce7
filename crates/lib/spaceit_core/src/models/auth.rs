//! Authentication domain models.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Authenticated principal.
///
/// The password hash never leaves the process: it is skipped when the user is
/// serialized into a session blob and restored as an empty string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Server-side session state behind an opaque token.
///
/// Invariant: `expires_at > issued_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPayload {
    /// Random session identifier (256 bits, base64url). Never sent to the client.
    pub session_id: String,
    pub user: User,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionPayload {
    /// A payload is valid strictly before its expiry.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}
