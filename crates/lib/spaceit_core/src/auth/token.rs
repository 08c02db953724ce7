//! Opaque session tokens.
//!
//! A token is `base64(sha256(session_id))`. The session id itself only lives
//! in server-side session state, so the token carries nothing recoverable and
//! dies with its session. Verification recomputes the digest from the stored
//! session and compares in constant time.

use std::collections::HashMap;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use rand::{Rng, rng};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::debug;

use super::session::{SessionKey, SessionStore, SessionStoreError};
use crate::models::auth::{SessionPayload, User};

/// Token verification and issuance errors.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token is invalid")]
    InvalidToken,

    #[error("token has expired")]
    ExpiredToken,

    #[error("token lifetime must be positive")]
    InvalidTtl,

    #[error(transparent)]
    Store(#[from] SessionStoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// A freshly issued token together with the session cookie it is bound to.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// Value handed to the client (`X-CSRF-Token`).
    pub token: String,
    /// New channel key; replaces the client's session cookie.
    pub session_key: SessionKey,
    pub expires_at: DateTime<Utc>,
}

/// Issues and verifies opaque tokens against a [`SessionStore`].
#[derive(Clone)]
pub struct TokenService {
    sessions: Arc<dyn SessionStore>,
}

impl TokenService {
    pub fn new(sessions: Arc<dyn SessionStore>) -> Self {
        Self { sessions }
    }

    /// Create a session for `user` and return its opaque token.
    ///
    /// Any session the channel currently names is invalidated first, so a
    /// pre-set cookie can never be promoted into an authenticated session.
    pub async fn create_token(
        &self,
        channel: Option<&SessionKey>,
        user: User,
        ttl: Duration,
    ) -> Result<IssuedToken, TokenError> {
        self.create_token_at(channel, user, ttl, Utc::now()).await
    }

    /// [`create_token`](Self::create_token) with an explicit clock reading.
    pub async fn create_token_at(
        &self,
        channel: Option<&SessionKey>,
        user: User,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        if ttl <= Duration::zero() {
            return Err(TokenError::InvalidTtl);
        }
        let expires_at = now.checked_add_signed(ttl).ok_or(TokenError::InvalidTtl)?;

        if let Some(old) = channel {
            self.sessions.invalidate(old).await?;
        }

        let payload = SessionPayload {
            session_id: generate_session_id(),
            user,
            attributes: HashMap::new(),
            issued_at: now,
            expires_at,
        };
        let blob = serde_json::to_string(&payload)
            .map_err(|e| TokenError::Internal(format!("session encode: {e}")))?;

        let session_key = SessionKey::generate();
        self.sessions
            .save(&session_key, blob, payload.expires_at)
            .await?;

        debug!(user_id = %payload.user.id, expires_at = %payload.expires_at, "session created");

        Ok(IssuedToken {
            token: token_for_session(&payload.session_id),
            session_key,
            expires_at: payload.expires_at,
        })
    }

    /// Verify `token` against the session named by `channel`.
    pub async fn verify_token(
        &self,
        channel: Option<&SessionKey>,
        token: &str,
    ) -> Result<SessionPayload, TokenError> {
        self.verify_token_at(channel, token, Utc::now()).await
    }

    /// [`verify_token`](Self::verify_token) with an explicit clock reading.
    pub async fn verify_token_at(
        &self,
        channel: Option<&SessionKey>,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<SessionPayload, TokenError> {
        let key = channel.ok_or(TokenError::InvalidToken)?;
        let blob = self
            .sessions
            .load(key)
            .await?
            .ok_or(TokenError::InvalidToken)?;

        let payload: SessionPayload =
            serde_json::from_str(&blob).map_err(|_| TokenError::InvalidToken)?;

        let provided = STANDARD
            .decode(token.trim())
            .map_err(|_| TokenError::InvalidToken)?;
        let computed = digest_session_id(&payload.session_id);

        if !bool::from(computed.as_slice().ct_eq(provided.as_slice())) {
            return Err(TokenError::InvalidToken);
        }

        if !payload.is_valid_at(now) {
            return Err(TokenError::ExpiredToken);
        }

        Ok(payload)
    }

    /// Invalidate the session named by `channel` (logout).
    pub async fn revoke(&self, channel: &SessionKey) -> Result<(), TokenError> {
        self.sessions.invalidate(channel).await?;
        Ok(())
    }
}

/// Client-facing token for a session id.
pub fn token_for_session(session_id: &str) -> String {
    STANDARD.encode(digest_session_id(session_id))
}

fn digest_session_id(session_id: &str) -> [u8; 32] {
    Sha256::digest(session_id.as_bytes()).into()
}

/// 256 random bits, base64url.
fn generate_session_id() -> String {
    let mut bytes = [0u8; 32];
    rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
