//! Per-request context.
//!
//! The identity resolver inserts one [`RequestContext`] into the request
//! extensions; every later stage and handler reads it through the typed
//! extractors below instead of looking anything up by string key.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use spaceit_core::auth::session::SessionKey;
use spaceit_core::models::auth::User;

use crate::error::AppError;

/// Identity and correlation data for one request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Correlation id; also keys the request's audit rows.
    pub request_id: Uuid,
    /// Resolved principal. `None` means anonymous.
    pub identity: Option<User>,
    /// Session cookie presented by the client, if any.
    pub session_key: Option<SessionKey>,
}

impl RequestContext {
    pub fn anonymous(request_id: Uuid, session_key: Option<SessionKey>) -> Self {
        Self {
            request_id,
            identity: None,
            session_key,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .ok_or_else(|| AppError::Internal("request context missing".into()))
    }
}

/// Extractor for handlers behind `require_auth`.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let ctx = RequestContext::from_request_parts(parts, state).await?;
        ctx.identity
            .map(AuthenticatedUser)
            .ok_or_else(|| AppError::Unauthenticated("who are you?".into()))
    }
}
