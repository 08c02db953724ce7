//! Authentication service: credential checks, registration and session
//! issue/revoke, delegating to `spaceit_core::auth`.

use chrono::Duration;
use tracing::{debug, info};

use spaceit_core::auth::credentials::{check_secret, parse_basic_header};
use spaceit_core::auth::password::hash_password;
use spaceit_core::auth::session::SessionKey;
use spaceit_core::auth::token::{IssuedToken, TokenService};
use spaceit_core::models::auth::User;
use spaceit_core::store::{Store, StoreError};

use crate::error::{AppError, AppResult};

/// Minimum accepted password length.
pub const MIN_PASSWORD_LEN: usize = 8;

// ---------------------------------------------------------------------------
// Credential path
// ---------------------------------------------------------------------------

/// Resolve a `Basic` authorization header to a user.
///
/// A malformed header is an error. An unknown identifier or a wrong secret
/// resolves to `None` so the request continues anonymously.
pub async fn resolve_basic(store: &dyn Store, header: &str) -> AppResult<Option<User>> {
    let credentials = parse_basic_header(header)?;

    let user = match store.find_user_by_email(&credentials.identifier).await {
        Ok(user) => user,
        Err(StoreError::NotFound) => {
            debug!("basic credentials name an unknown user");
            return Ok(None);
        }
        Err(e) => return Err(AppError::Internal(format!("user lookup: {e}"))),
    };

    if !check_secret(&credentials, &user)? {
        debug!(user_id = %user.id, "basic credentials rejected");
        return Ok(None);
    }

    Ok(Some(user))
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

/// Create a user account. Fails with 409 if the email is taken.
pub async fn register(store: &dyn Store, email: &str, password: &str) -> AppResult<User> {
    let email = email.trim();
    validate_email(email)?;
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::MalformedInput(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let hash = hash_password(password)?;
    let user = match store.create_user(email, &hash).await {
        Ok(user) => user,
        Err(StoreError::Conflict(_)) => {
            return Err(AppError::Conflict("email already registered".into()));
        }
        Err(e) => return Err(e.into()),
    };

    info!(user_id = %user.id, "user registered");
    Ok(user)
}

fn validate_email(email: &str) -> AppResult<()> {
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && !domain.is_empty());
    if valid && !email.contains(char::is_whitespace) {
        Ok(())
    } else {
        Err(AppError::MalformedInput("invalid email address".into()))
    }
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

/// Start a session for `user`, replacing whatever session `channel` named.
pub async fn login(
    tokens: &TokenService,
    channel: Option<&SessionKey>,
    user: User,
    ttl: Duration,
) -> AppResult<IssuedToken> {
    let user_id = user.id;
    let issued = tokens.create_token(channel, user, ttl).await?;
    info!(%user_id, expires_at = %issued.expires_at, "session started");
    Ok(issued)
}

/// End the session `channel` names, if any.
pub async fn logout(tokens: &TokenService, channel: Option<&SessionKey>) -> AppResult<()> {
    if let Some(key) = channel {
        tokens.revoke(key).await?;
        debug!("session revoked");
    }
    Ok(())
}
