//! Identity resolver and the `require_auth` gate.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use tracing::debug;

use spaceit_core::auth::credentials::is_basic_scheme;
use spaceit_core::auth::token::TokenError;
use spaceit_core::uuid::correlation_id;

use crate::AppState;
use crate::context::RequestContext;
use crate::error::AppError;
use crate::services::{auth, cookies};

/// Header carrying the session token.
pub const TOKEN_HEADER: &str = "x-csrf-token";

/// Axum middleware: resolve who is calling and insert a [`RequestContext`].
///
/// Basic credentials are checked first, then the session token. When both
/// resolve, the token identity wins. Failing credentials or a bad token
/// leave the request anonymous; a malformed `Basic` header is a 400.
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let session_key = cookies::session_key_from_headers(request.headers());
    let mut ctx = RequestContext::anonymous(correlation_id(), session_key);

    if let Some(value) = request.headers().get(AUTHORIZATION) {
        let header = value
            .to_str()
            .map_err(|_| AppError::MalformedInput("authorization header is not valid text".into()))?;
        if is_basic_scheme(header) {
            ctx.identity = auth::resolve_basic(state.store.as_ref(), header).await?;
        }
    }

    let token = request
        .headers()
        .get(TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|t| !t.is_empty());
    if let Some(token) = token {
        match state.tokens.verify_token(ctx.session_key.as_ref(), token).await {
            Ok(payload) => ctx.identity = Some(payload.user),
            Err(e @ (TokenError::InvalidToken | TokenError::ExpiredToken)) => {
                debug!(error = %e, "session token ignored");
            }
            Err(e) => return Err(e.into()),
        }
    }

    debug!(
        request_id = %ctx.request_id,
        user_id = ?ctx.identity.as_ref().map(|u| u.id),
        "identity resolved"
    );
    request.extensions_mut().insert(ctx);

    Ok(next.run(request).await)
}

/// Axum middleware: 401 unless the identity resolver found a principal.
pub async fn require_auth(request: Request, next: Next) -> Result<Response, AppError> {
    let authenticated = request
        .extensions()
        .get::<RequestContext>()
        .is_some_and(RequestContext::is_authenticated);
    if !authenticated {
        return Err(AppError::Unauthenticated("who are you?".into()));
    }
    Ok(next.run(request).await)
}
