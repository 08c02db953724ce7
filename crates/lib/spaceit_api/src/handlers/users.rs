//! Registration and session handlers.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum_extra::extract::cookie::CookieJar;

use crate::AppState;
use crate::context::{AuthenticatedUser, RequestContext};
use crate::error::AppResult;
use crate::models::{RegisterRequest, TokenResponse, UserResponse};
use crate::services::{auth, cookies};

/// `POST /users`: create an account.
pub async fn register_handler(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    let Json(body) = payload?;
    let user = auth::register(state.store.as_ref(), &body.email, &body.password).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// `POST /sessions`: exchange the current identity for a session token.
///
/// The session key is set as a cookie; the token must accompany it in
/// `X-CSRF-Token` on later requests.
pub async fn login_handler(
    State(state): State<AppState>,
    ctx: RequestContext,
    AuthenticatedUser(user): AuthenticatedUser,
    jar: CookieJar,
) -> AppResult<(StatusCode, CookieJar, Json<TokenResponse>)> {
    let issued = auth::login(
        &state.tokens,
        ctx.session_key.as_ref(),
        user,
        state.config.session_ttl(),
    )
    .await?;

    let jar = jar.add(cookies::session_cookie(
        &issued.session_key,
        state.config.session_ttl_secs,
        state.config.cookie_secure,
    ));
    Ok((
        StatusCode::CREATED,
        jar,
        Json(TokenResponse {
            token: issued.token,
            expires_at: issued.expires_at,
        }),
    ))
}

/// `DELETE /sessions`: end the current session and clear its cookie.
pub async fn logout_handler(
    State(state): State<AppState>,
    ctx: RequestContext,
    jar: CookieJar,
) -> AppResult<(StatusCode, CookieJar)> {
    auth::logout(&state.tokens, ctx.session_key.as_ref()).await?;
    let jar = jar.add(cookies::clear_session_cookie(state.config.cookie_secure));
    Ok((StatusCode::NO_CONTENT, jar))
}
