//! Space access checks.
//!
//! Each check reads the `space_id` path parameter, loads the caller's
//! permission record for that space and compares it with the level the
//! route needs. Missing grants are 403; a failed lookup is 500, so a caller
//! can tell the two apart.

use axum::{
    extract::{RawPathParams, Request, State},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};
use uuid::Uuid;

use spaceit_core::access::{AccessDecision, AccessLevel, evaluate, evaluate_method};
use spaceit_core::models::spaces::PermissionRecord;
use spaceit_core::store::StoreError;

use crate::AppState;
use crate::context::RequestContext;
use crate::error::{AppError, AppResult};
use crate::routes::SPACE_ID_PARAM;

pub async fn require_write(
    State(state): State<AppState>,
    params: RawPathParams,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    require_level(AccessLevel::Write, &state, &params, request, next).await
}

/// Admin means read, write and delete all granted.
pub async fn require_admin(
    State(state): State<AppState>,
    params: RawPathParams,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    require_level(AccessLevel::Admin, &state, &params, request, next).await
}

/// Level picked from the HTTP method: GET and HEAD read, POST writes,
/// DELETE deletes.
///
/// Any other method is denied.
pub async fn require_space_permission(
    State(state): State<AppState>,
    params: RawPathParams,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (user_id, space_id) = target(&params, &request)?;
    let record = load_permission(&state, user_id, space_id).await?;
    enforce(evaluate_method(record.as_ref(), request.method()))?;
    Ok(next.run(request).await)
}

async fn require_level(
    level: AccessLevel,
    state: &AppState,
    params: &RawPathParams,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (user_id, space_id) = target(params, &request)?;
    let record = load_permission(state, user_id, space_id).await?;
    enforce(evaluate(record.as_ref(), level))?;
    Ok(next.run(request).await)
}

/// Caller and space the check applies to.
fn target(params: &RawPathParams, request: &Request) -> AppResult<(Uuid, Uuid)> {
    let user_id = request
        .extensions()
        .get::<RequestContext>()
        .and_then(|ctx| ctx.identity.as_ref())
        .map(|user| user.id)
        .ok_or_else(|| AppError::Internal("access check reached without an identity".into()))?;
    Ok((user_id, space_id(params)?))
}

async fn load_permission(
    state: &AppState,
    user_id: Uuid,
    space_id: Uuid,
) -> AppResult<Option<PermissionRecord>> {
    match state.store.find_permission(user_id, space_id).await {
        Ok(record) => Ok(Some(record)),
        Err(StoreError::NotFound) => Ok(None),
        Err(e) => {
            warn!(%user_id, %space_id, error = %e, "permission lookup failed");
            Err(AppError::Internal(format!("permission lookup: {e}")))
        }
    }
}

fn space_id(params: &RawPathParams) -> AppResult<Uuid> {
    let raw = params
        .iter()
        .find(|(name, _)| *name == SPACE_ID_PARAM)
        .map(|(_, value)| value)
        .ok_or_else(|| AppError::Internal("route has no space_id parameter".into()))?;
    raw.parse()
        .map_err(|_| AppError::Internal(format!("invalid space id: {raw}")))
}

fn enforce(decision: AccessDecision) -> AppResult<()> {
    match decision {
        AccessDecision::Allow => Ok(()),
        AccessDecision::Deny(reason) => {
            debug!(%reason, "access denied");
            Err(AppError::Forbidden(reason.to_string()))
        }
    }
}
