//! Rate gate: rejects requests once the shared token bucket is empty.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::AppState;
use crate::error::AppError;

/// Axum middleware: one token per request, 429 when none is left.
pub async fn rate_guard(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !state.rate_gate.allow() {
        warn!(method = %request.method(), path = %request.uri().path(), "rate limit exceeded");
        return Err(AppError::RateLimited);
    }
    Ok(next.run(request).await)
}
