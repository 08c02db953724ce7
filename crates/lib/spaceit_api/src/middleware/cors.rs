//! Origin filter.
//!
//! Preflights from an allowed origin are answered here with 204 and the
//! allow-lists; preflights from any other origin get 403 and never reach
//! later stages. Simple requests always continue, but only allowed origins
//! get `Access-Control-Allow-*` headers on the way out.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, Method, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::AppState;
use crate::error::AppError;

pub const ALLOWED_METHODS: &str = "GET, POST, PATCH, DELETE";
pub const ALLOWED_HEADERS: &str = "Content-Type, X-CSRF-Token, Authorization";
/// Preflight cache lifetime in seconds.
pub const MAX_AGE_SECS: &str = "600";

/// Axum middleware: apply the CORS allow-list.
pub async fn origin_filter(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let origin = request.headers().get(header::ORIGIN).cloned();
    let allowed = origin
        .as_ref()
        .and_then(|v| v.to_str().ok())
        .is_some_and(|o| state.config.is_origin_allowed(o));

    if is_preflight(&request) {
        let Some(origin) = origin.filter(|_| allowed) else {
            debug!(origin = ?request.headers().get(header::ORIGIN), "preflight from disallowed origin");
            return AppError::Forbidden("origin not allowed".into()).into_response();
        };
        let mut response = StatusCode::NO_CONTENT.into_response();
        let headers = response.headers_mut();
        allow_origin(headers, origin);
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOWED_HEADERS),
        );
        headers.insert(
            header::ACCESS_CONTROL_MAX_AGE,
            HeaderValue::from_static(MAX_AGE_SECS),
        );
        return response;
    }

    let mut response = next.run(request).await;
    match origin {
        Some(origin) if allowed => allow_origin(response.headers_mut(), origin),
        _ => {
            response
                .headers_mut()
                .append(header::VARY, HeaderValue::from_static("Origin"));
        }
    }
    response
}

fn allow_origin(headers: &mut HeaderMap, origin: HeaderValue) {
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static("true"),
    );
    headers.append(header::VARY, HeaderValue::from_static("Origin"));
}

/// An `OPTIONS` request announcing the method it wants to send.
fn is_preflight(request: &Request) -> bool {
    request.method() == Method::OPTIONS
        && request
            .headers()
            .contains_key(header::ACCESS_CONTROL_REQUEST_METHOD)
}
