//! Application error types.
//!
//! Every pipeline stage reports failure as an [`AppError`], which renders as
//! a status code plus a `{"error", "message"}` body. Internal failures are
//! logged with their detail and rendered with a generic message.

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::{HeaderValue, StatusCode, header::WWW_AUTHENTICATE},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use spaceit_core::auth::AuthError;
use spaceit_core::auth::token::TokenError;
use spaceit_core::store::StoreError;

/// Challenge sent with every 401.
pub const BASIC_CHALLENGE: &str = "Basic realm=\"/\", charset=\"UTF-8\"";

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Error body returned by every failing request.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Too many requests")]
    RateLimited,

    #[error("Internal server error")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MalformedInput(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error, message) = match &self {
            AppError::MalformedInput(m) => ("malformed_input", m.as_str()),
            AppError::Unauthenticated(m) => ("unauthenticated", m.as_str()),
            AppError::Forbidden(m) => ("forbidden", m.as_str()),
            AppError::NotFound(m) => ("not_found", m.as_str()),
            AppError::Conflict(m) => ("conflict", m.as_str()),
            AppError::UnsupportedMediaType(m) => ("unsupported_media_type", m.as_str()),
            AppError::RateLimited => ("rate_limited", "too many requests"),
            AppError::Internal(detail) => {
                error!(%detail, "internal error");
                ("internal_error", "internal server error")
            }
        };
        let body = Json(ErrorResponse {
            error: error.to_string(),
            message: message.to_string(),
        });
        let mut response = (status, body).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static(BASIC_CHALLENGE));
        }
        response
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => AppError::NotFound("record not found".into()),
            StoreError::Conflict(_) => AppError::Conflict("resource already exists".into()),
            StoreError::Db(e) => AppError::Internal(e.to_string()),
            StoreError::Unavailable(msg) => AppError::Internal(msg),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::MalformedCredentials(msg) => AppError::MalformedInput(msg),
            AuthError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<TokenError> for AppError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::InvalidToken | TokenError::ExpiredToken => {
                AppError::Unauthenticated(e.to_string())
            }
            TokenError::InvalidTtl => AppError::Internal(e.to_string()),
            TokenError::Store(inner) => AppError::Internal(inner.to_string()),
            TokenError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        match &rejection {
            JsonRejection::MissingJsonContentType(_) => {
                AppError::UnsupportedMediaType(rejection.body_text())
            }
            _ => AppError::MalformedInput(rejection.body_text()),
        }
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::MalformedInput(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn internal_detail_is_not_leaked() {
        let response = AppError::Internal("connection refused at 10.0.0.3:5432".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["error"], "internal_error");
        assert_eq!(json["message"], "internal server error");
    }

    #[tokio::test]
    async fn unauthenticated_carries_challenge() {
        let response = AppError::Unauthenticated("who are you?".into()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(WWW_AUTHENTICATE).unwrap(),
            BASIC_CHALLENGE
        );
    }

    #[test]
    fn store_errors_map_to_taxonomy() {
        assert_eq!(AppError::from(StoreError::NotFound).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::from(StoreError::Conflict("users_email_key".into())).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::from(StoreError::Unavailable("down".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn auth_errors_map_to_taxonomy() {
        assert_eq!(
            AppError::from(AuthError::MalformedCredentials("no colon".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(AuthError::Internal("bcrypt".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn token_errors_map_to_taxonomy() {
        assert_eq!(
            AppError::from(TokenError::ExpiredToken).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::from(TokenError::InvalidTtl).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
