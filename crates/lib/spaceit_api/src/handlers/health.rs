//! Liveness endpoint.

use axum::Json;

use crate::models::HealthResponse;

/// `GET /api/v1/health`
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: spaceit_core::version().to_string(),
    })
}
