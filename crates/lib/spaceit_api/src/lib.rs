//! # spaceit_api
//!
//! HTTP API library for Space-It.
//!
//! Every request runs through the same pipeline, outermost first:
//!
//! 1. rate gate ([`middleware::rate`])
//! 2. origin filter, which answers preflights itself ([`middleware::cors`])
//! 3. identity resolver ([`middleware::auth::authenticate`])
//! 4. audit logger ([`middleware::audit`])
//! 5. JSON content-type guard ([`middleware::content_type`])
//! 6. route layers: `require_auth`, then the space access checks ([`middleware::access`])
//! 7. the handler

pub mod config;
pub mod context;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::any::Any;
use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderValue, header};
use axum::middleware::{from_fn, from_fn_with_state};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use sqlx::PgPool;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use spaceit_core::auth::session::SessionStore;
use spaceit_core::auth::token::TokenService;
use spaceit_core::rate::RateGate;
use spaceit_core::store::Store;

use crate::config::ApiConfig;
use crate::error::AppError;
use crate::handlers::{health, spaces, users};
use crate::middleware::{access, audit, auth, content_type, cors, rate};

/// Shared application state passed to all handlers and middleware.
#[derive(Clone)]
pub struct AppState {
    /// Users, spaces, permissions and the audit trail.
    pub store: Arc<dyn Store>,
    /// Issues and verifies session tokens.
    pub tokens: TokenService,
    /// Process-wide token bucket.
    pub rate_gate: Arc<RateGate>,
    /// API configuration.
    pub config: ApiConfig,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, sessions: Arc<dyn SessionStore>, config: ApiConfig) -> Self {
        Self {
            store,
            tokens: TokenService::new(sessions),
            rate_gate: Arc::new(RateGate::new(config.rate_limit)),
            config,
        }
    }
}

/// Run embedded database migrations.
///
/// Delegates to `spaceit_core::migrate::migrate()` which owns the migration files.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    spaceit_core::migrate::migrate(pool).await
}

/// Builds the Axum router with all routes, the request pipeline and shared state.
pub fn router(state: AppState) -> Router {
    // Public routes (identity optional)
    let public = Router::new()
        .route(routes::HEALTH, get(health::health_handler))
        .route(routes::USERS, post(users::register_handler));

    // Space routes keyed by id; each method carries its own access level.
    let space_by_id = Router::new()
        .route(
            routes::SPACE,
            get(spaces::get_space_handler)
                .delete(spaces::delete_space_handler)
                .route_layer(from_fn_with_state(
                    state.clone(),
                    access::require_space_permission,
                )),
        )
        .route(
            routes::SPACE,
            patch(spaces::rename_space_handler)
                .route_layer(from_fn_with_state(state.clone(), access::require_write)),
        )
        .route(
            routes::SPACE_MEMBERS,
            post(spaces::add_member_handler)
                .route_layer(from_fn_with_state(state.clone(), access::require_admin)),
        );

    // Protected routes (require an identity)
    let protected = Router::new()
        .route(
            routes::SESSIONS,
            post(users::login_handler).delete(users::logout_handler),
        )
        .route(
            routes::SPACES,
            post(spaces::create_space_handler).get(spaces::list_spaces_handler),
        )
        .merge(space_by_id)
        .route_layer(from_fn(auth::require_auth));

    let api = Router::new().merge(public).merge(protected);

    // Layers wrap outward: the last one added runs first.
    Router::new()
        .nest(routes::API_PREFIX, api)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(from_fn(content_type::ensure_json))
        .layer(from_fn_with_state(state.clone(), audit::audit_logger))
        .layer(from_fn_with_state(state.clone(), auth::authenticate))
        .layer(from_fn_with_state(state.clone(), cors::origin_filter))
        .layer(from_fn_with_state(state.clone(), rate::rate_guard))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_XSS_PROTECTION,
            HeaderValue::from_static("0"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn panic_response(_panic: Box<dyn Any + Send + 'static>) -> Response {
    AppError::Internal("handler panicked".into()).into_response()
}
