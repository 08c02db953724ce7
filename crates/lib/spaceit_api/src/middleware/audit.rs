//! Audit logger.
//!
//! A request log row is written before the handler runs; if that write
//! fails the request is rejected with 500. The matching response log row is
//! written after the handler with the final status. That second write never
//! changes what the client sees: failures are only logged.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};
use uuid::Uuid;

use spaceit_core::models::audit::NewRequestLog;
use spaceit_core::store::Store;

use crate::AppState;
use crate::context::RequestContext;
use crate::error::AppError;

/// Status recorded when the client goes away before a response is produced.
pub const CLIENT_CLOSED_REQUEST: i32 = 499;

/// Axum middleware: bracket the rest of the pipeline with audit rows.
pub async fn audit_logger(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let ctx = request
        .extensions()
        .get::<RequestContext>()
        .ok_or_else(|| AppError::Internal("request context missing".into()))?;
    let entry = NewRequestLog {
        id: ctx.request_id,
        method: request.method().to_string(),
        path: request.uri().path().to_string(),
        user_id: ctx.identity.as_ref().map(|u| u.id),
    };

    let correlation_id = state.store.create_request_log(&entry).await.map_err(|e| {
        error!(request_id = %entry.id, error = %e, "request log write failed");
        AppError::Internal(format!("request log write: {e}"))
    })?;

    let mut guard = ResponseLog::new(state.store.clone(), correlation_id);
    let response = next.run(request).await;
    guard.record(response.status()).await;

    Ok(response)
}

/// Pending response log write for one request.
///
/// Exactly one write is started per guard. It runs on its own task, so
/// dropping the request future neither cancels it nor starts a second one.
/// A guard dropped before [`ResponseLog::record`] writes 499.
struct ResponseLog {
    store: Arc<dyn Store>,
    id: Uuid,
    status: Option<StatusCode>,
    started: bool,
}

impl ResponseLog {
    fn new(store: Arc<dyn Store>, id: Uuid) -> Self {
        Self {
            store,
            id,
            status: None,
            started: false,
        }
    }

    async fn record(&mut self, status: StatusCode) {
        self.status = Some(status);
        let Some(write) = self.start(i32::from(status.as_u16())) else {
            return;
        };
        if let Err(e) = write.await {
            error!(correlation_id = %self.id, error = %e, "response log task failed");
        }
    }

    /// Hand the write to a detached task. `None` if a write was already
    /// started or there is no runtime.
    fn start(&mut self, status: i32) -> Option<JoinHandle<()>> {
        if self.started {
            return None;
        }
        self.started = true;
        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!(correlation_id = %self.id, status, "no runtime to write response log");
                return None;
            }
        };
        let store = self.store.clone();
        let id = self.id;
        Some(handle.spawn(async move {
            write_response_log(store.as_ref(), id, status).await;
        }))
    }
}

impl Drop for ResponseLog {
    fn drop(&mut self) {
        if self.started {
            return;
        }
        let status = self
            .status
            .map_or(CLIENT_CLOSED_REQUEST, |s| i32::from(s.as_u16()));
        debug!(correlation_id = %self.id, status, "request dropped, finishing audit in background");
        self.start(status);
    }
}

async fn write_response_log(store: &dyn Store, id: Uuid, status: i32) {
    if let Err(e) = store.create_response_log(id, status).await {
        error!(correlation_id = %id, status, error = %e, "response log write failed");
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::Router;
    use axum::body::Body;
    use axum::http::Request as HttpRequest;
    use axum::middleware::from_fn_with_state;
    use axum::routing::get;
    use spaceit_core::auth::session::MemorySessionStore;
    use spaceit_core::store::AuditStore;
    use spaceit_core::store::memory::MemoryStore;
    use tower::ServiceExt;
    use tower_http::catch_panic::CatchPanicLayer;

    use super::*;
    use crate::config::ApiConfig;

    fn state(store: &Arc<MemoryStore>) -> AppState {
        AppState::new(
            store.clone(),
            Arc::new(MemorySessionStore::new()),
            ApiConfig::default(),
        )
    }

    async fn boom() -> StatusCode {
        panic!("handler blew up")
    }

    /// Audit around catch-panic, the same nesting the full router uses.
    fn app(state: AppState) -> Router {
        Router::new()
            .route("/boom", get(boom))
            .route("/hang", get(|| std::future::pending::<StatusCode>()))
            .layer(CatchPanicLayer::custom(crate::panic_response))
            .layer(from_fn_with_state(state.clone(), audit_logger))
            .with_state(state)
    }

    fn request(uri: &str) -> HttpRequest<Body> {
        HttpRequest::builder()
            .uri(uri)
            .extension(RequestContext::anonymous(Uuid::now_v7(), None))
            .body(Body::empty())
            .unwrap()
    }

    async fn response_statuses(store: &MemoryStore) -> Vec<i32> {
        store.response_logs().await.into_iter().map(|r| r.status).collect()
    }

    #[tokio::test]
    async fn panicking_handler_is_audited_as_500() {
        let store = Arc::new(MemoryStore::new());
        let response = app(state(&store)).oneshot(request("/boom")).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let requests = store.request_logs().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].path, "/boom");
        let responses = store.response_logs().await;
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].id, requests[0].id);
        assert_eq!(responses[0].status, 500);
    }

    #[tokio::test]
    async fn dropped_request_is_audited_as_client_closed() {
        let store = Arc::new(MemoryStore::new());
        let pending = app(state(&store)).oneshot(request("/hang"));
        let outcome = tokio::time::timeout(Duration::from_millis(20), pending).await;
        assert!(outcome.is_err(), "handler should still be running");
        assert_eq!(store.request_logs().await.len(), 1);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(response_statuses(&store).await, vec![CLIENT_CLOSED_REQUEST]);
    }

    #[tokio::test]
    async fn drop_during_record_writes_once() {
        let store = Arc::new(MemoryStore::new());
        let entry = NewRequestLog {
            id: Uuid::now_v7(),
            method: "GET".into(),
            path: "/spaces".into(),
            user_id: None,
        };
        let id = store.create_request_log(&entry).await.unwrap();

        let mut guard = ResponseLog::new(store.clone(), id);
        // One poll starts the write, then the record future is dropped.
        let _ = tokio::time::timeout(Duration::ZERO, guard.record(StatusCode::OK)).await;
        drop(guard);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(response_statuses(&store).await, vec![200]);
    }
}
