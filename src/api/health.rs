use crate::api::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::sync::Arc;
use tracing::warn;

/// Create liveness router
pub fn create_health_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .with_state(state)
}

/// GET /health - Re-checks that Home Assistant answers
///
/// 200 "ok" when the upstream ping succeeds, 424 with the error text otherwise.
async fn health(State(state): State<Arc<AppState>>) -> Response {
    match state.source.ping().await {
        Ok(()) => (StatusCode::OK, "ok").into_response(),
        Err(e) => {
            warn!(error = %e, "Health check failed");
            (StatusCode::FAILED_DEPENDENCY, format!("{:#}", e)).into_response()
        }
    }
}
