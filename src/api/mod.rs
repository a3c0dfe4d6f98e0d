// HTTP, WebSocket and SSE endpoints

pub mod health;
pub mod sse;
pub mod states;
pub mod websocket;

pub use health::create_health_router;
pub use sse::create_sse_router;
pub use states::create_states_router;
pub use websocket::{create_ws_router, ws_handler};

use crate::state::StateStore;
use crate::subscription::StateBroadcaster;
use crate::upstream::StateSource;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Shared application state for every router
pub struct AppState {
    /// Head of the store chain (snapshot reads)
    pub store: Arc<dyn StateStore>,
    /// Live record fan-out
    pub broadcaster: Arc<StateBroadcaster>,
    /// Upstream source (health checks)
    pub source: Arc<dyn StateSource>,
}

/// Assemble every endpoint into one router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(create_health_router(Arc::clone(&state)))
        .merge(create_states_router(Arc::clone(&state)))
        .merge(create_ws_router(Arc::clone(&state)))
        .merge(create_sse_router(state))
        .layer(CorsLayer::permissive())
}
