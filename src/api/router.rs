use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use super::health;
use super::local;
use super::peer;
use super::state::AppState;

/// Create the full router with application state
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::ready_check))
        // Control API for the local UI and CLI
        .nest("/api", local::create_local_router())
        // Leader surface for other nodes
        .nest("/team", peer::create_peer_router())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
