//! Peer API: the surface a leader exposes to other nodes

pub mod team;
pub mod ws;

use axum::{
    routing::{get, post},
    Router,
};

use super::state::AppState;

/// Routes served under `/team`
pub fn create_peer_router() -> Router<AppState> {
    Router::new()
        .route("/info", get(team::led_team_info))
        .route("/{team_id}/info", get(team::team_info))
        .route("/{team_id}/join", post(team::join))
        .route("/{team_id}/leave", post(team::leave))
        .route("/{team_id}/members", get(team::members))
        .route("/{team_id}/ws", get(ws::push_channel))
}
