//! Local control API, used by the editor extension and the CLI

pub mod identity;
pub mod network;
pub mod teams;

use axum::{
    routing::{get, post},
    Router,
};

use super::state::AppState;

/// Routes served under `/api`
pub fn create_local_router() -> Router<AppState> {
    Router::new()
        .route(
            "/identity",
            get(identity::get_identity).post(identity::create_identity),
        )
        .route("/network/interfaces", get(network::list_network_interfaces))
        .route(
            "/network/config",
            get(network::get_network_config).put(network::set_network_config),
        )
        .route("/teams", get(teams::list_teams).post(teams::create_team))
        .route("/teams/join", post(teams::join_team))
        .route("/teams/leave", post(teams::leave_team))
        .route("/teams/dissolve", post(teams::dissolve_team))
        .route("/teams/discover", post(teams::discover_teams))
        .route("/teams/{team_id}/members", get(teams::list_members))
}
