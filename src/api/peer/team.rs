//! Leader-side request/response endpoints

use axum::extract::{Path, State};
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::{ok, ApiResult, Empty, Json};
use crate::domain::membership::{JoinResult, LeaveRequest, TeamInfo};
use crate::domain::team::{JoinRequest, MembershipSnapshot};
use crate::infrastructure::membership::parse_team_id;

/// GET /team/info
pub async fn led_team_info(State(state): State<AppState>) -> ApiResult<TeamInfo> {
    Ok(ok(state.membership_service.team_info(None)?))
}

/// GET /team/{team_id}/info
pub async fn team_info(
    State(state): State<AppState>,
    Path(team_id): Path<String>,
) -> ApiResult<TeamInfo> {
    let team_id = parse_team_id(&team_id)?;
    Ok(ok(state.membership_service.team_info(Some(&team_id))?))
}

/// POST /team/{team_id}/join
pub async fn join(
    State(state): State<AppState>,
    Path(team_id): Path<String>,
    Json(request): Json<JoinRequest>,
) -> ApiResult<JoinResult> {
    let team_id = parse_team_id(&team_id)?;
    debug!(team_id = %team_id, node_id = %request.node_id, "Peer join");

    let result = state
        .membership_service
        .accept_join(&team_id, &request)
        .await?;

    Ok(ok(result))
}

/// POST /team/{team_id}/leave
pub async fn leave(
    State(state): State<AppState>,
    Path(team_id): Path<String>,
    Json(request): Json<LeaveRequest>,
) -> ApiResult<Empty> {
    let team_id = parse_team_id(&team_id)?;
    debug!(team_id = %team_id, node_id = %request.node_id, "Peer leave");

    state
        .membership_service
        .accept_leave(&team_id, &request.node_id)
        .await?;

    Ok(ok(Empty::default()))
}

/// GET /team/{team_id}/members
pub async fn members(
    State(state): State<AppState>,
    Path(team_id): Path<String>,
) -> ApiResult<MembershipSnapshot> {
    let team_id = parse_team_id(&team_id)?;
    Ok(ok(state.membership_service.members(&team_id)?))
}
