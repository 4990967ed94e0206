//! Local team endpoints: create, join, leave, dissolve, discover

use std::time::Duration;

use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::{ok, ApiResult, Empty, Json};
use crate::domain::discovery::DiscoveredTeam;
use crate::domain::team::{Member, Team};
use crate::infrastructure::membership::JoinedTeam;

/// Longest browse a caller may ask for
const MAX_DISCOVER_SECS: u64 = 30;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTeamRequest {
    pub name: String,
    #[serde(default)]
    pub preferred_interface: Option<String>,
    /// Address to lead the team from; stored as the network preference
    #[serde(default)]
    pub preferred_ip: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateTeamResponse {
    pub team_id: String,
    pub team: Team,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListTeamsResponse {
    pub teams: Vec<JoinedTeam>,
    pub total: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JoinTeamRequest {
    pub endpoint: String,
    #[serde(default)]
    pub team_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JoinTeamResponse {
    pub team: JoinedTeam,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TeamIdRequest {
    pub team_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MembersResponse {
    pub members: Vec<Member>,
    pub total: usize,
    pub revision: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiscoverRequest {
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiscoverResponse {
    pub teams: Vec<DiscoveredTeam>,
}

/// POST /api/teams
pub async fn create_team(
    State(state): State<AppState>,
    Json(request): Json<CreateTeamRequest>,
) -> ApiResult<CreateTeamResponse> {
    debug!(name = %request.name, "Creating team");

    let joined = state
        .membership_service
        .create_team(
            &request.name,
            request.preferred_interface.as_deref(),
            request.preferred_ip.as_deref(),
        )
        .await?;

    Ok(ok(CreateTeamResponse {
        team_id: joined.team_id().to_string(),
        team: joined.team,
    }))
}

/// GET /api/teams
pub async fn list_teams(State(state): State<AppState>) -> ApiResult<ListTeamsResponse> {
    let teams = state.membership_service.list_teams();
    let total = teams.len();

    Ok(ok(ListTeamsResponse { teams, total }))
}

/// POST /api/teams/join
pub async fn join_team(
    State(state): State<AppState>,
    Json(request): Json<JoinTeamRequest>,
) -> ApiResult<JoinTeamResponse> {
    debug!(endpoint = %request.endpoint, team_id = ?request.team_id, "Joining team");

    let team = state
        .membership_service
        .join_team(&request.endpoint, request.team_id.as_deref())
        .await?;

    Ok(ok(JoinTeamResponse { team }))
}

/// POST /api/teams/leave
pub async fn leave_team(
    State(state): State<AppState>,
    Json(request): Json<TeamIdRequest>,
) -> ApiResult<Empty> {
    state.membership_service.leave_team(&request.team_id).await?;
    Ok(ok(Empty::default()))
}

/// POST /api/teams/dissolve
pub async fn dissolve_team(
    State(state): State<AppState>,
    Json(request): Json<TeamIdRequest>,
) -> ApiResult<Empty> {
    state
        .membership_service
        .dissolve_team(&request.team_id)
        .await?;
    Ok(ok(Empty::default()))
}

/// GET /api/teams/{team_id}/members
pub async fn list_members(
    State(state): State<AppState>,
    Path(team_id): Path<String>,
) -> ApiResult<MembersResponse> {
    let snapshot = state.membership_service.list_members(&team_id).await?;

    Ok(ok(MembersResponse {
        total: snapshot.len(),
        revision: snapshot.revision,
        members: snapshot.members,
    }))
}

/// POST /api/teams/discover
pub async fn discover_teams(
    State(state): State<AppState>,
    Json(request): Json<DiscoverRequest>,
) -> ApiResult<DiscoverResponse> {
    let secs = request
        .timeout_seconds
        .unwrap_or(state.config.discovery.default_timeout_secs)
        .clamp(1, MAX_DISCOVER_SECS);
    debug!(timeout_secs = secs, "Discovering teams");

    let teams = state
        .membership_service
        .discover(Duration::from_secs(secs))
        .await;

    Ok(ok(DiscoverResponse { teams }))
}
