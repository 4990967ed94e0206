//! Local identity endpoints

use axum::extract::State;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::{ok, ApiResult, Json};
use crate::domain::identity::Node;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateIdentityRequest {
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct IdentityResponse {
    pub node_id: String,
    pub name: String,
    pub created_at: String,
}

impl From<&Node> for IdentityResponse {
    fn from(node: &Node) -> Self {
        Self {
            node_id: node.node_id().to_string(),
            name: node.display_name().to_string(),
            created_at: node.created_at().to_rfc3339(),
        }
    }
}

/// GET /api/identity
pub async fn get_identity(State(state): State<AppState>) -> ApiResult<IdentityResponse> {
    let node = state.identity_service.get_identity().await?;
    Ok(ok(IdentityResponse::from(&node)))
}

/// POST /api/identity
pub async fn create_identity(
    State(state): State<AppState>,
    Json(request): Json<CreateIdentityRequest>,
) -> ApiResult<IdentityResponse> {
    debug!(name = %request.name, "Creating identity");

    let node = state.identity_service.create_identity(&request.name).await?;
    Ok(ok(IdentityResponse::from(&node)))
}
