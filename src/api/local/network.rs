//! Network information and preference for the local UI

use axum::extract::State;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::{ok, ApiResult, Json};
use crate::domain::network::NetworkConfig;
use crate::infrastructure::discovery::network::{list_interfaces, NetworkInterface};

#[derive(Debug, Clone, Serialize)]
pub struct InterfacesResponse {
    pub interfaces: Vec<NetworkInterface>,
    /// Endpoint advertised to other nodes
    pub endpoint: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NetworkConfigRequest {
    #[serde(default)]
    pub preferred_interface: Option<String>,
    #[serde(default)]
    pub preferred_ip: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NetworkConfigResponse {
    pub config: Option<NetworkConfig>,
    /// Endpoint given to peers with the current preference
    pub endpoint: String,
    pub default_endpoint: String,
}

/// GET /api/network/interfaces
pub async fn list_network_interfaces(State(state): State<AppState>) -> ApiResult<InterfacesResponse> {
    let interfaces = tokio::task::spawn_blocking(list_interfaces)
        .await
        .unwrap_or_default();

    Ok(ok(InterfacesResponse {
        interfaces,
        endpoint: state.network_service.endpoint().await,
    }))
}

/// GET /api/network/config
pub async fn get_network_config(State(state): State<AppState>) -> ApiResult<NetworkConfigResponse> {
    let config = state.network_service.get().await?;
    Ok(ok(config_response(&state, config).await))
}

/// PUT /api/network/config
pub async fn set_network_config(
    State(state): State<AppState>,
    Json(request): Json<NetworkConfigRequest>,
) -> ApiResult<NetworkConfigResponse> {
    debug!(
        preferred_interface = ?request.preferred_interface,
        preferred_ip = ?request.preferred_ip,
        "Setting network preference"
    );

    let config = state
        .network_service
        .set(
            request.preferred_interface.as_deref(),
            request.preferred_ip.as_deref(),
        )
        .await?;

    Ok(ok(config_response(&state, config).await))
}

async fn config_response(state: &AppState, config: Option<NetworkConfig>) -> NetworkConfigResponse {
    NetworkConfigResponse {
        config,
        endpoint: state.network_service.endpoint().await,
        default_endpoint: state.network_service.default_endpoint().to_string(),
    }
}
