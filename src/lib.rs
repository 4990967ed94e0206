//! LAN Teams
//!
//! Serverless team membership for peers on a local network:
//! - Persistent node identity
//! - Teams led by one node, joined by others over HTTP
//! - mDNS advertisement and browsing of teams
//! - Live membership push over WebSocket

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use api::state::AppState;
use domain::discovery::Discovery;
use domain::identity::IdentityRepository;
use domain::network::NetworkConfigRepository;
use infrastructure::{
    identity::{FileIdentityRepository, IdentityService},
    membership::{LeaderClient, MembershipService},
    network::{FileNetworkConfigRepository, InMemoryNetworkConfigRepository, NetworkConfigService},
    sync::SyncHub,
    team::TeamRegistry,
};
use tracing::info;

/// Create the application state for a daemon reachable at `port`
pub fn create_app_state(
    config: &AppConfig,
    discovery: Arc<dyn Discovery>,
    port: u16,
) -> anyhow::Result<AppState> {
    let repository = Arc::new(FileIdentityRepository::new(&config.identity.data_dir));
    info!("Identity stored at {}", repository.path().display());
    let network_repository = Arc::new(FileNetworkConfigRepository::new(&config.identity.data_dir));

    let local_endpoint = infrastructure::discovery::network::local_endpoint(
        config.team.advertise_ip.as_deref(),
        &config.server.host,
        port,
    );

    assemble_app_state(
        config,
        repository,
        network_repository,
        discovery,
        local_endpoint,
    )
}

/// Create the application state from explicit parts. The network
/// preference is kept in memory only.
pub fn create_app_state_with(
    config: &AppConfig,
    identity_repository: Arc<dyn IdentityRepository>,
    discovery: Arc<dyn Discovery>,
    local_endpoint: impl Into<String>,
) -> anyhow::Result<AppState> {
    assemble_app_state(
        config,
        identity_repository,
        Arc::new(InMemoryNetworkConfigRepository::new()),
        discovery,
        local_endpoint.into(),
    )
}

fn assemble_app_state(
    config: &AppConfig,
    identity_repository: Arc<dyn IdentityRepository>,
    network_repository: Arc<dyn NetworkConfigRepository>,
    discovery: Arc<dyn Discovery>,
    local_endpoint: String,
) -> anyhow::Result<AppState> {
    info!("Peers reach this node at {} by default", local_endpoint);

    let network_service = Arc::new(NetworkConfigService::new(network_repository, local_endpoint));
    let identity_service = Arc::new(IdentityService::new(identity_repository));
    let registry = Arc::new(TeamRegistry::new(SyncHub::new(&config.sync)));
    let leader = Arc::new(LeaderClient::new(
        config.team.request_timeout(),
        config.team.connect_timeout(),
    )?);

    let membership_service = Arc::new(MembershipService::new(
        identity_service.clone(),
        registry,
        discovery,
        leader,
        network_service.clone(),
        &config.team,
        config.sync.clone(),
    ));

    Ok(AppState {
        identity_service,
        membership_service,
        network_service,
        config: Arc::new(config.clone()),
    })
}
