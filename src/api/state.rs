//! Application state for shared services

use std::sync::Arc;

use crate::config::AppConfig;
use crate::infrastructure::identity::IdentityService;
use crate::infrastructure::membership::MembershipService;
use crate::infrastructure::network::NetworkConfigService;

/// Shared by every handler of both the local and the peer API
#[derive(Debug, Clone)]
pub struct AppState {
    pub identity_service: Arc<IdentityService>,
    pub membership_service: Arc<MembershipService>,
    pub network_service: Arc<NetworkConfigService>,
    pub config: Arc<AppConfig>,
}
