//! Discovery implementations

mod in_memory;
mod mdns;
pub mod network;

use std::sync::Arc;

use tracing::warn;

pub use in_memory::{InMemoryDiscovery, InMemoryLan};
pub use mdns::MdnsDiscovery;

use crate::config::DiscoveryConfig;
use crate::domain::discovery::Discovery;

/// mDNS when enabled and startable, otherwise an isolated in-process table
pub fn create_discovery(config: &DiscoveryConfig) -> Arc<dyn Discovery> {
    if config.enabled {
        match MdnsDiscovery::new(config) {
            Ok(discovery) => return Arc::new(discovery),
            Err(e) => warn!(error = %e, "mDNS unavailable, discovery limited to this process"),
        }
    }

    Arc::new(InMemoryDiscovery::new(InMemoryLan::new()))
}
