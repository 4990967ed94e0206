//! Network preference domain module
//!
//! Which local address peers should be told to use. Chosen at runtime from
//! the local UI and kept across restarts.

mod repository;

use std::net::Ipv4Addr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use repository::NetworkConfigRepository;

#[cfg(test)]
pub use repository::MockNetworkConfigRepository;

/// Preferred interface and/or address for the advertised endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_interface: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_ip: Option<Ipv4Addr>,
    pub updated_at: DateTime<Utc>,
}

impl NetworkConfig {
    /// Blank interface names count as unset
    pub fn new(preferred_interface: Option<String>, preferred_ip: Option<Ipv4Addr>) -> Self {
        Self {
            preferred_interface: preferred_interface
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty()),
            preferred_ip,
            updated_at: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.preferred_interface.is_none() && self.preferred_ip.is_none()
    }
}
