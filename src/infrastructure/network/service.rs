//! Network preference service

use std::net::Ipv4Addr;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::domain::network::{NetworkConfig, NetworkConfigRepository};
use crate::domain::DomainError;
use crate::infrastructure::discovery::network::{is_local_ipv4, list_interfaces, NetworkInterface};

/// Owns the network preference and turns it into the endpoint peers are given
#[derive(Debug)]
pub struct NetworkConfigService {
    repository: Arc<dyn NetworkConfigRepository>,
    default_endpoint: String,
    port: Option<u16>,
    write_lock: Mutex<()>,
}

impl NetworkConfigService {
    /// `default_endpoint` is used whenever no usable preference is stored;
    /// its port is kept for preferred addresses.
    pub fn new(
        repository: Arc<dyn NetworkConfigRepository>,
        default_endpoint: impl Into<String>,
    ) -> Self {
        let default_endpoint = default_endpoint.into();
        let port = default_endpoint
            .rsplit_once(':')
            .and_then(|(_, port)| port.parse().ok());

        Self {
            repository,
            default_endpoint,
            port,
            write_lock: Mutex::new(()),
        }
    }

    pub fn default_endpoint(&self) -> &str {
        &self.default_endpoint
    }

    pub async fn get(&self) -> Result<Option<NetworkConfig>, DomainError> {
        self.repository.load().await
    }

    /// Store a new preference. Both values empty clears it.
    pub async fn set(
        &self,
        preferred_interface: Option<&str>,
        preferred_ip: Option<&str>,
    ) -> Result<Option<NetworkConfig>, DomainError> {
        let preferred_ip = match preferred_ip.map(str::trim).filter(|ip| !ip.is_empty()) {
            Some(ip) => Some(parse_local_ip(ip)?),
            None => None,
        };
        let config = NetworkConfig::new(preferred_interface.map(str::to_string), preferred_ip);

        let _guard = self.write_lock.lock().await;

        if config.is_empty() {
            self.repository.clear().await?;
            info!("Network preference cleared");
            return Ok(None);
        }

        self.repository.save(&config).await?;
        info!(
            preferred_interface = ?config.preferred_interface,
            preferred_ip = ?config.preferred_ip,
            "Network preference updated"
        );

        Ok(Some(config))
    }

    /// Endpoint to hand to peers right now. A stored preference that no
    /// longer matches a local address falls back to the default.
    pub async fn endpoint(&self) -> String {
        let config = match self.repository.load().await {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "Failed to load network preference");
                None
            }
        };

        let Some(config) = config else {
            return self.default_endpoint.clone();
        };

        resolve_endpoint(
            &config,
            &self.default_endpoint,
            self.port,
            is_local_ipv4,
            &list_interfaces(),
        )
    }
}

fn parse_local_ip(ip: &str) -> Result<Ipv4Addr, DomainError> {
    let ip: Ipv4Addr = ip
        .parse()
        .map_err(|_| DomainError::validation(format!("'{}' is not an IPv4 address", ip)))?;

    if !is_local_ipv4(ip) {
        return Err(DomainError::validation(format!(
            "{} is not assigned to this host",
            ip
        )));
    }

    Ok(ip)
}

fn resolve_endpoint(
    config: &NetworkConfig,
    default_endpoint: &str,
    port: Option<u16>,
    is_local: impl Fn(Ipv4Addr) -> bool,
    interfaces: &[NetworkInterface],
) -> String {
    let Some(port) = port else {
        return default_endpoint.to_string();
    };

    if let Some(ip) = config.preferred_ip.filter(|ip| is_local(*ip)) {
        return format!("{}:{}", ip, port);
    }

    let by_interface = config.preferred_interface.as_deref().and_then(|name| {
        interfaces
            .iter()
            .find(|iface| iface.name == name)
            .and_then(|iface| iface.addresses.first().copied())
    });
    if let Some(ip) = by_interface {
        return format!("{}:{}", ip, port);
    }

    warn!(
        preferred_interface = ?config.preferred_interface,
        preferred_ip = ?config.preferred_ip,
        "Network preference not available, using {}",
        default_endpoint
    );
    default_endpoint.to_string()
}
