use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub identity: IdentityConfig,
    pub team: TeamConfig,
    pub discovery: DiscoveryConfig,
    pub sync: SyncConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Where the local node identity lives
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    pub data_dir: PathBuf,
}

/// Leader-call timeouts and the address peers should use to reach us
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TeamConfig {
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Overrides the auto-detected LAN address in advertised endpoints
    pub advertise_ip: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// When false, an in-process registry replaces mDNS
    pub enabled: bool,
    pub service_type: String,
    pub refresh_interval_secs: u64,
    pub default_timeout_secs: u64,
}

/// What a push connection does when its outbound queue is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    #[default]
    DropOldest,
    Close,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub queue_capacity: usize,
    pub overflow_policy: OverflowPolicy,
    pub heartbeat_interval_secs: u64,
    pub heartbeat_timeout_secs: u64,
    pub auth_timeout_secs: u64,
    pub reconnect_min_secs: u64,
    pub reconnect_max_secs: u64,
    pub max_reconnect_attempts: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 19960,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));

        Self {
            data_dir: base.join("lan-teams"),
        }
    }
}

impl Default for TeamConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 10,
            connect_timeout_secs: 3,
            advertise_ip: None,
        }
    }
}

impl TeamConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            service_type: "_lanteam._tcp.local.".to_string(),
            refresh_interval_secs: 60,
            default_timeout_secs: 3,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
            overflow_policy: OverflowPolicy::default(),
            heartbeat_interval_secs: 30,
            heartbeat_timeout_secs: 60,
            auth_timeout_secs: 10,
            reconnect_min_secs: 1,
            reconnect_max_secs: 30,
            max_reconnect_attempts: 10,
        }
    }
}

impl SyncConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_secs(self.heartbeat_timeout_secs)
    }

    pub fn auth_timeout(&self) -> Duration {
        Duration::from_secs(self.auth_timeout_secs)
    }

    /// Exponential backoff after `failures` consecutive failed reconnects
    pub fn reconnect_delay(&self, failures: u32) -> Duration {
        let factor = 1u64.checked_shl(failures.min(16)).unwrap_or(u64::MAX);
        let secs = self
            .reconnect_min_secs
            .saturating_mul(factor)
            .min(self.reconnect_max_secs.max(self.reconnect_min_secs));
        Duration::from_secs(secs)
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 19960);
        assert_eq!(config.sync.queue_capacity, 256);
        assert_eq!(config.sync.overflow_policy, OverflowPolicy::DropOldest);
        assert_eq!(config.team.request_timeout(), Duration::from_secs(10));
        assert!(config.discovery.service_type.ends_with(".local."));
    }

    #[test]
    fn test_partial_section_keeps_defaults() {
        let config: AppConfig = serde_json::from_str(
            r#"{"sync": {"queue_capacity": 8, "overflow_policy": "close"}}"#,
        )
        .unwrap();

        assert_eq!(config.sync.queue_capacity, 8);
        assert_eq!(config.sync.overflow_policy, OverflowPolicy::Close);
        assert_eq!(config.sync.heartbeat_interval_secs, 30);
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn test_reconnect_delay_doubles_up_to_max() {
        let sync = SyncConfig::default();
        assert_eq!(sync.reconnect_delay(0), Duration::from_secs(1));
        assert_eq!(sync.reconnect_delay(1), Duration::from_secs(2));
        assert_eq!(sync.reconnect_delay(3), Duration::from_secs(8));
        assert_eq!(sync.reconnect_delay(10), Duration::from_secs(30));
        assert_eq!(sync.reconnect_delay(u32::MAX), Duration::from_secs(30));
    }
}
