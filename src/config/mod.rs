mod app_config;

pub use app_config::{
    AppConfig, DiscoveryConfig, IdentityConfig, LogFormat, LoggingConfig, OverflowPolicy,
    ServerConfig, SyncConfig, TeamConfig,
};
