//! Network preference storage and endpoint resolution

mod repository;
mod service;

pub use repository::{FileNetworkConfigRepository, InMemoryNetworkConfigRepository};
pub use service::NetworkConfigService;
