//! Network preference repository implementations

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::network::{NetworkConfig, NetworkConfigRepository};
use crate::domain::DomainError;
use crate::infrastructure::storage;

const NETWORK_FILE: &str = "network.json";

/// Stores the preference in `<data_dir>/network.json`, next to the identity
#[derive(Debug)]
pub struct FileNetworkConfigRepository {
    path: PathBuf,
}

impl FileNetworkConfigRepository {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: data_dir.as_ref().join(NETWORK_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl NetworkConfigRepository for FileNetworkConfigRepository {
    async fn load(&self) -> Result<Option<NetworkConfig>, DomainError> {
        storage::read_json(&self.path).await
    }

    async fn save(&self, config: &NetworkConfig) -> Result<(), DomainError> {
        storage::write_json(&self.path, config).await?;
        debug!(path = %self.path.display(), "Network preference saved");
        Ok(())
    }

    async fn clear(&self) -> Result<(), DomainError> {
        storage::remove(&self.path).await
    }
}

#[derive(Debug, Default)]
pub struct InMemoryNetworkConfigRepository {
    config: RwLock<Option<NetworkConfig>>,
}

impl InMemoryNetworkConfigRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NetworkConfigRepository for InMemoryNetworkConfigRepository {
    async fn load(&self) -> Result<Option<NetworkConfig>, DomainError> {
        let config = self.config.read().map_err(|e| {
            DomainError::storage(format!("Failed to acquire read lock: {}", e))
        })?;

        Ok(config.clone())
    }

    async fn save(&self, config: &NetworkConfig) -> Result<(), DomainError> {
        let mut slot = self.config.write().map_err(|e| {
            DomainError::storage(format!("Failed to acquire write lock: {}", e))
        })?;

        *slot = Some(config.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), DomainError> {
        let mut slot = self.config.write().map_err(|e| {
            DomainError::storage(format!("Failed to acquire write lock: {}", e))
        })?;

        *slot = None;
        Ok(())
    }
}
