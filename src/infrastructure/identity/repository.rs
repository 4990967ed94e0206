//! Identity repository implementations

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::identity::{IdentityRepository, Node};
use crate::domain::DomainError;
use crate::infrastructure::storage;

const IDENTITY_FILE: &str = "identity.json";

/// Stores the identity as pretty JSON in `<data_dir>/identity.json`
#[derive(Debug)]
pub struct FileIdentityRepository {
    path: PathBuf,
}

impl FileIdentityRepository {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: data_dir.as_ref().join(IDENTITY_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl IdentityRepository for FileIdentityRepository {
    async fn load(&self) -> Result<Option<Node>, DomainError> {
        storage::read_json(&self.path).await
    }

    async fn save(&self, node: &Node) -> Result<(), DomainError> {
        storage::write_json(&self.path, node).await?;
        debug!(path = %self.path.display(), "Identity saved");
        Ok(())
    }
}

/// Process-local identity storage
#[derive(Debug, Default)]
pub struct InMemoryIdentityRepository {
    node: RwLock<Option<Node>>,
}

impl InMemoryIdentityRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_node(node: Node) -> Self {
        Self {
            node: RwLock::new(Some(node)),
        }
    }
}

#[async_trait]
impl IdentityRepository for InMemoryIdentityRepository {
    async fn load(&self) -> Result<Option<Node>, DomainError> {
        let node = self.node.read().map_err(|e| {
            DomainError::storage(format!("Failed to acquire read lock: {}", e))
        })?;

        Ok(node.clone())
    }

    async fn save(&self, node: &Node) -> Result<(), DomainError> {
        let mut slot = self.node.write().map_err(|e| {
            DomainError::storage(format!("Failed to acquire write lock: {}", e))
        })?;

        *slot = Some(node.clone());
        Ok(())
    }
}
