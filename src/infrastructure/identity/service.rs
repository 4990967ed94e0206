//! Identity service

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use crate::domain::identity::{IdentityRepository, Node};
use crate::domain::DomainError;

/// Owns the local node identity
#[derive(Debug)]
pub struct IdentityService {
    repository: Arc<dyn IdentityRepository>,
    /// Serializes load-then-save so concurrent creates agree on one node id
    write_lock: Mutex<()>,
}

impl IdentityService {
    pub fn new(repository: Arc<dyn IdentityRepository>) -> Self {
        Self {
            repository,
            write_lock: Mutex::new(()),
        }
    }

    /// Create the identity, or rename the existing one. The node id of an
    /// existing identity is kept.
    pub async fn create_identity(&self, display_name: &str) -> Result<Node, DomainError> {
        let display_name = display_name.trim();
        let _guard = self.write_lock.lock().await;

        let node = match self.repository.load().await? {
            Some(mut node) => {
                if node.display_name() == display_name {
                    return Ok(node);
                }

                node.rename(display_name)
                    .map_err(|e| DomainError::validation(e.to_string()))?;
                info!(node_id = %node.node_id(), name = %display_name, "Renaming identity");
                node
            }
            None => {
                let node =
                    Node::new(display_name).map_err(|e| DomainError::validation(e.to_string()))?;
                info!(node_id = %node.node_id(), name = %display_name, "Creating identity");
                node
            }
        };

        self.repository.save(&node).await?;
        Ok(node)
    }

    pub async fn get_identity(&self) -> Result<Node, DomainError> {
        self.repository
            .load()
            .await?
            .ok_or_else(|| DomainError::not_found("Identity not set; create one first"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::identity::MockIdentityRepository;
    use crate::infrastructure::identity::{FileIdentityRepository, InMemoryIdentityRepository};

    fn create_service() -> IdentityService {
        IdentityService::new(Arc::new(InMemoryIdentityRepository::new()))
    }

    #[tokio::test]
    async fn test_get_without_identity_is_not_found() {
        let service = create_service();
        let err = service.get_identity().await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let service = create_service();
        let created = service.create_identity("alice").await.unwrap();
        let fetched = service.get_identity().await.unwrap();

        assert_eq!(created, fetched);
        assert_eq!(fetched.display_name(), "alice");
    }

    #[tokio::test]
    async fn test_create_again_renames_and_keeps_id() {
        let service = create_service();
        let first = service.create_identity("alice").await.unwrap();
        let second = service.create_identity("alice-desktop").await.unwrap();

        assert_eq!(first.node_id(), second.node_id());
        assert_eq!(second.display_name(), "alice-desktop");
    }

    #[tokio::test]
    async fn test_empty_name_is_validation_error() {
        let service = create_service();
        let err = service.create_identity("   ").await.unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_storage_failure_is_propagated() {
        let mut repo = MockIdentityRepository::new();
        repo.expect_load().returning(|| Ok(None));
        repo.expect_save()
            .returning(|_| Err(DomainError::storage("disk full")));

        let service = IdentityService::new(Arc::new(repo));
        let err = service.create_identity("alice").await.unwrap_err();
        assert!(matches!(err, DomainError::Storage { .. }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_share_one_node_id() {
        for _ in 0..25 {
            let dir = tempfile::tempdir().unwrap();
            let service = Arc::new(IdentityService::new(Arc::new(FileIdentityRepository::new(
                dir.path(),
            ))));

            let (a, b) = tokio::join!(
                {
                    let service = service.clone();
                    tokio::spawn(async move { service.create_identity("alice").await })
                },
                {
                    let service = service.clone();
                    tokio::spawn(async move { service.create_identity("alice").await })
                }
            );

            let a = a.unwrap().unwrap();
            let b = b.unwrap().unwrap();
            assert_eq!(a.node_id(), b.node_id());
            assert_eq!(service.get_identity().await.unwrap().node_id(), a.node_id());
        }
    }
}
