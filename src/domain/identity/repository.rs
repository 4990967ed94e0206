//! Identity repository trait

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use super::entity::Node;
use crate::domain::DomainError;

/// Persistence for the single local identity
#[cfg_attr(test, automock)]
#[async_trait]
pub trait IdentityRepository: Send + Sync + std::fmt::Debug {
    /// Load the stored identity, if any
    async fn load(&self) -> Result<Option<Node>, DomainError>;

    /// Replace the stored identity
    async fn save(&self, node: &Node) -> Result<(), DomainError>;
}
