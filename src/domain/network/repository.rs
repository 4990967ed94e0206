//! Network preference repository trait

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use super::NetworkConfig;
use crate::domain::DomainError;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait NetworkConfigRepository: Send + Sync + std::fmt::Debug {
    async fn load(&self) -> Result<Option<NetworkConfig>, DomainError>;

    async fn save(&self, config: &NetworkConfig) -> Result<(), DomainError>;

    /// Forget the preference; a missing one is not an error
    async fn clear(&self) -> Result<(), DomainError>;
}
