//! Caller-side view of a remote leader

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use super::protocol::{JoinResult, TeamInfo};
use crate::domain::identity::NodeId;
use crate::domain::team::{JoinRequest, MembershipSnapshot, TeamId};
use crate::domain::DomainError;

/// Requests a node makes against a leader's peer API.
///
/// Implementations must return `DomainError::Connectivity` when the leader
/// cannot be reached or its answer is not a valid envelope, and
/// `DomainError::Business` when the leader answered with a non-zero code.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait LeaderApi: Send + Sync + std::fmt::Debug {
    /// Team info. Without a team id, asks which team the leader runs.
    async fn fetch_info(
        &self,
        endpoint: &str,
        team_id: Option<TeamId>,
    ) -> Result<TeamInfo, DomainError>;

    async fn join(
        &self,
        endpoint: &str,
        team_id: &TeamId,
        request: &JoinRequest,
    ) -> Result<JoinResult, DomainError>;

    async fn leave(
        &self,
        endpoint: &str,
        team_id: &TeamId,
        node_id: &NodeId,
    ) -> Result<(), DomainError>;

    async fn members(
        &self,
        endpoint: &str,
        team_id: &TeamId,
    ) -> Result<MembershipSnapshot, DomainError>;
}
