//! Discovery trait

use std::time::Duration;

use async_trait::async_trait;

use super::advert::{DiscoveredTeam, TeamAdvert};
use crate::domain::team::TeamId;
use crate::domain::DomainError;

/// Advertises owned teams and browses for others on the LAN
#[async_trait]
pub trait Discovery: Send + Sync + std::fmt::Debug {
    /// Start (or replace) the advertisement for a team
    async fn advertise(&self, advert: TeamAdvert) -> Result<(), DomainError>;

    /// Re-announce an advertised team with a new member count.
    /// Unknown teams are ignored.
    async fn update_member_count(&self, team_id: &TeamId, member_count: usize);

    /// Stop advertising a team. Unknown teams are ignored.
    async fn withdraw(&self, team_id: &TeamId);

    /// Browse for `timeout` and return every distinct team seen.
    /// Never fails; problems shrink the result instead.
    async fn discover(&self, timeout: Duration) -> Vec<DiscoveredTeam>;

    /// Withdraw everything and release network resources
    async fn shutdown(&self);
}
