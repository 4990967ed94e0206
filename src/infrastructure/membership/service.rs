//! Membership orchestration for one node.
//!
//! Ties the local identity, the teams this node leads (registry, discovery
//! advert, loopback view) and the teams it joined elsewhere (leader client,
//! push subscriber) together. Both HTTP surfaces call into this service.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tracing::{debug, info, warn};

use super::local::{JoinedTeam, LocalMemberships};
use super::subscriber::{SubscriberHandle, SyncSubscriber};
use crate::config::{SyncConfig, TeamConfig};
use crate::domain::discovery::{DiscoveredTeam, Discovery, TeamAdvert};
use crate::domain::identity::NodeId;
use crate::domain::membership::{JoinResult, LeaderApi, TeamInfo};
use crate::domain::team::{
    validate_endpoint, JoinRequest, MembershipSnapshot, Team, TeamEvent, TeamId,
};
use crate::domain::DomainError;
use crate::infrastructure::identity::IdentityService;
use crate::infrastructure::network::NetworkConfigService;
use crate::infrastructure::sync::Subscription;
use crate::infrastructure::team::TeamRegistry;

/// Parse a user-supplied team code
pub fn parse_team_id(team_id: &str) -> Result<TeamId, DomainError> {
    TeamId::new(team_id.trim()).map_err(|e| DomainError::validation(e.to_string()))
}

#[derive(Debug)]
pub struct MembershipService {
    identity: Arc<IdentityService>,
    registry: Arc<TeamRegistry>,
    discovery: Arc<dyn Discovery>,
    leader: Arc<dyn LeaderApi>,
    local: Arc<LocalMemberships>,
    subscribers: Mutex<HashMap<TeamId, SubscriberHandle>>,
    network: Arc<NetworkConfigService>,
    connect_timeout: Duration,
    sync: SyncConfig,
}

impl MembershipService {
    pub fn new(
        identity: Arc<IdentityService>,
        registry: Arc<TeamRegistry>,
        discovery: Arc<dyn Discovery>,
        leader: Arc<dyn LeaderApi>,
        network: Arc<NetworkConfigService>,
        team: &TeamConfig,
        sync: SyncConfig,
    ) -> Self {
        Self {
            identity,
            registry,
            discovery,
            leader,
            local: Arc::new(LocalMemberships::new()),
            subscribers: Mutex::new(HashMap::new()),
            network,
            connect_timeout: team.connect_timeout(),
            sync,
        }
    }

    /// Address other nodes are given to reach this one
    pub async fn local_endpoint(&self) -> String {
        self.network.endpoint().await
    }

    pub fn registry(&self) -> &Arc<TeamRegistry> {
        &self.registry
    }

    fn lock_subscribers(&self) -> MutexGuard<'_, HashMap<TeamId, SubscriberHandle>> {
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn replace_subscriber(&self, handle: SubscriberHandle) {
        let previous = self
            .lock_subscribers()
            .insert(handle.team_id().clone(), handle);
        drop(previous);
    }

    fn stop_subscriber(&self, team_id: &TeamId) {
        if let Some(handle) = self.lock_subscribers().remove(team_id) {
            handle.stop();
        }
    }

    // ---- local control surface ----

    /// Create a team led by this node and start advertising it. A preferred
    /// address is stored first and becomes the team's leader endpoint.
    pub async fn create_team(
        &self,
        name: &str,
        preferred_interface: Option<&str>,
        preferred_ip: Option<&str>,
    ) -> Result<JoinedTeam, DomainError> {
        let node = self.identity.get_identity().await?;

        if preferred_ip.is_some_and(|ip| !ip.trim().is_empty()) {
            self.network.set(preferred_interface, preferred_ip).await?;
        }
        let endpoint = self.network.endpoint().await;

        let team = self.registry.create_team(name, &node, &endpoint)?;
        let team_id = team.team_id().clone();

        let (subscription, baseline) = self.registry.subscribe(&team_id, node.node_id())?;
        let joined = JoinedTeam::new(team.clone(), true, &endpoint, baseline.snapshot());
        self.local.insert(joined.clone());
        self.replace_subscriber(self.spawn_loopback(subscription));

        if let Err(e) = self.discovery.advertise(TeamAdvert::for_team(&team, 1)).await {
            warn!(team_id = %team_id, error = %e, "Failed to advertise team");
        }

        Ok(joined)
    }

    /// Keep the leader's own view current from its registry
    fn spawn_loopback(&self, subscription: Subscription) -> SubscriberHandle {
        let team_id = subscription.team_id().clone();
        let local = self.local.clone();
        let keepalive = loopback_keepalive(&self.sync);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(keepalive);

            loop {
                tokio::select! {
                    event = subscription.recv() => match event {
                        Some(event) => {
                            local.apply_event(&event);
                        }
                        None => break,
                    },
                    _ = ticker.tick() => subscription.touch(),
                }
            }
        });

        SubscriberHandle::from_task(team_id, task)
    }

    /// Join a team led by the node at `endpoint`. Without a team id the
    /// leader is asked which team it runs.
    pub async fn join_team(
        &self,
        endpoint: &str,
        team_id: Option<&str>,
    ) -> Result<JoinedTeam, DomainError> {
        let endpoint = endpoint.trim();
        validate_endpoint(endpoint).map_err(|e| DomainError::validation(e.to_string()))?;

        let node = self.identity.get_identity().await?;

        let team_id = match team_id.filter(|id| !id.trim().is_empty()) {
            Some(team_id) => parse_team_id(team_id)?,
            None => self
                .leader
                .fetch_info(endpoint, None)
                .await?
                .team
                .team_id()
                .clone(),
        };

        if let Some(joined) = self.local.get(&team_id).filter(|j| j.is_leader) {
            return Ok(joined);
        }

        let local_endpoint = self.network.endpoint().await;
        let request = JoinRequest {
            node_id: node.node_id().clone(),
            display_name: node.display_name().to_string(),
            endpoint: local_endpoint.clone(),
        };
        let result = self.leader.join(endpoint, &team_id, &request).await?;

        if result.team.team_id() != &team_id {
            return Err(DomainError::connectivity(format!(
                "Leader at {} answered for team '{}' instead of '{}'",
                endpoint,
                result.team.team_id(),
                team_id
            )));
        }

        self.stop_subscriber(&team_id);

        let joined = JoinedTeam::new(result.team, false, endpoint, result.snapshot);
        self.local.insert(joined.clone());

        let subscriber = SyncSubscriber::new(
            team_id.clone(),
            endpoint,
            node.node_id().clone(),
            node.display_name(),
            &local_endpoint,
            joined.joined_at,
            self.local.clone(),
            self.sync.clone(),
            self.connect_timeout,
        );
        self.replace_subscriber(subscriber.spawn());

        info!(team_id = %team_id, leader = %endpoint, members = joined.snapshot.len(), "Joined team");
        Ok(joined)
    }

    /// Leave a joined team. Always succeeds unless this node leads it.
    pub async fn leave_team(&self, team_id: &str) -> Result<(), DomainError> {
        let team_id = parse_team_id(team_id)?;

        if self.registry.get_team(&team_id).is_ok() {
            return Err(DomainError::validation(
                "The leader cannot leave its own team; dissolve it instead",
            ));
        }

        self.stop_subscriber(&team_id);

        let Some(joined) = self.local.remove(&team_id) else {
            debug!(team_id = %team_id, "Leave for a team not joined");
            return Ok(());
        };

        let node = match self.identity.get_identity().await {
            Ok(node) => node,
            Err(e) => {
                warn!(team_id = %team_id, error = %e, "No identity, skipping leader notification");
                return Ok(());
            }
        };

        if let Err(e) = self
            .leader
            .leave(&joined.leader_endpoint, &team_id, node.node_id())
            .await
        {
            warn!(team_id = %team_id, error = %e, "Leader did not confirm leave");
        }

        info!(team_id = %team_id, "Left team");
        Ok(())
    }

    /// Dissolve a team this node leads
    pub async fn dissolve_team(&self, team_id: &str) -> Result<Team, DomainError> {
        let team_id = parse_team_id(team_id)?;
        let node = self.identity.get_identity().await?;

        let team = self.registry.dissolve(&team_id, node.node_id())?;

        self.discovery.withdraw(&team_id).await;
        self.stop_subscriber(&team_id);
        self.local.remove(&team_id);

        Ok(team)
    }

    pub fn list_teams(&self) -> Vec<JoinedTeam> {
        self.local.list()
    }

    /// Members of a led team from the registry, of a joined team from the
    /// leader (falling back to the last pushed view).
    pub async fn list_members(&self, team_id: &str) -> Result<MembershipSnapshot, DomainError> {
        let team_id = parse_team_id(team_id)?;

        if let Ok(snapshot) = self.registry.list_members(&team_id) {
            return Ok(snapshot);
        }

        let joined = self
            .local
            .get(&team_id)
            .ok_or_else(|| DomainError::not_found(format!("Not a member of team '{}'", team_id)))?;

        match self.leader.members(&joined.leader_endpoint, &team_id).await {
            Ok(snapshot) => {
                self.local.apply_snapshot(snapshot);
            }
            Err(e) => debug!(team_id = %team_id, error = %e, "Using last pushed member view"),
        }

        Ok(self
            .local
            .get(&team_id)
            .map(|j| j.snapshot)
            .unwrap_or(joined.snapshot))
    }

    pub async fn discover(&self, timeout: Duration) -> Vec<DiscoveredTeam> {
        self.discovery.discover(timeout).await
    }

    // ---- peer surface (this node as leader) ----

    /// Info for a led team. Without an id, the oldest team this node leads.
    pub fn team_info(&self, team_id: Option<&TeamId>) -> Result<TeamInfo, DomainError> {
        let team_id = match team_id {
            Some(team_id) => team_id.clone(),
            None => self
                .registry
                .list_teams()?
                .into_iter()
                .next()
                .map(|team| team.team_id().clone())
                .ok_or_else(|| DomainError::not_found("This node does not lead a team"))?,
        };

        let (team, snapshot) = self.registry.team_info(&team_id)?;
        Ok(TeamInfo {
            team,
            members: snapshot.members,
        })
    }

    pub async fn accept_join(
        &self,
        team_id: &TeamId,
        request: &JoinRequest,
    ) -> Result<JoinResult, DomainError> {
        let snapshot = self.registry.join(team_id, request)?;
        let team = self.registry.get_team(team_id)?;

        self.discovery
            .update_member_count(team_id, snapshot.len())
            .await;

        Ok(JoinResult { team, snapshot })
    }

    pub async fn accept_leave(&self, team_id: &TeamId, node_id: &NodeId) -> Result<(), DomainError> {
        if self.registry.leave(team_id, node_id)? {
            let count = self.registry.list_members(team_id)?.len();
            self.discovery.update_member_count(team_id, count).await;
        }

        Ok(())
    }

    pub fn members(&self, team_id: &TeamId) -> Result<MembershipSnapshot, DomainError> {
        self.registry.list_members(team_id)
    }

    /// Register a member's push connection and mark it online
    pub fn open_push(
        &self,
        team_id: &TeamId,
        node_id: &NodeId,
    ) -> Result<(Subscription, TeamEvent), DomainError> {
        let opened = self.registry.subscribe(team_id, node_id)?;

        if let Err(e) = self.registry.set_online(team_id, node_id, true) {
            debug!(team_id = %team_id, node_id = %node_id, error = %e, "Could not mark member online");
        }

        Ok(opened)
    }

    /// Mark a member offline once its last push connection is gone.
    /// Call after the subscription was dropped.
    pub fn close_push(&self, team_id: &TeamId, node_id: &NodeId) {
        if self.registry.hub().is_connected(team_id, node_id) {
            return;
        }

        if let Err(e) = self.registry.set_online(team_id, node_id, false) {
            debug!(team_id = %team_id, node_id = %node_id, error = %e, "Could not mark member offline");
        }
    }

    /// Drop push connections silent for longer than the heartbeat timeout
    pub fn prune_stale(&self) -> usize {
        let pruned = self.registry.hub().prune_stale(self.sync.heartbeat_timeout());

        for (team_id, node_id) in &pruned {
            self.close_push(team_id, node_id);
        }

        pruned.len()
    }

    /// Stop subscribers and withdraw every advert
    pub async fn shutdown(&self) {
        let handles: Vec<SubscriberHandle> =
            self.lock_subscribers().drain().map(|(_, h)| h).collect();
        for handle in &handles {
            handle.stop();
        }

        self.discovery.shutdown().await;
        info!("Membership service stopped");
    }
}

/// Touch period for the leader's own connection; stays under the prune
/// threshold whatever the heartbeat settings are
fn loopback_keepalive(sync: &SyncConfig) -> Duration {
    sync.heartbeat_interval()
        .min(sync.heartbeat_timeout() / 2)
        .max(Duration::from_millis(100))
}
