//! Fan-out of team events to live push connections

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use tracing::{debug, info, warn};

use super::connection::{Connection, ConnectionId, PushOutcome};
use crate::config::{OverflowPolicy, SyncConfig};
use crate::domain::identity::NodeId;
use crate::domain::team::{TeamEvent, TeamId};

type TeamConnections = HashMap<ConnectionId, Arc<Connection>>;

#[derive(Debug)]
struct HubInner {
    teams: Mutex<HashMap<TeamId, TeamConnections>>,
    next_id: AtomicU64,
    capacity: usize,
    policy: OverflowPolicy,
}

impl HubInner {
    fn lock_teams(&self) -> MutexGuard<'_, HashMap<TeamId, TeamConnections>> {
        self.teams.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn unregister(&self, team_id: &TeamId, id: ConnectionId) {
        let mut teams = self.lock_teams();

        if let Some(connections) = teams.get_mut(team_id) {
            connections.remove(&id);

            if connections.is_empty() {
                teams.remove(team_id);
            }
        }
    }
}

/// Live push connections per team.
///
/// Publishing copies the connection list and pushes into each bounded queue
/// without blocking, so a slow peer never stalls the registry.
#[derive(Debug, Clone)]
pub struct SyncHub {
    inner: Arc<HubInner>,
}

impl SyncHub {
    pub fn new(config: &SyncConfig) -> Self {
        Self::with_capacity(config.queue_capacity, config.overflow_policy)
    }

    pub fn with_capacity(capacity: usize, policy: OverflowPolicy) -> Self {
        Self {
            inner: Arc::new(HubInner {
                teams: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                capacity,
                policy,
            }),
        }
    }

    /// Open a connection for `node_id`. Callers that need a consistent
    /// baseline must hold the team's registry lock while registering.
    pub fn register(&self, team_id: &TeamId, node_id: &NodeId) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let connection = Arc::new(Connection::new(
            id,
            team_id.clone(),
            node_id.clone(),
            self.inner.capacity,
            self.inner.policy,
        ));

        self.inner
            .lock_teams()
            .entry(team_id.clone())
            .or_default()
            .insert(id, connection.clone());

        debug!(team_id = %team_id, node_id = %node_id, connection_id = id, "Push connection registered");

        Subscription {
            connection,
            hub: Arc::downgrade(&self.inner),
        }
    }

    /// Deliver an event to every live connection of its team.
    /// Returns how many connections accepted it.
    pub fn publish(&self, event: TeamEvent) -> usize {
        let connections: Vec<Arc<Connection>> = self
            .inner
            .lock_teams()
            .get(&event.team_id)
            .map(|c| c.values().cloned().collect())
            .unwrap_or_default();

        let event = Arc::new(event);
        let mut delivered = 0;

        for connection in connections {
            match connection.push(event.clone()) {
                PushOutcome::Queued => delivered += 1,
                PushOutcome::DroppedOldest => {
                    delivered += 1;
                    warn!(
                        team_id = %event.team_id,
                        node_id = %connection.node_id(),
                        dropped = connection.dropped(),
                        "Push queue full, dropped oldest event"
                    );
                }
                PushOutcome::Closed => {
                    warn!(
                        team_id = %event.team_id,
                        node_id = %connection.node_id(),
                        "Push queue full, closing connection"
                    );
                    self.inner.unregister(&event.team_id, connection.id());
                }
                PushOutcome::Rejected => {
                    self.inner.unregister(&event.team_id, connection.id());
                }
            }
        }

        debug!(
            team_id = %event.team_id,
            revision = event.revision,
            event = event.event.name(),
            delivered,
            "Event published"
        );

        delivered
    }

    /// Close every connection of a team
    pub fn close_team(&self, team_id: &TeamId) {
        let removed = self.inner.lock_teams().remove(team_id);

        if let Some(connections) = removed {
            for connection in connections.values() {
                connection.close();
            }
            info!(team_id = %team_id, count = connections.len(), "Closed team push connections");
        }
    }

    /// Close every connection `node_id` holds on a team. Events already
    /// queued stay readable until the receiver drains them.
    pub fn close_node(&self, team_id: &TeamId, node_id: &NodeId) -> usize {
        let removed: Vec<Arc<Connection>> = {
            let mut teams = self.inner.lock_teams();
            let Some(connections) = teams.get_mut(team_id) else {
                return 0;
            };

            let ids: Vec<ConnectionId> = connections
                .values()
                .filter(|c| c.node_id() == node_id)
                .map(|c| c.id())
                .collect();
            let removed: Vec<Arc<Connection>> =
                ids.iter().filter_map(|id| connections.remove(id)).collect();

            if connections.is_empty() {
                teams.remove(team_id);
            }
            removed
        };

        for connection in &removed {
            connection.close();
        }
        if !removed.is_empty() {
            debug!(team_id = %team_id, node_id = %node_id, count = removed.len(), "Closed member push connections");
        }

        removed.len()
    }

    /// Close and drop connections that have been silent longer than `timeout`
    pub fn prune_stale(&self, timeout: Duration) -> Vec<(TeamId, NodeId)> {
        let stale: Vec<Arc<Connection>> = self
            .inner
            .lock_teams()
            .values()
            .flat_map(|c| c.values())
            .filter(|c| c.idle_for() > timeout)
            .cloned()
            .collect();

        stale
            .into_iter()
            .map(|connection| {
                warn!(
                    team_id = %connection.team_id(),
                    node_id = %connection.node_id(),
                    "Heartbeat timeout, pruning connection"
                );
                connection.close();
                self.inner.unregister(connection.team_id(), connection.id());
                (connection.team_id().clone(), connection.node_id().clone())
            })
            .collect()
    }

    /// Whether `node_id` still has at least one open connection to the team
    pub fn is_connected(&self, team_id: &TeamId, node_id: &NodeId) -> bool {
        self.inner
            .lock_teams()
            .get(team_id)
            .map(|c| c.values().any(|conn| conn.node_id() == node_id && !conn.is_closed()))
            .unwrap_or(false)
    }

    pub fn connection_count(&self, team_id: &TeamId) -> usize {
        self.inner
            .lock_teams()
            .get(team_id)
            .map(|c| c.len())
            .unwrap_or(0)
    }
}

/// Receiving end of one push connection. Dropping it unregisters the
/// connection.
#[derive(Debug)]
pub struct Subscription {
    connection: Arc<Connection>,
    hub: Weak<HubInner>,
}

impl Subscription {
    pub fn team_id(&self) -> &TeamId {
        self.connection.team_id()
    }

    pub fn node_id(&self) -> &NodeId {
        self.connection.node_id()
    }

    pub fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }

    pub fn touch(&self) {
        self.connection.touch();
    }

    /// Next event; `None` once the connection was closed and drained
    pub async fn recv(&self) -> Option<Arc<TeamEvent>> {
        self.connection.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.connection.close();

        if let Some(hub) = self.hub.upgrade() {
            hub.unregister(self.connection.team_id(), self.connection.id());
        }
    }
}
