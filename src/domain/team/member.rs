//! Members and membership snapshots

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entity::TeamId;
use super::validation::{validate_display_name, validate_endpoint, TeamValidationError};
use crate::domain::identity::NodeId;

/// A node's entry in a team's member set, keyed by `node_id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    node_id: NodeId,
    display_name: String,
    endpoint: String,
    joined_at: DateTime<Utc>,
    last_seen_at: DateTime<Utc>,
    #[serde(default)]
    is_leader: bool,
    #[serde(default)]
    is_online: bool,
}

impl Member {
    pub fn new(
        node_id: NodeId,
        display_name: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        let now = Utc::now();

        Self {
            node_id,
            display_name: display_name.into(),
            endpoint: endpoint.into(),
            joined_at: now,
            last_seen_at: now,
            is_leader: false,
            is_online: false,
        }
    }

    /// The leader is always considered online by its own registry
    pub fn leader(
        node_id: NodeId,
        display_name: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            is_leader: true,
            is_online: true,
            ..Self::new(node_id, display_name, endpoint)
        }
    }

    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn joined_at(&self) -> DateTime<Utc> {
        self.joined_at
    }

    pub fn last_seen_at(&self) -> DateTime<Utc> {
        self.last_seen_at
    }

    pub fn is_leader(&self) -> bool {
        self.is_leader
    }

    pub fn is_online(&self) -> bool {
        self.is_online
    }

    /// Apply a repeated join in place. `joined_at` is preserved.
    pub fn refresh(&mut self, display_name: impl Into<String>, endpoint: impl Into<String>) {
        self.display_name = display_name.into();
        self.endpoint = endpoint.into();
        self.touch();
    }

    pub fn set_online(&mut self, online: bool) {
        self.is_online = online;
        self.touch();
    }

    fn touch(&mut self) {
        self.last_seen_at = Utc::now();
    }
}

/// Ordered, deduplicated member list at a given revision.
///
/// The leader is first; the remaining members follow in join order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MembershipSnapshot {
    pub team_id: TeamId,
    pub revision: u64,
    pub members: Vec<Member>,
}

impl MembershipSnapshot {
    pub fn new(team_id: TeamId, revision: u64, mut members: Vec<Member>) -> Self {
        sort_members(&mut members);
        Self {
            team_id,
            revision,
            members,
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, node_id: &NodeId) -> bool {
        self.members.iter().any(|m| m.node_id() == node_id)
    }
}

/// Leader first, then by join time. Ties keep their relative order.
pub fn sort_members(members: &mut [Member]) {
    members.sort_by(|a, b| {
        b.is_leader()
            .cmp(&a.is_leader())
            .then_with(|| a.joined_at().cmp(&b.joined_at()))
    });
}

/// What a node sends the leader to become (or stay) a member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinRequest {
    pub node_id: NodeId,
    pub display_name: String,
    pub endpoint: String,
}

impl JoinRequest {
    pub fn validate(&self) -> Result<(), TeamValidationError> {
        validate_display_name(&self.display_name)?;
        validate_endpoint(&self.endpoint)
    }
}
