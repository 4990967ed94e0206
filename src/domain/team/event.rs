//! Membership change events pushed to connected peers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entity::TeamId;
use super::member::{Member, MembershipSnapshot};
use crate::domain::identity::NodeId;

/// What changed. Serialized with a `type` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TeamEventKind {
    /// Full baseline, sent on (re)connect
    Snapshot,
    MemberJoined {
        member: Member,
    },
    /// A duplicate join refreshed an existing member
    MemberUpdated {
        member: Member,
    },
    MemberLeft {
        node_id: NodeId,
        display_name: String,
    },
    MemberOnline {
        node_id: NodeId,
    },
    MemberOffline {
        node_id: NodeId,
    },
    TeamDissolved {
        team_name: String,
        dissolved_by: NodeId,
    },
}

impl TeamEventKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Snapshot => "snapshot",
            Self::MemberJoined { .. } => "member_joined",
            Self::MemberUpdated { .. } => "member_updated",
            Self::MemberLeft { .. } => "member_left",
            Self::MemberOnline { .. } => "member_online",
            Self::MemberOffline { .. } => "member_offline",
            Self::TeamDissolved { .. } => "team_dissolved",
        }
    }
}

/// One registry mutation, stamped with the team revision it produced.
///
/// `members` is the full ordered member list after the mutation, so a
/// receiver can replace its view wholesale instead of replaying deltas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamEvent {
    pub team_id: TeamId,
    pub revision: u64,
    pub timestamp: DateTime<Utc>,
    pub event: TeamEventKind,
    pub members: Vec<Member>,
}

impl TeamEvent {
    pub fn new(snapshot: &MembershipSnapshot, event: TeamEventKind) -> Self {
        Self {
            team_id: snapshot.team_id.clone(),
            revision: snapshot.revision,
            timestamp: Utc::now(),
            event,
            members: snapshot.members.clone(),
        }
    }

    pub fn is_dissolved(&self) -> bool {
        matches!(self.event, TeamEventKind::TeamDissolved { .. })
    }

    pub fn snapshot(&self) -> MembershipSnapshot {
        MembershipSnapshot::new(self.team_id.clone(), self.revision, self.members.clone())
    }
}
