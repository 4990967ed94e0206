//! Teams this node has joined or leads, with their last known member view

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::domain::team::{MembershipSnapshot, Team, TeamEvent, TeamId};

/// One team from this node's point of view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinedTeam {
    pub team: Team,
    pub is_leader: bool,
    pub joined_at: DateTime<Utc>,
    /// Address this node uses to reach the leader
    pub leader_endpoint: String,
    pub snapshot: MembershipSnapshot,
}

impl JoinedTeam {
    pub fn new(
        team: Team,
        is_leader: bool,
        leader_endpoint: impl Into<String>,
        snapshot: MembershipSnapshot,
    ) -> Self {
        Self {
            team,
            is_leader,
            joined_at: Utc::now(),
            leader_endpoint: leader_endpoint.into(),
            snapshot,
        }
    }

    pub fn team_id(&self) -> &TeamId {
        self.team.team_id()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// Revision not newer than the current view
    Stale,
    /// The team was dissolved and forgotten
    Dissolved,
    /// Not a team this node holds
    Unknown,
}

#[derive(Debug, Default)]
pub struct LocalMemberships {
    teams: RwLock<HashMap<TeamId, JoinedTeam>>,
}

impl LocalMemberships {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<TeamId, JoinedTeam>> {
        self.teams.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<TeamId, JoinedTeam>> {
        self.teams.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record a team, replacing any previous entry for it
    pub fn insert(&self, joined: JoinedTeam) {
        self.write().insert(joined.team_id().clone(), joined);
    }

    pub fn remove(&self, team_id: &TeamId) -> Option<JoinedTeam> {
        self.write().remove(team_id)
    }

    /// Remove the entry only if it is still the one recorded at `joined_at`.
    /// A later re-join is left untouched.
    pub fn remove_session(&self, team_id: &TeamId, joined_at: DateTime<Utc>) -> bool {
        let mut teams = self.write();

        match teams.get(team_id) {
            Some(joined) if joined.joined_at == joined_at => {
                teams.remove(team_id);
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, team_id: &TeamId) -> Option<JoinedTeam> {
        self.read().get(team_id).cloned()
    }

    pub fn contains(&self, team_id: &TeamId) -> bool {
        self.read().contains_key(team_id)
    }

    /// All teams, oldest membership first
    pub fn list(&self) -> Vec<JoinedTeam> {
        let mut teams: Vec<JoinedTeam> = self.read().values().cloned().collect();
        teams.sort_by(|a, b| a.joined_at.cmp(&b.joined_at));
        teams
    }

    /// Replace the member view if `snapshot` is newer
    pub fn apply_snapshot(&self, snapshot: MembershipSnapshot) -> ApplyOutcome {
        let mut teams = self.write();

        let Some(joined) = teams.get_mut(&snapshot.team_id) else {
            return ApplyOutcome::Unknown;
        };

        if snapshot.revision <= joined.snapshot.revision {
            return ApplyOutcome::Stale;
        }

        joined.snapshot = snapshot;
        ApplyOutcome::Applied
    }

    /// Apply a pushed event. Older revisions are ignored so a late event
    /// never rolls the view back. `team_dissolved` forgets the team.
    pub fn apply_event(&self, event: &TeamEvent) -> ApplyOutcome {
        if event.is_dissolved() {
            return match self.remove(&event.team_id) {
                Some(_) => {
                    debug!(team_id = %event.team_id, "Team dissolved, membership removed");
                    ApplyOutcome::Dissolved
                }
                None => ApplyOutcome::Unknown,
            };
        }

        let outcome = self.apply_snapshot(event.snapshot());
        debug!(
            team_id = %event.team_id,
            revision = event.revision,
            event = event.event.name(),
            outcome = ?outcome,
            "Applied team event"
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::identity::NodeId;
    use crate::domain::team::{Member, TeamEventKind};

    fn joined(revision: u64) -> JoinedTeam {
        let leader = NodeId::generate();
        let team = Team::new(
            TeamId::new("ABC123").unwrap(),
            "Platform",
            leader.clone(),
            "alice",
            "10.0.0.5:19960",
        )
        .unwrap();
        let snapshot = MembershipSnapshot::new(
            team.team_id().clone(),
            revision,
            vec![Member::leader(leader, "alice", "10.0.0.5:19960")],
        );

        JoinedTeam::new(team, false, "10.0.0.5:19960", snapshot)
    }

    fn event_with(revision: u64, member_count: usize) -> TeamEvent {
        let mut members = joined(revision).snapshot.members;
        for i in 1..member_count {
            members.push(Member::new(NodeId::generate(), format!("m{i}"), "10.0.0.9:19960"));
        }
        let snapshot = MembershipSnapshot::new(TeamId::new("ABC123").unwrap(), revision, members);
        TeamEvent::new(&snapshot, TeamEventKind::Snapshot)
    }

    #[test]
    fn test_newer_event_replaces_view() {
        let local = LocalMemberships::new();
        local.insert(joined(2));

        assert_eq!(local.apply_event(&event_with(3, 2)), ApplyOutcome::Applied);

        let view = local.get(&TeamId::new("ABC123").unwrap()).unwrap();
        assert_eq!(view.snapshot.revision, 3);
        assert_eq!(view.snapshot.len(), 2);
    }

    #[test]
    fn test_out_of_order_event_never_rolls_back() {
        let local = LocalMemberships::new();
        local.insert(joined(2));

        local.apply_event(&event_with(5, 3));
        assert_eq!(local.apply_event(&event_with(4, 1)), ApplyOutcome::Stale);
        assert_eq!(local.apply_event(&event_with(5, 1)), ApplyOutcome::Stale);

        let view = local.get(&TeamId::new("ABC123").unwrap()).unwrap();
        assert_eq!(view.snapshot.revision, 5);
        assert_eq!(view.snapshot.len(), 3);
    }

    #[test]
    fn test_dissolved_event_forgets_team() {
        let local = LocalMemberships::new();
        local.insert(joined(2));

        let snapshot = MembershipSnapshot::new(TeamId::new("ABC123").unwrap(), 3, Vec::new());
        let dissolved = TeamEvent::new(
            &snapshot,
            TeamEventKind::TeamDissolved {
                team_name: "Platform".to_string(),
                dissolved_by: NodeId::generate(),
            },
        );

        assert_eq!(local.apply_event(&dissolved), ApplyOutcome::Dissolved);
        assert!(local.list().is_empty());
        assert_eq!(local.apply_event(&dissolved), ApplyOutcome::Unknown);
    }

    #[test]
    fn test_remove_session_ignores_newer_join() {
        let local = LocalMemberships::new();
        let first = joined(1);
        let team_id = first.team_id().clone();
        let mut second = joined(1);
        second.joined_at = first.joined_at + chrono::Duration::seconds(1);

        local.insert(first.clone());
        local.insert(second);

        assert!(!local.remove_session(&team_id, first.joined_at));
        assert!(local.contains(&team_id));
    }
}
