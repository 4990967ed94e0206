//! Leader-side authoritative team state

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use tracing::{debug, info};

use crate::domain::identity::{Node, NodeId};
use crate::domain::team::{
    sort_members, JoinRequest, Member, MembershipSnapshot, Team, TeamEvent, TeamEventKind, TeamId,
};
use crate::domain::DomainError;
use crate::infrastructure::sync::{Subscription, SyncHub};

const MAX_CODE_ATTEMPTS: usize = 16;

#[derive(Debug)]
struct TeamState {
    team: Team,
    members: Vec<Member>,
    revision: u64,
}

impl TeamState {
    fn snapshot(&self) -> MembershipSnapshot {
        MembershipSnapshot::new(
            self.team.team_id().clone(),
            self.revision,
            self.members.clone(),
        )
    }

    fn position(&self, node_id: &NodeId) -> Option<usize> {
        self.members.iter().position(|m| m.node_id() == node_id)
    }

    /// Bump the revision and describe the change
    fn commit(&mut self, event: TeamEventKind) -> TeamEvent {
        self.revision += 1;
        sort_members(&mut self.members);
        TeamEvent::new(&self.snapshot(), event)
    }
}

/// One team's state behind its own lock. Every mutation of a team runs
/// inside this critical section.
#[derive(Debug)]
struct TeamHandle {
    state: Mutex<TeamState>,
}

impl TeamHandle {
    fn lock(&self) -> Result<MutexGuard<'_, TeamState>, DomainError> {
        self.state
            .lock()
            .map_err(|e| DomainError::internal(format!("Team state lock poisoned: {}", e)))
    }

    /// Lock and reject teams that were dissolved while we waited
    fn lock_active(&self, team_id: &TeamId) -> Result<MutexGuard<'_, TeamState>, DomainError> {
        let state = self.lock()?;

        if !state.team.status().is_active() {
            return Err(team_not_found(team_id));
        }

        Ok(state)
    }
}

fn team_not_found(team_id: &TeamId) -> DomainError {
    DomainError::not_found(format!("Team '{}' not found", team_id))
}

/// Authoritative membership for the teams this process leads.
///
/// The index lock only guards lookup, insert and remove. Events are built
/// under the team lock and published after it is released.
#[derive(Debug)]
pub struct TeamRegistry {
    teams: RwLock<HashMap<TeamId, Arc<TeamHandle>>>,
    hub: SyncHub,
    code_source: fn() -> TeamId,
}

impl TeamRegistry {
    pub fn new(hub: SyncHub) -> Self {
        Self::with_code_source(hub, TeamId::generate)
    }

    pub fn with_code_source(hub: SyncHub, code_source: fn() -> TeamId) -> Self {
        Self {
            teams: RwLock::new(HashMap::new()),
            hub,
            code_source,
        }
    }

    pub fn hub(&self) -> &SyncHub {
        &self.hub
    }

    /// Create a team led by `leader`. The leader is its first member.
    pub fn create_team(
        &self,
        name: &str,
        leader: &Node,
        leader_endpoint: &str,
    ) -> Result<Team, DomainError> {
        for _ in 0..MAX_CODE_ATTEMPTS {
            let team_id = (self.code_source)();
            let mut teams = self.write_index()?;

            if teams.contains_key(&team_id) {
                debug!(team_id = %team_id, "Team code collision, regenerating");
                continue;
            }

            let team = Team::new(
                team_id.clone(),
                name.trim(),
                leader.node_id().clone(),
                leader.display_name(),
                leader_endpoint,
            )
            .map_err(|e| DomainError::validation(e.to_string()))?;

            let state = TeamState {
                team: team.clone(),
                members: vec![Member::leader(
                    leader.node_id().clone(),
                    leader.display_name(),
                    leader_endpoint,
                )],
                revision: 1,
            };

            teams.insert(
                team_id.clone(),
                Arc::new(TeamHandle {
                    state: Mutex::new(state),
                }),
            );

            info!(team_id = %team_id, name = %team.name(), "Team created");
            return Ok(team);
        }

        Err(DomainError::conflict(
            "Could not allocate a unique team code",
        ))
    }

    /// Idempotent upsert of a member
    pub fn join(
        &self,
        team_id: &TeamId,
        request: &JoinRequest,
    ) -> Result<MembershipSnapshot, DomainError> {
        request
            .validate()
            .map_err(|e| DomainError::validation(e.to_string()))?;

        let handle = self.handle(team_id)?;

        let (snapshot, event) = {
            let mut state = handle.lock_active(team_id)?;

            let kind = match state.position(&request.node_id) {
                Some(index) => {
                    let member = &mut state.members[index];
                    member.refresh(&request.display_name, &request.endpoint);
                    TeamEventKind::MemberUpdated {
                        member: member.clone(),
                    }
                }
                None => {
                    let member = Member::new(
                        request.node_id.clone(),
                        &request.display_name,
                        &request.endpoint,
                    );
                    state.members.push(member.clone());
                    TeamEventKind::MemberJoined { member }
                }
            };

            let event = state.commit(kind);
            (state.snapshot(), event)
        };

        info!(
            team_id = %team_id,
            node_id = %request.node_id,
            event = event.event.name(),
            members = snapshot.len(),
            "Member joined"
        );
        self.hub.publish(event);

        Ok(snapshot)
    }

    /// Remove a member. Returns whether anything was removed.
    pub fn leave(&self, team_id: &TeamId, node_id: &NodeId) -> Result<bool, DomainError> {
        let handle = self.handle(team_id)?;

        let event = {
            let mut state = handle.lock_active(team_id)?;

            if state.team.is_led_by(node_id) {
                return Err(DomainError::validation(
                    "The leader cannot leave its own team; dissolve it instead",
                ));
            }

            let Some(index) = state.position(node_id) else {
                debug!(team_id = %team_id, node_id = %node_id, "Leave for non-member ignored");
                return Ok(false);
            };

            let member = state.members.remove(index);
            state.commit(TeamEventKind::MemberLeft {
                node_id: member.node_id().clone(),
                display_name: member.display_name().to_string(),
            })
        };

        info!(team_id = %team_id, node_id = %node_id, members = event.members.len(), "Member left");
        self.hub.publish(event);
        self.hub.close_node(team_id, node_id);

        Ok(true)
    }

    pub fn list_members(&self, team_id: &TeamId) -> Result<MembershipSnapshot, DomainError> {
        let handle = self.handle(team_id)?;
        let state = handle.lock_active(team_id)?;
        Ok(state.snapshot())
    }

    pub fn get_team(&self, team_id: &TeamId) -> Result<Team, DomainError> {
        let handle = self.handle(team_id)?;
        let state = handle.lock_active(team_id)?;
        Ok(state.team.clone())
    }

    /// Team plus a consistent member snapshot
    pub fn team_info(&self, team_id: &TeamId) -> Result<(Team, MembershipSnapshot), DomainError> {
        let handle = self.handle(team_id)?;
        let state = handle.lock_active(team_id)?;
        Ok((state.team.clone(), state.snapshot()))
    }

    pub fn list_teams(&self) -> Result<Vec<Team>, DomainError> {
        let handles: Vec<Arc<TeamHandle>> = self.read_index()?.values().cloned().collect();

        let mut teams = Vec::with_capacity(handles.len());
        for handle in handles {
            let state = handle.lock()?;
            if state.team.status().is_active() {
                teams.push(state.team.clone());
            }
        }

        teams.sort_by(|a, b| a.created_at().cmp(&b.created_at()));
        Ok(teams)
    }

    /// Dissolve a team: clear its members, mark it terminal, send the final
    /// `team_dissolved` event and close its push connections.
    pub fn dissolve(&self, team_id: &TeamId, requested_by: &NodeId) -> Result<Team, DomainError> {
        let handle = self.handle(team_id)?;

        {
            let state = handle.lock_active(team_id)?;
            if !state.team.is_led_by(requested_by) {
                return Err(DomainError::validation("Only the team leader can dissolve a team"));
            }
        }

        let handle = self
            .write_index()?
            .remove(team_id)
            .ok_or_else(|| team_not_found(team_id))?;

        let (team, event) = {
            let mut state = handle.lock()?;
            state.team.dissolve();
            state.members.clear();
            let kind = TeamEventKind::TeamDissolved {
                team_name: state.team.name().to_string(),
                dissolved_by: requested_by.clone(),
            };
            (state.team.clone(), state.commit(kind))
        };

        info!(team_id = %team_id, "Team dissolved");
        self.hub.publish(event);
        self.hub.close_team(team_id);

        Ok(team)
    }

    /// Flip a member's presence. Unknown members are ignored.
    pub fn set_online(
        &self,
        team_id: &TeamId,
        node_id: &NodeId,
        online: bool,
    ) -> Result<(), DomainError> {
        let handle = self.handle(team_id)?;

        let event = {
            let mut state = handle.lock_active(team_id)?;

            let Some(index) = state.position(node_id) else {
                return Ok(());
            };

            let member = &mut state.members[index];
            if member.is_online() == online {
                member.set_online(online);
                return Ok(());
            }
            member.set_online(online);

            let kind = if online {
                TeamEventKind::MemberOnline {
                    node_id: node_id.clone(),
                }
            } else {
                TeamEventKind::MemberOffline {
                    node_id: node_id.clone(),
                }
            };
            state.commit(kind)
        };

        debug!(team_id = %team_id, node_id = %node_id, online, "Member presence changed");
        self.hub.publish(event);

        Ok(())
    }

    /// Open a push connection for a current member. The baseline snapshot
    /// and the registration happen under the team lock, so the subscriber
    /// sees every later revision and nothing older than the baseline.
    pub fn subscribe(
        &self,
        team_id: &TeamId,
        node_id: &NodeId,
    ) -> Result<(Subscription, TeamEvent), DomainError> {
        let handle = self.handle(team_id)?;
        let state = handle.lock_active(team_id)?;

        if state.position(node_id).is_none() {
            return Err(DomainError::not_found(format!(
                "Node '{}' is not a member of team '{}'",
                node_id, team_id
            )));
        }

        let subscription = self.hub.register(team_id, node_id);
        let baseline = TeamEvent::new(&state.snapshot(), TeamEventKind::Snapshot);

        Ok((subscription, baseline))
    }

    fn handle(&self, team_id: &TeamId) -> Result<Arc<TeamHandle>, DomainError> {
        self.read_index()?
            .get(team_id)
            .cloned()
            .ok_or_else(|| team_not_found(team_id))
    }

    fn read_index(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, HashMap<TeamId, Arc<TeamHandle>>>, DomainError>
    {
        self.teams
            .read()
            .map_err(|e| DomainError::internal(format!("Failed to acquire read lock: {}", e)))
    }

    fn write_index(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<TeamId, Arc<TeamHandle>>>, DomainError>
    {
        self.teams
            .write()
            .map_err(|e| DomainError::internal(format!("Failed to acquire write lock: {}", e)))
    }
}
