//! Team entity and related types

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::validation::{validate_team_id, validate_team_name, TeamValidationError, TEAM_ID_LENGTH};
use crate::domain::identity::NodeId;

/// Team code - six ASCII letters or digits, stored upper-case
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TeamId(String);

impl TeamId {
    /// Create a new TeamId after validation
    pub fn new(id: impl Into<String>) -> Result<Self, TeamValidationError> {
        let id = id.into();
        validate_team_id(&id)?;
        Ok(Self(id.to_ascii_uppercase()))
    }

    /// Draw a random code from `A-Z0-9`
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let code = (0..TEAM_ID_LENGTH)
            .map(|_| TEAM_ID_ALPHABET[rng.gen_range(0..TEAM_ID_ALPHABET.len())] as char)
            .collect();

        Self(code)
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

const TEAM_ID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

impl TryFrom<String> for TeamId {
    type Error = TeamValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TeamId> for String {
    fn from(id: TeamId) -> Self {
        id.0
    }
}

impl std::fmt::Display for TeamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status of a team
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TeamStatus {
    /// Team accepts joins and leaves
    #[default]
    Active,
    /// Terminal; the leader dissolved the team
    Dissolved,
}

impl TeamStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl std::fmt::Display for TeamStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Dissolved => write!(f, "dissolved"),
        }
    }
}

/// Team entity, owned by the leader process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    team_id: TeamId,
    name: String,
    leader_node_id: NodeId,
    leader_name: String,
    /// `host:port` where the leader serves the peer API
    leader_endpoint: String,
    created_at: DateTime<Utc>,
    #[serde(default)]
    status: TeamStatus,
}

impl Team {
    /// Create a new active team
    pub fn new(
        team_id: TeamId,
        name: impl Into<String>,
        leader_node_id: NodeId,
        leader_name: impl Into<String>,
        leader_endpoint: impl Into<String>,
    ) -> Result<Self, TeamValidationError> {
        let name = name.into();
        validate_team_name(&name)?;

        Ok(Self {
            team_id,
            name,
            leader_node_id,
            leader_name: leader_name.into(),
            leader_endpoint: leader_endpoint.into(),
            created_at: Utc::now(),
            status: TeamStatus::Active,
        })
    }

    pub fn team_id(&self) -> &TeamId {
        &self.team_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn leader_node_id(&self) -> &NodeId {
        &self.leader_node_id
    }

    pub fn leader_name(&self) -> &str {
        &self.leader_name
    }

    pub fn leader_endpoint(&self) -> &str {
        &self.leader_endpoint
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn status(&self) -> TeamStatus {
        self.status
    }

    pub fn is_led_by(&self, node_id: &NodeId) -> bool {
        &self.leader_node_id == node_id
    }

    /// Mark the team terminal
    pub fn dissolve(&mut self) {
        self.status = TeamStatus::Dissolved;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leader() -> NodeId {
        NodeId::generate()
    }

    #[test]
    fn test_team_id_is_uppercased() {
        let id = TeamId::new("ab12cd").unwrap();
        assert_eq!(id.as_str(), "AB12CD");
    }

    #[test]
    fn test_generated_team_id_is_valid() {
        for _ in 0..100 {
            let id = TeamId::generate();
            assert!(validate_team_id(id.as_str()).is_ok());
            assert_eq!(id.as_str(), id.as_str().to_ascii_uppercase());
        }
    }

    #[test]
    fn test_team_id_invalid() {
        assert!(TeamId::new("").is_err());
        assert!(TeamId::new("ABCDEFG").is_err());
        assert!(TeamId::new("AB_CDE").is_err());
    }

    #[test]
    fn test_team_id_deserialize_validates() {
        let ok: TeamId = serde_json::from_str("\"xy99zz\"").unwrap();
        assert_eq!(ok.as_str(), "XY99ZZ");
        assert!(serde_json::from_str::<TeamId>("\"nope\"").is_err());
    }

    #[test]
    fn test_team_creation() {
        let node = leader();
        let team = Team::new(
            TeamId::new("ABC123").unwrap(),
            "Platform",
            node.clone(),
            "alice",
            "10.0.0.5:19960",
        )
        .unwrap();

        assert_eq!(team.name(), "Platform");
        assert!(team.status().is_active());
        assert!(team.is_led_by(&node));
        assert!(!team.is_led_by(&NodeId::generate()));
    }

    #[test]
    fn test_team_empty_name_rejected() {
        let result = Team::new(
            TeamId::new("ABC123").unwrap(),
            "",
            leader(),
            "alice",
            "10.0.0.5:19960",
        );
        assert_eq!(result.unwrap_err(), TeamValidationError::EmptyName);
    }

    #[test]
    fn test_dissolve_is_terminal() {
        let mut team = Team::new(
            TeamId::new("ABC123").unwrap(),
            "Platform",
            leader(),
            "alice",
            "10.0.0.5:19960",
        )
        .unwrap();

        team.dissolve();
        assert_eq!(team.status(), TeamStatus::Dissolved);
        assert_eq!(team.status().to_string(), "dissolved");
    }
}
