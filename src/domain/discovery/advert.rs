//! Advertisement record and its browse-side projection

use serde::{Deserialize, Serialize};

use crate::domain::team::{validate_endpoint, Team, TeamId};

const KEY_TEAM_ID: &str = "team_id";
const KEY_TEAM_NAME: &str = "team_name";
const KEY_LEADER_NAME: &str = "leader_name";
const KEY_LEADER_ENDPOINT: &str = "leader_endpoint";
const KEY_MEMBER_COUNT: &str = "member_count";
const KEY_VERSION: &str = "version";

/// TXT keys in the order they are published
pub const TXT_KEYS: [&str; 6] = [
    KEY_TEAM_ID,
    KEY_TEAM_NAME,
    KEY_LEADER_NAME,
    KEY_LEADER_ENDPOINT,
    KEY_MEMBER_COUNT,
    KEY_VERSION,
];

/// What a leader publishes about a team it owns
#[derive(Debug, Clone, PartialEq)]
pub struct TeamAdvert {
    pub team_id: TeamId,
    pub team_name: String,
    pub leader_name: String,
    pub leader_endpoint: String,
    pub member_count: usize,
    pub version: String,
}

impl TeamAdvert {
    pub fn for_team(team: &Team, member_count: usize) -> Self {
        Self {
            team_id: team.team_id().clone(),
            team_name: team.name().to_string(),
            leader_name: team.leader_name().to_string(),
            leader_endpoint: team.leader_endpoint().to_string(),
            member_count,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Port part of the leader endpoint
    pub fn port(&self) -> Option<u16> {
        self.leader_endpoint
            .rsplit_once(':')
            .and_then(|(_, port)| port.parse().ok())
    }

    pub fn properties(&self) -> Vec<(String, String)> {
        vec![
            (KEY_TEAM_ID.to_string(), self.team_id.to_string()),
            (KEY_TEAM_NAME.to_string(), self.team_name.clone()),
            (KEY_LEADER_NAME.to_string(), self.leader_name.clone()),
            (KEY_LEADER_ENDPOINT.to_string(), self.leader_endpoint.clone()),
            (KEY_MEMBER_COUNT.to_string(), self.member_count.to_string()),
            (KEY_VERSION.to_string(), self.version.clone()),
        ]
    }
}

/// A team seen while browsing. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredTeam {
    pub team_id: TeamId,
    pub name: String,
    pub leader_name: String,
    pub leader_endpoint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl DiscoveredTeam {
    /// Build from TXT properties. `resolved_endpoint` stands in when the
    /// record lacks a usable `leader_endpoint`. Any other missing or malformed
    /// required field drops the record.
    pub fn from_properties<F>(property: F, resolved_endpoint: Option<String>) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| property(key).filter(|v| !v.trim().is_empty());

        let team_id = TeamId::new(non_empty(KEY_TEAM_ID)?).ok()?;
        let name = non_empty(KEY_TEAM_NAME)?;
        let leader_name = non_empty(KEY_LEADER_NAME)?;
        let leader_endpoint = non_empty(KEY_LEADER_ENDPOINT)
            .filter(|e| validate_endpoint(e).is_ok())
            .or(resolved_endpoint)
            .filter(|e| validate_endpoint(e).is_ok())?;

        Some(Self {
            team_id,
            name,
            leader_name,
            leader_endpoint,
            member_count: property(KEY_MEMBER_COUNT).and_then(|v| v.parse().ok()),
            version: non_empty(KEY_VERSION),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn props(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn complete() -> HashMap<String, String> {
        props(&[
            ("team_id", "ABC123"),
            ("team_name", "Platform"),
            ("leader_name", "alice"),
            ("leader_endpoint", "10.0.0.5:19960"),
            ("member_count", "3"),
            ("version", "0.1.0"),
        ])
    }

    #[test]
    fn test_parse_complete_record() {
        let map = complete();
        let team = DiscoveredTeam::from_properties(|k| map.get(k).cloned(), None).unwrap();

        assert_eq!(team.team_id.as_str(), "ABC123");
        assert_eq!(team.name, "Platform");
        assert_eq!(team.leader_endpoint, "10.0.0.5:19960");
        assert_eq!(team.member_count, Some(3));
        assert_eq!(team.version.as_deref(), Some("0.1.0"));
    }

    #[test]
    fn test_missing_required_field_is_skipped() {
        for key in ["team_id", "team_name", "leader_name"] {
            let mut map = complete();
            map.remove(key);
            assert!(
                DiscoveredTeam::from_properties(|k| map.get(k).cloned(), None).is_none(),
                "record without {key} should be skipped"
            );
        }
    }

    #[test]
    fn test_malformed_team_id_is_skipped() {
        let mut map = complete();
        map.insert("team_id".to_string(), "not-a-code".to_string());
        assert!(DiscoveredTeam::from_properties(|k| map.get(k).cloned(), None).is_none());
    }

    #[test]
    fn test_endpoint_falls_back_to_resolved_address() {
        let mut map = complete();
        map.remove("leader_endpoint");

        let team = DiscoveredTeam::from_properties(
            |k| map.get(k).cloned(),
            Some("192.168.1.4:19960".to_string()),
        )
        .unwrap();
        assert_eq!(team.leader_endpoint, "192.168.1.4:19960");

        assert!(DiscoveredTeam::from_properties(|k| map.get(k).cloned(), None).is_none());
    }

    #[test]
    fn test_optional_fields_tolerated() {
        let mut map = complete();
        map.insert("member_count".to_string(), "many".to_string());
        map.remove("version");

        let team = DiscoveredTeam::from_properties(|k| map.get(k).cloned(), None).unwrap();
        assert_eq!(team.member_count, None);
        assert_eq!(team.version, None);
    }

    #[test]
    fn test_advert_round_trips_through_properties() {
        let advert = TeamAdvert {
            team_id: TeamId::new("ABC123").unwrap(),
            team_name: "Platform".to_string(),
            leader_name: "alice".to_string(),
            leader_endpoint: "10.0.0.5:19960".to_string(),
            member_count: 2,
            version: "0.1.0".to_string(),
        };
        let map: HashMap<String, String> = advert.properties().into_iter().collect();

        let team = DiscoveredTeam::from_properties(|k| map.get(k).cloned(), None).unwrap();
        assert_eq!(team.team_id, advert.team_id);
        assert_eq!(team.member_count, Some(2));
        assert_eq!(advert.port(), Some(19960));
    }
}
