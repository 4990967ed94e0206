//! Peer wire types

use serde::{Deserialize, Serialize};

use crate::domain::identity::NodeId;
use crate::domain::team::{Member, MembershipSnapshot, Team, TeamEvent};

pub const SUCCESS_CODE: i64 = 0;

/// Shared response envelope. `code == 0` is success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub code: i64,
    pub message: String,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: SUCCESS_CODE,
            message: "success".to_string(),
            data: Some(data),
        }
    }

    pub fn failure(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == SUCCESS_CODE
    }
}

/// Response of the leader's team info endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamInfo {
    pub team: Team,
    pub members: Vec<Member>,
}

/// Response of a successful join
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinResult {
    pub team: Team,
    pub snapshot: MembershipSnapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaveRequest {
    pub node_id: NodeId,
}

/// Member to leader frames on the push channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Must be the first frame
    Auth {
        node_id: NodeId,
        display_name: String,
        endpoint: String,
    },
    Ping,
}

/// Leader to member frames on the push channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    AuthResult {
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Event {
        event: TeamEvent,
    },
    Pong,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_shapes() {
        let ok = serde_json::to_value(Envelope::success(LeaveRequest {
            node_id: NodeId::new("n-1").unwrap(),
        }))
        .unwrap();
        assert_eq!(ok["code"], 0);
        assert_eq!(ok["message"], "success");
        assert_eq!(ok["data"]["node_id"], "n-1");

        let failed: Envelope<TeamInfo> =
            serde_json::from_str(r#"{"code":600002,"message":"team not found"}"#).unwrap();
        assert!(!failed.is_success());
        assert!(failed.data.is_none());
    }

    #[test]
    fn test_client_frame_tags() {
        let ping = serde_json::to_string(&ClientFrame::Ping).unwrap();
        assert_eq!(ping, r#"{"type":"ping"}"#);

        let auth: ClientFrame = serde_json::from_str(
            r#"{"type":"auth","node_id":"n-1","display_name":"bob","endpoint":"10.0.0.7:19960"}"#,
        )
        .unwrap();
        assert!(matches!(auth, ClientFrame::Auth { .. }));
    }

    #[test]
    fn test_auth_result_omits_empty_error() {
        let ok = ServerFrame::AuthResult {
            success: true,
            error: None,
        };
        assert_eq!(
            serde_json::to_string(&ok).unwrap(),
            r#"{"type":"auth_result","success":true}"#
        );
    }
}
