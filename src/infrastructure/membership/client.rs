//! HTTP client for a leader's peer API

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::domain::identity::NodeId;
use crate::domain::membership::{Envelope, JoinResult, LeaderApi, LeaveRequest, TeamInfo};
use crate::domain::team::{JoinRequest, MembershipSnapshot, TeamId};
use crate::domain::DomainError;

/// Failure of a single leader call
#[derive(Debug, Error)]
pub enum LeaderClientError {
    /// Unreachable, timed out, or not an envelope
    #[error("Leader at {endpoint} unreachable: {message}")]
    Connectivity { endpoint: String, message: String },

    /// Leader answered with a non-zero code
    #[error("Leader rejected request ({code}): {message}")]
    Business { code: i64, message: String },
}

impl From<LeaderClientError> for DomainError {
    fn from(err: LeaderClientError) -> Self {
        match err {
            LeaderClientError::Business { code, message } => DomainError::business(code, message),
            other => DomainError::connectivity(other.to_string()),
        }
    }
}

/// reqwest-backed `LeaderApi`
#[derive(Debug, Clone)]
pub struct LeaderClient {
    client: reqwest::Client,
}

impl LeaderClient {
    pub fn new(request_timeout: Duration, connect_timeout: Duration) -> Result<Self, DomainError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .connect_timeout(connect_timeout.min(request_timeout))
            .build()
            .map_err(|e| DomainError::internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        path: &str,
    ) -> Result<T, LeaderClientError> {
        let request = self.client.get(url(endpoint, path));
        let data = self.send(endpoint, request).await?;
        require_data(endpoint, data)
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        endpoint: &str,
        path: &str,
        body: &B,
    ) -> Result<T, LeaderClientError> {
        let request = self.client.post(url(endpoint, path)).json(body);
        let data = self.send(endpoint, request).await?;
        require_data(endpoint, data)
    }

    /// Send and unwrap the envelope. `data` may legitimately be absent.
    async fn send<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<Option<T>, LeaderClientError> {
        let connectivity = |message: String| LeaderClientError::Connectivity {
            endpoint: endpoint.to_string(),
            message,
        };

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                connectivity("request timed out".to_string())
            } else {
                connectivity(format!("request failed: {}", e))
            }
        })?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| connectivity(format!("failed to read response: {}", e)))?;

        // Any status is acceptable as long as the body is an envelope
        let envelope: Envelope<T> = serde_json::from_slice(&body).map_err(|e| {
            connectivity(format!("HTTP {} with unparseable body: {}", status, e))
        })?;

        if !envelope.is_success() {
            debug!(endpoint = %endpoint, code = envelope.code, "Leader returned error envelope");
            return Err(LeaderClientError::Business {
                code: envelope.code,
                message: envelope.message,
            });
        }

        Ok(envelope.data)
    }
}

fn require_data<T>(endpoint: &str, data: Option<T>) -> Result<T, LeaderClientError> {
    data.ok_or_else(|| LeaderClientError::Connectivity {
        endpoint: endpoint.to_string(),
        message: "success envelope without data".to_string(),
    })
}

fn url(endpoint: &str, path: &str) -> String {
    format!("http://{}{}", endpoint, path)
}

#[async_trait]
impl LeaderApi for LeaderClient {
    async fn fetch_info(
        &self,
        endpoint: &str,
        team_id: Option<TeamId>,
    ) -> Result<TeamInfo, DomainError> {
        let path = match team_id {
            Some(team_id) => format!("/team/{}/info", team_id),
            None => "/team/info".to_string(),
        };

        Ok(self.get(endpoint, &path).await?)
    }

    async fn join(
        &self,
        endpoint: &str,
        team_id: &TeamId,
        request: &JoinRequest,
    ) -> Result<JoinResult, DomainError> {
        Ok(self
            .post(endpoint, &format!("/team/{}/join", team_id), request)
            .await?)
    }

    async fn leave(
        &self,
        endpoint: &str,
        team_id: &TeamId,
        node_id: &NodeId,
    ) -> Result<(), DomainError> {
        let body = LeaveRequest {
            node_id: node_id.clone(),
        };

        let request = self
            .client
            .post(url(endpoint, &format!("/team/{}/leave", team_id)))
            .json(&body);
        let _: Option<serde_json::Value> = self.send(endpoint, request).await?;
        Ok(())
    }

    async fn members(
        &self,
        endpoint: &str,
        team_id: &TeamId,
    ) -> Result<MembershipSnapshot, DomainError> {
        Ok(self
            .get(endpoint, &format!("/team/{}/members", team_id))
            .await?)
    }
}
