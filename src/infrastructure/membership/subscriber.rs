//! Member-side push client.
//!
//! Keeps one WebSocket open to the leader of a joined team and feeds every
//! event into [`LocalMemberships`]. A dropped connection is retried with
//! exponential backoff. A session with no inbound frame for
//! `heartbeat_timeout` is dropped and counts as a failed attempt. The
//! membership is forgotten (the node becomes
//! `NotJoined`) when the team is dissolved, when the leader refuses the
//! handshake, or when `max_reconnect_attempts` consecutive attempts fail.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::{SinkExt, StreamExt};
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, sleep_until, timeout, Instant, MissedTickBehavior};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use super::local::{ApplyOutcome, LocalMemberships};
use crate::config::SyncConfig;
use crate::domain::identity::NodeId;
use crate::domain::membership::{ClientFrame, ServerFrame};
use crate::domain::team::TeamId;
use crate::domain::DomainError;

/// How a connected session ended
#[derive(Debug, PartialEq, Eq)]
enum SessionEnd {
    /// Authenticated, then lost. Worth reconnecting.
    Disconnected,
    /// Nothing heard from the leader within the heartbeat timeout
    Silent,
    Dissolved,
    Rejected(String),
}

/// Everything needed to (re)open the push channel of one team
#[derive(Debug, Clone)]
pub struct SyncSubscriber {
    team_id: TeamId,
    leader_endpoint: String,
    node_id: NodeId,
    display_name: String,
    endpoint: String,
    joined_at: DateTime<Utc>,
    local: Arc<LocalMemberships>,
    sync: SyncConfig,
    connect_timeout: Duration,
}

impl SyncSubscriber {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        team_id: TeamId,
        leader_endpoint: impl Into<String>,
        node_id: NodeId,
        display_name: impl Into<String>,
        endpoint: impl Into<String>,
        joined_at: DateTime<Utc>,
        local: Arc<LocalMemberships>,
        sync: SyncConfig,
        connect_timeout: Duration,
    ) -> Self {
        Self {
            team_id,
            leader_endpoint: leader_endpoint.into(),
            node_id,
            display_name: display_name.into(),
            endpoint: endpoint.into(),
            joined_at,
            local,
            sync,
            connect_timeout,
        }
    }

    pub fn url(&self) -> String {
        format!("ws://{}/team/{}/ws", self.leader_endpoint, self.team_id)
    }

    pub fn spawn(self) -> SubscriberHandle {
        let team_id = self.team_id.clone();
        SubscriberHandle::from_task(team_id, tokio::spawn(self.run()))
    }

    async fn run(self) {
        let mut failures: u32 = 0;

        loop {
            match self.session().await {
                Ok(SessionEnd::Dissolved) => {
                    info!(team_id = %self.team_id, "Team dissolved by leader");
                    self.forget();
                    return;
                }
                Ok(SessionEnd::Rejected(reason)) => {
                    warn!(team_id = %self.team_id, reason = %reason, "Leader refused push channel");
                    self.forget();
                    return;
                }
                Ok(SessionEnd::Disconnected) => {
                    info!(team_id = %self.team_id, "Push channel lost, reconnecting");
                    failures = 0;
                }
                Ok(SessionEnd::Silent) => {
                    failures += 1;
                    warn!(team_id = %self.team_id, attempt = failures, "Leader went silent");
                }
                Err(e) => {
                    failures += 1;
                    debug!(team_id = %self.team_id, attempt = failures, error = %e, "Push connect failed");
                }
            }

            let limit = self.sync.max_reconnect_attempts;
            if limit > 0 && failures >= limit {
                warn!(
                    team_id = %self.team_id,
                    attempts = failures,
                    "Leader unreachable, leaving team locally"
                );
                self.forget();
                return;
            }

            sleep(self.sync.reconnect_delay(failures.saturating_sub(1))).await;
        }
    }

    fn forget(&self) {
        self.local.remove_session(&self.team_id, self.joined_at);
    }

    /// One connection attempt. `Err` means the session never authenticated.
    async fn session(&self) -> Result<SessionEnd, DomainError> {
        let url = self.url();
        let (stream, _) = timeout(self.connect_timeout, connect_async(url.as_str()))
            .await
            .map_err(|_| DomainError::connectivity(format!("Connecting to {} timed out", url)))?
            .map_err(|e| DomainError::connectivity(format!("Connecting to {} failed: {}", url, e)))?;

        let (mut sink, mut stream) = stream.split();

        let auth = ClientFrame::Auth {
            node_id: self.node_id.clone(),
            display_name: self.display_name.clone(),
            endpoint: self.endpoint.clone(),
        };
        send_frame(&mut sink, &auth).await?;

        let handshake = timeout(self.sync.auth_timeout(), async {
            while let Some(message) = stream.next().await {
                let message = message
                    .map_err(|e| DomainError::connectivity(format!("Push channel error: {}", e)))?;

                if let Some(ServerFrame::AuthResult { success, error }) = parse_frame(&message) {
                    return Ok((success, error));
                }
            }
            Err(DomainError::connectivity("Push channel closed during handshake"))
        })
        .await
        .map_err(|_| DomainError::connectivity("Push handshake timed out"))??;

        if let (false, error) = handshake {
            return Ok(SessionEnd::Rejected(
                error.unwrap_or_else(|| "authentication failed".to_string()),
            ));
        }

        info!(team_id = %self.team_id, leader = %self.leader_endpoint, "Push channel open");

        let mut heartbeat = interval(self.sync.heartbeat_interval().max(Duration::from_secs(1)));
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        heartbeat.tick().await;

        let idle_limit = self.sync.heartbeat_timeout().max(Duration::from_secs(1));
        let mut last_inbound = Instant::now();

        loop {
            tokio::select! {
                message = stream.next() => {
                    last_inbound = Instant::now();
                    let message = match message {
                        Some(Ok(message)) => message,
                        Some(Err(e)) => {
                            debug!(team_id = %self.team_id, error = %e, "Push channel read failed");
                            return Ok(SessionEnd::Disconnected);
                        }
                        None => return Ok(SessionEnd::Disconnected),
                    };

                    if let Message::Close(_) = message {
                        return Ok(SessionEnd::Disconnected);
                    }

                    if let Some(ServerFrame::Event { event }) = parse_frame(&message) {
                        if event.is_dissolved() {
                            return Ok(SessionEnd::Dissolved);
                        }
                        if self.local.apply_event(&event) == ApplyOutcome::Unknown {
                            // Left locally while the channel was still open
                            return Ok(SessionEnd::Rejected("membership no longer held".to_string()));
                        }
                    }
                }
                _ = heartbeat.tick() => {
                    if send_frame(&mut sink, &ClientFrame::Ping).await.is_err() {
                        return Ok(SessionEnd::Disconnected);
                    }
                }
                _ = sleep_until(last_inbound + idle_limit) => {
                    return Ok(SessionEnd::Silent);
                }
            }
        }
    }
}

async fn send_frame<S>(sink: &mut S, frame: &ClientFrame) -> Result<(), DomainError>
where
    S: futures::Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    let text = serde_json::to_string(frame)
        .map_err(|e| DomainError::internal(format!("Failed to encode frame: {}", e)))?;

    sink.send(Message::Text(text.into()))
        .await
        .map_err(|e| DomainError::connectivity(format!("Push channel write failed: {}", e)))
}

fn parse_frame(message: &Message) -> Option<ServerFrame> {
    let Message::Text(text) = message else {
        return None;
    };

    match serde_json::from_str(text.as_str()) {
        Ok(frame) => Some(frame),
        Err(e) => {
            debug!(error = %e, "Ignoring unrecognized push frame");
            None
        }
    }
}

/// Running subscriber. Dropping or stopping it closes the push channel.
#[derive(Debug)]
pub struct SubscriberHandle {
    team_id: TeamId,
    task: JoinHandle<()>,
}

impl SubscriberHandle {
    pub(super) fn from_task(team_id: TeamId, task: JoinHandle<()>) -> Self {
        Self { team_id, task }
    }

    pub fn team_id(&self) -> &TeamId {
        &self.team_id
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub fn stop(&self) {
        self.task.abort();
    }
}

impl Drop for SubscriberHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::team::{Member, MembershipSnapshot, Team};
    use crate::infrastructure::membership::local::JoinedTeam;

    fn subscriber(local: Arc<LocalMemberships>, leader_endpoint: &str) -> (SyncSubscriber, TeamId) {
        let leader = NodeId::generate();
        let team = Team::new(
            TeamId::new("ABC123").unwrap(),
            "Platform",
            leader.clone(),
            "alice",
            leader_endpoint,
        )
        .unwrap();
        let snapshot = MembershipSnapshot::new(
            team.team_id().clone(),
            1,
            vec![Member::leader(leader, "alice", leader_endpoint)],
        );
        let joined = JoinedTeam::new(team.clone(), false, leader_endpoint, snapshot);
        let joined_at = joined.joined_at;
        local.insert(joined);

        let sync = SyncConfig {
            reconnect_min_secs: 0,
            reconnect_max_secs: 0,
            max_reconnect_attempts: 2,
            ..SyncConfig::default()
        };

        let subscriber = SyncSubscriber::new(
            team.team_id().clone(),
            leader_endpoint,
            NodeId::generate(),
            "bob",
            "127.0.0.1:1",
            joined_at,
            local,
            sync,
            Duration::from_millis(500),
        );

        (subscriber, team.team_id().clone())
    }

    #[test]
    fn test_url() {
        let (subscriber, _) = subscriber(Arc::new(LocalMemberships::new()), "10.0.0.5:19960");
        assert_eq!(subscriber.url(), "ws://10.0.0.5:19960/team/ABC123/ws");
    }

    #[tokio::test]
    async fn test_unreachable_leader_drops_membership_after_attempts() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let local = Arc::new(LocalMemberships::new());
        let (subscriber, team_id) = subscriber(local.clone(), &addr.to_string());
        assert!(local.contains(&team_id));

        let handle = subscriber.spawn();
        tokio::time::timeout(Duration::from_secs(5), async {
            while !handle.is_finished() {
                sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .unwrap();

        assert!(!local.contains(&team_id));
    }

    #[tokio::test]
    async fn test_silent_leader_drops_membership() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        // accepts and authenticates, then never reads or writes again
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
                let _auth = ws.next().await;
                let accepted = serde_json::to_string(&ServerFrame::AuthResult {
                    success: true,
                    error: None,
                })
                .unwrap();
                ws.send(Message::Text(accepted.into())).await.unwrap();
                held.push(ws);
            }
        });

        let local = Arc::new(LocalMemberships::new());
        let (mut subscriber, team_id) = subscriber(local.clone(), &addr.to_string());
        subscriber.sync.heartbeat_interval_secs = 1;
        subscriber.sync.heartbeat_timeout_secs = 2;
        subscriber.sync.max_reconnect_attempts = 1;

        let handle = subscriber.spawn();
        tokio::time::timeout(Duration::from_secs(10), async {
            while !handle.is_finished() {
                sleep(Duration::from_millis(50)).await;
            }
        })
        .await
        .unwrap();

        assert!(!local.contains(&team_id));
    }

    #[tokio::test]
    async fn test_stop_keeps_membership() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let local = Arc::new(LocalMemberships::new());
        let (mut subscriber, team_id) = subscriber(local.clone(), &addr.to_string());
        subscriber.sync.max_reconnect_attempts = 0;
        subscriber.sync.reconnect_min_secs = 1;
        subscriber.sync.reconnect_max_secs = 1;

        let handle = subscriber.spawn();
        sleep(Duration::from_millis(50)).await;
        handle.stop();
        sleep(Duration::from_millis(20)).await;

        assert!(handle.is_finished());
        assert!(local.contains(&team_id));
    }
}
