//! Push channel served by a leader.
//!
//! The member must send an `auth` frame within `auth_timeout`. After a
//! successful `auth_result` the member receives the current snapshot and
//! then every later team event. The server pings every
//! `heartbeat_interval`; any inbound frame counts as a sign of life.

use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::Response,
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::api::state::AppState;
use crate::api::types::ApiError;
use crate::domain::identity::NodeId;
use crate::domain::membership::{ClientFrame, ServerFrame};
use crate::domain::team::TeamId;
use crate::infrastructure::membership::parse_team_id;

type Sink = SplitSink<WebSocket, Message>;

/// GET /team/{team_id}/ws
pub async fn push_channel(
    State(state): State<AppState>,
    Path(team_id): Path<String>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let team_id = parse_team_id(&team_id)?;
    Ok(ws.on_upgrade(move |socket| serve_socket(state, team_id, socket)))
}

async fn serve_socket(state: AppState, team_id: TeamId, socket: WebSocket) {
    let (mut sink, mut stream) = socket.split();
    let sync = state.config.sync.clone();

    let node_id = match authenticate(&mut stream, sync.auth_timeout()).await {
        Ok(node_id) => node_id,
        Err(reason) => {
            debug!(team_id = %team_id, reason = %reason, "Push authentication failed");
            reject(&mut sink, reason).await;
            return;
        }
    };

    let (subscription, baseline) = match state.membership_service.open_push(&team_id, &node_id) {
        Ok(opened) => opened,
        Err(e) => {
            debug!(team_id = %team_id, node_id = %node_id, error = %e, "Push channel refused");
            reject(&mut sink, e.to_string()).await;
            return;
        }
    };

    let accepted = ServerFrame::AuthResult {
        success: true,
        error: None,
    };
    if send_frame(&mut sink, &accepted).await.is_err()
        || send_frame(&mut sink, &ServerFrame::Event { event: baseline }).await.is_err()
    {
        drop(subscription);
        state.membership_service.close_push(&team_id, &node_id);
        return;
    }

    info!(team_id = %team_id, node_id = %node_id, "Push channel open");

    let mut heartbeat = interval(sync.heartbeat_interval().max(Duration::from_secs(1)));
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
    heartbeat.tick().await;

    loop {
        tokio::select! {
            event = subscription.recv() => {
                let Some(event) = event else {
                    break;
                };

                let dissolved = event.is_dissolved();
                let frame = ServerFrame::Event {
                    event: (*event).clone(),
                };
                if send_frame(&mut sink, &frame).await.is_err() || dissolved {
                    break;
                }
            }
            message = stream.next() => {
                let Some(Ok(message)) = message else {
                    break;
                };
                subscription.touch();

                match message {
                    Message::Text(text) => {
                        if let Ok(ClientFrame::Ping) = serde_json::from_str(text.as_str()) {
                            if send_frame(&mut sink, &ServerFrame::Pong).await.is_err() {
                                break;
                            }
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            _ = heartbeat.tick() => {
                if sink.send(Message::Ping(Default::default())).await.is_err() {
                    break;
                }
            }
        }
    }

    drop(subscription);
    state.membership_service.close_push(&team_id, &node_id);
    let _ = sink.close().await;

    info!(team_id = %team_id, node_id = %node_id, "Push channel closed");
}

/// Wait for the `auth` frame. Control frames before it are skipped.
async fn authenticate(
    stream: &mut SplitStream<WebSocket>,
    limit: Duration,
) -> Result<NodeId, String> {
    let frame = timeout(limit, async {
        while let Some(message) = stream.next().await {
            match message {
                Ok(Message::Text(text)) => return Some(text),
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
                _ => return None,
            }
        }
        None
    })
    .await
    .map_err(|_| "authentication timed out".to_string())?
    .ok_or_else(|| "expected an auth frame".to_string())?;

    match serde_json::from_str::<ClientFrame>(frame.as_str()) {
        Ok(ClientFrame::Auth {
            node_id,
            display_name,
            ..
        }) => {
            debug!(node_id = %node_id, name = %display_name, "Push auth received");
            Ok(node_id)
        }
        Ok(_) => Err("first frame must be auth".to_string()),
        Err(e) => Err(format!("malformed auth frame: {}", e)),
    }
}

async fn reject(sink: &mut Sink, reason: String) {
    let frame = ServerFrame::AuthResult {
        success: false,
        error: Some(reason),
    };

    if let Err(e) = send_frame(sink, &frame).await {
        warn!(error = %e, "Failed to send auth rejection");
    }
    let _ = sink.close().await;
}

async fn send_frame(sink: &mut Sink, frame: &ServerFrame) -> Result<(), axum::Error> {
    let text = match serde_json::to_string(frame) {
        Ok(text) => text,
        Err(e) => {
            warn!(error = %e, "Failed to encode push frame");
            return Ok(());
        }
    };

    sink.send(Message::Text(text.into())).await
}
