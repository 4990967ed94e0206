//! A single push connection and its bounded outbound queue

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tokio::sync::Notify;

use crate::config::OverflowPolicy;
use crate::domain::identity::NodeId;
use crate::domain::team::{TeamEvent, TeamId};

pub type ConnectionId = u64;

/// Result of handing an event to a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Queued,
    /// Queue was full; the oldest queued event was discarded
    DroppedOldest,
    /// Queue was full and the policy closed the connection
    Closed,
    /// Connection was already closed
    Rejected,
}

#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    team_id: TeamId,
    node_id: NodeId,
    capacity: usize,
    policy: OverflowPolicy,
    queue: Mutex<VecDeque<Arc<TeamEvent>>>,
    notify: Notify,
    closed: AtomicBool,
    last_seen: Mutex<Instant>,
    dropped: AtomicU64,
}

impl Connection {
    pub(super) fn new(
        id: ConnectionId,
        team_id: TeamId,
        node_id: NodeId,
        capacity: usize,
        policy: OverflowPolicy,
    ) -> Self {
        Self {
            id,
            team_id,
            node_id,
            capacity: capacity.max(1),
            policy,
            queue: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            closed: AtomicBool::new(false),
            last_seen: Mutex::new(Instant::now()),
            dropped: AtomicU64::new(0),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn team_id(&self) -> &TeamId {
        &self.team_id
    }

    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Events discarded by the drop-oldest policy so far
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn queued(&self) -> usize {
        self.lock_queue().len()
    }

    /// Record inbound traffic from the peer
    pub fn touch(&self) {
        *self.lock_last_seen() = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        self.lock_last_seen().elapsed()
    }

    /// Close the connection. Already queued events can still be received.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.notify.notify_one();
    }

    /// Never blocks the publisher
    pub(super) fn push(&self, event: Arc<TeamEvent>) -> PushOutcome {
        if self.is_closed() {
            return PushOutcome::Rejected;
        }

        let outcome = {
            let mut queue = self.lock_queue();

            if queue.len() < self.capacity {
                queue.push_back(event);
                PushOutcome::Queued
            } else {
                match self.policy {
                    OverflowPolicy::DropOldest => {
                        queue.pop_front();
                        queue.push_back(event);
                        self.dropped.fetch_add(1, Ordering::Relaxed);
                        PushOutcome::DroppedOldest
                    }
                    OverflowPolicy::Close => {
                        queue.clear();
                        PushOutcome::Closed
                    }
                }
            }
        };

        if outcome == PushOutcome::Closed {
            self.close();
        } else {
            self.notify.notify_one();
        }

        outcome
    }

    /// Next queued event; `None` once the connection is closed and drained
    pub async fn recv(&self) -> Option<Arc<TeamEvent>> {
        loop {
            let next = self.lock_queue().pop_front();
            if let Some(event) = next {
                return Some(event);
            }

            if self.is_closed() {
                return None;
            }

            self.notify.notified().await;
        }
    }

    fn lock_queue(&self) -> MutexGuard<'_, VecDeque<Arc<TeamEvent>>> {
        self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_last_seen(&self) -> MutexGuard<'_, Instant> {
        self.last_seen
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
