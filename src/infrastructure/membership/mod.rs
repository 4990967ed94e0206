//! Joining, leaving and following teams

mod client;
mod local;
mod service;
mod subscriber;

pub use client::{LeaderClient, LeaderClientError};
pub use local::{ApplyOutcome, JoinedTeam, LocalMemberships};
pub use service::{parse_team_id, MembershipService};
pub use subscriber::{SubscriberHandle, SyncSubscriber};
