//! Push channel: per-connection bounded queues and team fan-out

mod connection;
mod hub;

pub use connection::{Connection, ConnectionId, PushOutcome};
pub use hub::{Subscription, SyncHub};
