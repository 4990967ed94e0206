//! Membership protocol domain module
//!
//! Wire types exchanged between a member and a leader, and the seam the
//! caller side uses to reach a leader.

mod leader;
mod protocol;

pub use leader::LeaderApi;
pub use protocol::{
    ClientFrame, Envelope, JoinResult, LeaveRequest, ServerFrame, TeamInfo, SUCCESS_CODE,
};

#[cfg(test)]
pub use leader::MockLeaderApi;
