//! Domain layer - Core entities, rules and seams

pub mod discovery;
pub mod error;
pub mod identity;
pub mod membership;
pub mod network;
pub mod team;

pub use discovery::{DiscoveredTeam, Discovery, TeamAdvert};
pub use error::DomainError;
pub use identity::{IdentityRepository, Node, NodeId};
pub use membership::{ClientFrame, JoinResult, LeaderApi, LeaveRequest, ServerFrame, TeamInfo};
pub use network::{NetworkConfig, NetworkConfigRepository};
pub use team::{
    JoinRequest, Member, MembershipSnapshot, Team, TeamEvent, TeamEventKind, TeamId, TeamStatus,
    TeamValidationError,
};
