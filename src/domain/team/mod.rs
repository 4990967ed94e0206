//! Team domain module
//!
//! A team is owned by exactly one leader process. Its member set is keyed by
//! node id and only the leader mutates it; everyone else holds a view that
//! the push channel keeps current.

mod entity;
mod event;
mod member;
mod validation;

pub use entity::{Team, TeamId, TeamStatus};
pub use event::{TeamEvent, TeamEventKind};
pub use member::{sort_members, JoinRequest, Member, MembershipSnapshot};
pub use validation::{
    validate_display_name, validate_endpoint, validate_team_id, validate_team_name,
    TeamValidationError, TEAM_ID_LENGTH,
};
