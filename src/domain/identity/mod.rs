//! Identity domain module
//!
//! Every process has exactly one node identity. Its id is what teams key
//! members by, so it survives restarts and renames.

mod entity;
mod repository;

pub use entity::{Node, NodeId, NodeIdError};
pub use repository::IdentityRepository;

#[cfg(test)]
pub use repository::MockIdentityRepository;
