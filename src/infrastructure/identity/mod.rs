//! Identity infrastructure implementations

mod repository;
mod service;

pub use repository::{FileIdentityRepository, InMemoryIdentityRepository};
pub use service::IdentityService;
