//! API layer - local control endpoints and the peer surface

pub mod health;
pub mod local;
pub mod peer;
pub mod router;
pub mod state;
pub mod types;

pub use router::create_router;
pub use state::AppState;
