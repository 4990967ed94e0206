//! Team infrastructure implementations

mod registry;

pub use registry::TeamRegistry;
