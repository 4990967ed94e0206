//! Infrastructure layer - storage, networking and runtime implementations

pub mod discovery;
pub mod identity;
pub mod logging;
pub mod membership;
pub mod network;
pub(crate) mod storage;
pub mod sync;
pub mod team;
