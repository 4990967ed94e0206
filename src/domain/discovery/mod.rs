//! LAN discovery domain module

mod advert;
mod service;

pub use advert::{DiscoveredTeam, TeamAdvert, TXT_KEYS};
pub use service::Discovery;
