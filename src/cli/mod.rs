//! CLI module for LAN Teams
//!
//! - `serve`: run the node daemon (local API + peer API)
//! - `discover`: browse the LAN for advertised teams and print them

pub mod discover;
pub mod serve;

use clap::{Parser, Subcommand};

/// LAN Teams - serverless team membership on a local network
#[derive(Parser)]
#[command(name = "lan-teams")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the node daemon
    Serve(serve::ServeArgs),

    /// Browse the LAN for teams
    Discover(discover::DiscoverArgs),
}
