//! Discover command - one-shot LAN browse

use std::time::Duration;

use clap::Args;

use crate::config::AppConfig;
use crate::domain::discovery::DiscoveredTeam;
use crate::infrastructure::discovery::create_discovery;
use crate::infrastructure::logging::init_logging;

#[derive(Args, Debug, Default)]
pub struct DiscoverArgs {
    /// Seconds to browse (defaults to discovery.default_timeout_secs)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: DiscoverArgs) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().unwrap_or_default();
    init_logging(&config.logging);

    let secs = args
        .timeout
        .unwrap_or(config.discovery.default_timeout_secs)
        .max(1);

    let discovery = create_discovery(&config.discovery);
    let teams = discovery.discover(Duration::from_secs(secs)).await;
    discovery.shutdown().await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&teams)?);
    } else {
        print!("{}", render_table(&teams));
    }

    Ok(())
}

fn render_table(teams: &[DiscoveredTeam]) -> String {
    if teams.is_empty() {
        return "No teams found\n".to_string();
    }

    let mut out = format!(
        "{:<8} {:<24} {:<16} {:<22} {}\n",
        "TEAM", "NAME", "LEADER", "ENDPOINT", "MEMBERS"
    );
    for team in teams {
        let members = team
            .member_count
            .map(|n| n.to_string())
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "{:<8} {:<24} {:<16} {:<22} {}\n",
            team.team_id.as_str(),
            team.name,
            team.leader_name,
            team.leader_endpoint,
            members
        ));
    }
    out
}
