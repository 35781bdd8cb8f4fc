use anyhow::{Context, Result};
use clap::Parser;
use std::fs::OpenOptions;
use std::io;
use std::sync::{Arc, Mutex};
use tracing::info;
use tracing_subscriber::EnvFilter;

use nhl_goal_watch::config::ScoreboardConfig;
use nhl_goal_watch::nhl::NhlClient;
use nhl_goal_watch::scoreboard::{plain, tui, Scoreboard};

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load and validate configuration
    let config = ScoreboardConfig::parse();
    config.validate()?;
    let team = config.feed.team();
    let interactive = !(config.plain || config.once);

    // The interactive screen owns stdout, so logs go to a file there.
    if interactive {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.log_file)
            .with_context(|| format!("Failed to open log file {}", config.log_file.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(env_filter())
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter())
            .with_writer(io::stderr)
            .init();
    }

    // Build the API client and display controller
    let tz = config.display_timezone()?;
    let client = NhlClient::new(
        &config.feed.api_base_url,
        &team,
        config.feed.http_timeout(),
    )?;
    let mut scoreboard = Scoreboard::new(
        Arc::new(client),
        &team,
        &config.feed.team_name,
        tz,
    );
    info!(
        "Starting NHL scoreboard for {} (refresh every {}s, times in {})",
        team, config.refresh_secs, config.timezone
    );

    // Run until quit (interactive) or forever / once (plain)
    if interactive {
        tui::run_interactive(&mut scoreboard, config.refresh_interval()).await
    } else {
        plain::run_plain(
            &mut scoreboard,
            &mut io::stdout(),
            config.refresh_interval(),
            config.once,
        )
        .await
    }
}
