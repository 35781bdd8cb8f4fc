use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::info;

use nhl_goal_watch::config::NotifierConfig;
use nhl_goal_watch::db::NotifiedStore;
use nhl_goal_watch::nhl::NhlClient;
use nhl_goal_watch::notifier::{GoalMonitor, LogNotifier, Notifier, SmtpNotifier};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = NotifierConfig::parse();
    config.validate()?;
    let team = config.feed.team();

    // Pick the alert channel
    let notifier: Arc<dyn Notifier> = if config.dry_run {
        info!("🟡 DRY RUN mode – alerts are logged, not sent");
        Arc::new(LogNotifier)
    } else {
        let destination = config.destination().context("PHONE_NUMBER is required")?;
        let server = config.smtp_server.as_deref().context("SMTP_SERVER is required")?;
        let username = config.smtp_username.as_deref().context("SMTP_USERNAME is required")?;
        let password = config.smtp_password.as_deref().context("SMTP_PASSWORD is required")?;
        info!("📱 Alerts go to {} via {}:{}", destination, server, config.smtp_port);
        Arc::new(SmtpNotifier::new(
            server,
            config.smtp_port,
            username,
            password,
            &destination,
            config.feed.http_timeout(),
        )?)
    };

    // Open state database
    let store = NotifiedStore::open(&config.state_path)?;
    info!(
        "State database opened: {} ({} goals already notified)",
        config.state_path.display(),
        store.count()?
    );

    // Initialize NHL client
    let client = NhlClient::new(
        &config.feed.api_base_url,
        &team,
        config.feed.http_timeout(),
    )?;

    let mut monitor = GoalMonitor::new(
        Arc::new(client),
        notifier,
        store,
        &team,
        &config.feed.team_name,
    );

    // Poll until Ctrl-C
    tokio::select! {
        _ = monitor.run(config.check_interval()) => {}
        res = tokio::signal::ctrl_c() => {
            res.context("Failed to listen for Ctrl-C")?;
            info!("👋 Stopping goal monitor");
        }
    }
    Ok(())
}
