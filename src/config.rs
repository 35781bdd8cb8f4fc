use chrono_tz::Tz;
use clap::{Args, Parser};
use std::path::PathBuf;
use std::time::Duration;

use crate::nhl::client::DEFAULT_BASE_URL;

/// Settings shared by both binaries.
#[derive(Args, Debug, Clone)]
pub struct FeedArgs {
    /// NHL web API base URL
    #[arg(long, env = "NHL_API_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub api_base_url: String,

    /// Per-request timeout in seconds
    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value = "10")]
    pub http_timeout_secs: u64,

    /// Favorite team abbreviation
    #[arg(long, env = "FAVORITE_TEAM", default_value = "PHI")]
    pub team: String,

    /// Favorite team display name, used in panel titles and alerts
    #[arg(long, env = "FAVORITE_TEAM_NAME", default_value = "Flyers")]
    pub team_name: String,
}

impl FeedArgs {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Favorite team abbreviation, trimmed and upper-cased.
    pub fn team(&self) -> String {
        self.team.trim().to_uppercase()
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.http_timeout_secs == 0 {
            anyhow::bail!("http_timeout_secs must be positive");
        }
        let team = self.team();
        if team.len() != 3 || !team.chars().all(|c| c.is_ascii_alphabetic()) {
            anyhow::bail!("team must be a three-letter abbreviation, got '{}'", self.team);
        }
        if self.team_name.trim().is_empty() {
            anyhow::bail!("team_name must not be empty");
        }
        Ok(())
    }
}

/// Terminal scoreboard for today's NHL games
#[derive(Parser, Debug, Clone)]
#[command(name = "nhl-scoreboard", version, about)]
pub struct ScoreboardConfig {
    #[command(flatten)]
    pub feed: FeedArgs,

    /// Print plain lines instead of the interactive screen
    #[arg(long)]
    pub plain: bool,

    /// Print a single update as plain lines and exit
    #[arg(long)]
    pub once: bool,

    /// Seconds between refreshes
    #[arg(long, env = "REFRESH_SECS", default_value = "120")]
    pub refresh_secs: u64,

    /// IANA time zone used for start times
    #[arg(long, env = "DISPLAY_TIMEZONE", default_value = "America/Denver")]
    pub timezone: String,

    /// Log file for the interactive screen (plain mode logs to stderr)
    #[arg(long, env = "LOG_FILE", default_value = "nhl-scoreboard.log")]
    pub log_file: PathBuf,
}

impl ScoreboardConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        self.feed.validate()?;
        if self.refresh_secs == 0 {
            anyhow::bail!("refresh_secs must be positive");
        }
        self.display_timezone()?;
        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_secs)
    }

    pub fn display_timezone(&self) -> anyhow::Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| anyhow::anyhow!("invalid timezone '{}': {}", self.timezone, e))
    }
}

/// Sends a text message whenever the favorite team scores
#[derive(Parser, Debug, Clone)]
#[command(name = "goal-notifier", version, about)]
pub struct NotifierConfig {
    #[command(flatten)]
    pub feed: FeedArgs,

    /// Log alerts instead of sending them
    #[arg(long, env = "DRY_RUN", default_value = "false")]
    pub dry_run: bool,

    /// Phone number, or a full destination address if it contains '@'
    #[arg(long, env = "PHONE_NUMBER")]
    pub phone_number: Option<String>,

    /// Carrier email-to-SMS gateway domain
    #[arg(long, env = "SMS_GATEWAY", default_value = "msg.telus.com")]
    pub sms_gateway: String,

    /// SMTP relay host
    #[arg(long, env = "SMTP_SERVER")]
    pub smtp_server: Option<String>,

    /// SMTP relay port (STARTTLS)
    #[arg(long, env = "SMTP_PORT", default_value = "587")]
    pub smtp_port: u16,

    /// SMTP login, also used as the sender address
    #[arg(long, env = "SMTP_USERNAME")]
    pub smtp_username: Option<String>,

    #[arg(long, env = "SMTP_PASSWORD", hide_env_values = true)]
    pub smtp_password: Option<String>,

    /// Seconds between checks while waiting for goals
    #[arg(long, env = "CHECK_INTERVAL", default_value = "30")]
    pub check_interval_secs: u64,

    /// SQLite file holding already-notified goals
    #[arg(long, env = "STATE_PATH", default_value = "notified_goals.db")]
    pub state_path: PathBuf,
}

impl NotifierConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        self.feed.validate()?;
        if self.check_interval_secs == 0 {
            anyhow::bail!("check_interval_secs must be positive");
        }
        if !self.dry_run {
            if self.destination().is_none() {
                anyhow::bail!("PHONE_NUMBER is required to send alerts. Use --dry-run to only log them.");
            }
            if self.smtp_server.is_none() {
                anyhow::bail!("SMTP_SERVER is required to send alerts. Use --dry-run to only log them.");
            }
            if self.smtp_username.is_none() || self.smtp_password.is_none() {
                anyhow::bail!(
                    "SMTP_USERNAME and SMTP_PASSWORD are required to send alerts. Use --dry-run to only log them."
                );
            }
        }
        Ok(())
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    /// Destination address: `{digits}@{gateway}` unless an address was given.
    pub fn destination(&self) -> Option<String> {
        let raw = self.phone_number.as_deref()?.trim();
        if raw.is_empty() {
            return None;
        }
        if raw.contains('@') {
            return Some(raw.to_string());
        }
        let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            return None;
        }
        Some(format!("{}@{}", digits, self.sms_gateway))
    }
}
