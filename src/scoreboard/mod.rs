//! Schedule/score display loop.
//!
//! `Scoreboard` owns the only state that outlives a poll: the last board that
//! was fetched successfully and the error from the most recent failed poll.
//! Rendering lives in [`tui`] (interactive screen) and [`plain`] (scrolling
//! lines); both consume the same [`Board`].

pub mod plain;
pub mod tui;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

use crate::db::models::{GameSnapshot, GameState, PeriodKind};
use crate::nhl::{league_today, ScoreFeed};

/// Upcoming favorite-team games shown in the secondary panel.
pub const UPCOMING_LIMIT: usize = 5;

pub const FAVORITE_MARKER: &str = ">>> ";

/// Display treatment derived from the game state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStyle {
    /// live
    Active,
    /// scheduled
    Pending,
    /// final
    Neutral,
}

impl From<GameState> for RowStyle {
    fn from(state: GameState) -> Self {
        match state {
            GameState::Live => RowStyle::Active,
            GameState::Scheduled => RowStyle::Pending,
            GameState::Final => RowStyle::Neutral,
        }
    }
}

/// One rendered line of either panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayRow {
    pub game_id: u64,
    /// Local calendar date of the start time, e.g. "Sun Nov 23".
    pub date_label: String,
    /// "NYR 1 @ PHI 2", or "NYR @ PHI" before puck drop.
    pub matchup: String,
    /// Start time, clock or final marker.
    pub status: String,
    pub style: RowStyle,
    pub favorite: bool,
}

impl DisplayRow {
    pub fn marker(&self) -> &'static str {
        if self.favorite {
            FAVORITE_MARKER
        } else {
            ""
        }
    }

    pub fn state_label(&self) -> &'static str {
        match self.style {
            RowStyle::Active => "LIVE",
            RowStyle::Pending => "SCHEDULED",
            RowStyle::Neutral => "FINAL",
        }
    }
}

/// Games split by whether the favorite team plays in them.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    pub favorite: Vec<GameSnapshot>,
    pub others: Vec<GameSnapshot>,
}

/// Everything the renderers need for one poll.
#[derive(Debug, Clone, PartialEq)]
pub struct Board {
    pub date: NaiveDate,
    pub fetched_at: DateTime<Utc>,
    pub today: Vec<DisplayRow>,
    pub upcoming: Vec<DisplayRow>,
    pub favorite_today: usize,
}

/// Format a UTC instant as a local wall-clock time, e.g. "7:00 PM MST".
pub fn format_local_time(instant: DateTime<Utc>, tz: &Tz) -> String {
    instant.with_timezone(tz).format("%-I:%M %p %Z").to_string()
}

/// Calendar date of a UTC instant in the display zone.
pub fn local_date(instant: DateTime<Utc>, tz: &Tz) -> NaiveDate {
    instant.with_timezone(tz).date_naive()
}

fn status_text(game: &GameSnapshot, tz: &Tz) -> String {
    match game.state {
        GameState::Scheduled => format_local_time(game.start_time, tz),
        GameState::Final => match game.period_kind {
            PeriodKind::Regulation => "FINAL".to_string(),
            PeriodKind::Overtime => "FINAL/OT".to_string(),
            PeriodKind::Shootout => "FINAL/SO".to_string(),
        },
        GameState::Live => {
            let period = game
                .period
                .map(|p| p.to_string())
                .unwrap_or_else(|| "?".to_string());
            let clock = game.time_remaining.as_deref().unwrap_or("20:00");
            if game.in_intermission {
                format!("INT after P{}", period)
            } else {
                match game.period_kind {
                    PeriodKind::Regulation => format!("P{} {}", period, clock),
                    PeriodKind::Overtime => format!("OT {}", clock),
                    PeriodKind::Shootout => "SO".to_string(),
                }
            }
        }
    }
}

/// Pure transform from a snapshot to its display row.
pub fn to_display_row(game: &GameSnapshot, tz: &Tz) -> DisplayRow {
    let matchup = match game.state {
        GameState::Scheduled => format!("{} @ {}", game.away_team, game.home_team),
        GameState::Live | GameState::Final => format!(
            "{} {} @ {} {}",
            game.away_team, game.away_score, game.home_team, game.home_score
        ),
    };
    DisplayRow {
        game_id: game.game_id,
        date_label: local_date(game.start_time, tz).format("%a %b %-d").to_string(),
        matchup,
        status: status_text(game, tz),
        style: game.state.into(),
        favorite: game.is_favorite,
    }
}

pub fn partition(games: &[GameSnapshot]) -> Partition {
    let (favorite, others): (Vec<_>, Vec<_>) = games.iter().cloned().partition(|g| g.is_favorite);
    Partition { favorite, others }
}

/// Next favorite-team games that have not started by `now`, earliest first,
/// capped at [`UPCOMING_LIMIT`]. Games present in several sources are counted
/// once. Postponed games keep a scheduled state with their old start time, so
/// the start time is checked as well as the state.
pub fn upcoming_favorite<'a>(
    sources: impl IntoIterator<Item = &'a GameSnapshot>,
    now: DateTime<Utc>,
) -> Vec<GameSnapshot> {
    let mut seen = HashSet::new();
    let mut upcoming: Vec<GameSnapshot> = sources
        .into_iter()
        .filter(|g| g.is_favorite && g.state == GameState::Scheduled && g.start_time >= now)
        .filter(|g| seen.insert(g.game_id))
        .cloned()
        .collect();
    upcoming.sort_by_key(|g| g.start_time);
    upcoming.truncate(UPCOMING_LIMIT);
    upcoming
}

pub fn build_board(
    date: NaiveDate,
    today: &[GameSnapshot],
    team_schedule: &[GameSnapshot],
    tz: &Tz,
    fetched_at: DateTime<Utc>,
) -> Board {
    let split = partition(today);
    let upcoming = upcoming_favorite(today.iter().chain(team_schedule.iter()), fetched_at);
    Board {
        date,
        fetched_at,
        today: today.iter().map(|g| to_display_row(g, tz)).collect(),
        upcoming: upcoming.iter().map(|g| to_display_row(g, tz)).collect(),
        favorite_today: split.favorite.len(),
    }
}

/// What a renderer shows after a refresh.
#[derive(Debug, Clone, Copy)]
pub struct ScreenView<'a> {
    pub team: &'a str,
    pub team_name: &'a str,
    pub tz: &'a Tz,
    pub board: Option<&'a Board>,
    /// Set when the latest refresh failed; `board` is then the previous one.
    pub error: Option<&'a str>,
}

/// Controller of the display loop.
pub struct Scoreboard {
    feed: Arc<dyn ScoreFeed>,
    team: String,
    team_name: String,
    tz: Tz,
    board: Option<Board>,
    last_error: Option<String>,
}

impl Scoreboard {
    pub fn new(feed: Arc<dyn ScoreFeed>, team: &str, team_name: &str, tz: Tz) -> Self {
        Scoreboard {
            feed,
            team: team.trim().to_uppercase(),
            team_name: team_name.to_string(),
            tz,
            board: None,
            last_error: None,
        }
    }

    /// The date whose games are shown, by the league's calendar.
    pub fn today(&self) -> NaiveDate {
        league_today()
    }

    /// Fetch and rebuild the board for `date`. A failed fetch keeps the
    /// previous board and records the error for the status line.
    pub async fn refresh(&mut self, date: NaiveDate) {
        self.refresh_at(date, Utc::now()).await
    }

    /// [`Scoreboard::refresh`] with an explicit clock.
    pub async fn refresh_at(&mut self, date: NaiveDate, now: DateTime<Utc>) {
        let games = match self.feed.fetch_schedule_and_scores(date).await {
            Ok(games) => games,
            Err(e) => {
                warn!("Scoreboard refresh failed: {}", e);
                self.last_error = Some(e.to_string());
                return;
            }
        };

        // The season schedule only feeds the upcoming panel; without it the
        // panel falls back to today's games.
        let schedule = match self.feed.fetch_team_schedule(&self.team).await {
            Ok(schedule) => schedule,
            Err(e) => {
                warn!("Team schedule for {} unavailable: {}", self.team, e);
                Vec::new()
            }
        };

        let board = build_board(date, &games, &schedule, &self.tz, now);
        info!(
            "Scoreboard refreshed from {}: {} games, {} upcoming {} games",
            self.feed.name(),
            board.today.len(),
            board.upcoming.len(),
            self.team
        );
        self.board = Some(board);
        self.last_error = None;
    }

    pub fn view(&self) -> ScreenView<'_> {
        ScreenView {
            team: &self.team,
            team_name: &self.team_name,
            tz: &self.tz,
            board: self.board.as_ref(),
            error: self.last_error.as_deref(),
        }
    }
}
