use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Normalised game state, mapped from the upstream `gameState` codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameState {
    Scheduled,
    Live,
    Final,
}

/// Regulation, overtime or shootout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PeriodKind {
    #[default]
    Regulation,
    Overtime,
    Shootout,
}

/// One game for a given date, as fetched from the score endpoint.
/// Rebuilt wholesale on every poll.
#[derive(Debug, Clone, PartialEq)]
pub struct GameSnapshot {
    pub game_id: u64,
    pub home_team: String,
    pub away_team: String,
    pub home_score: u32,
    pub away_score: u32,
    pub state: GameState,
    pub period: Option<u32>,
    pub period_kind: PeriodKind,
    /// "MM:SS" left in the period, when the game clock is known.
    pub time_remaining: Option<String>,
    pub in_intermission: bool,
    pub start_time: DateTime<Utc>,
    /// Derived from the configured favorite team when the snapshot is built.
    pub is_favorite: bool,
}

impl GameSnapshot {
    pub fn involves(&self, team: &str) -> bool {
        self.home_team.eq_ignore_ascii_case(team) || self.away_team.eq_ignore_ascii_case(team)
    }
}

/// A scoring play from a game's play-by-play feed. Player names are not part
/// of the feed and are resolved later through the roster.
#[derive(Debug, Clone, PartialEq)]
pub struct GoalEvent {
    pub game_id: u64,
    /// Unique within `game_id` only.
    pub event_id: u64,
    /// Abbreviation of the team that scored.
    pub scoring_team: String,
    pub period: u32,
    pub time_in_period: String,
    pub scorer_id: Option<u64>,
    /// At most two, primary assist first.
    pub assist_ids: Vec<u64>,
    pub home_team: String,
    pub away_team: String,
    /// Score after this goal.
    pub home_score: u32,
    pub away_score: u32,
}

/// player id -> display name
pub type Roster = HashMap<u64, String>;

/// A goal with names resolved, ready to be formatted and sent.
#[derive(Debug, Clone, PartialEq)]
pub struct GoalAlert {
    pub game_id: u64,
    pub event_id: u64,
    pub scorer: String,
    pub assists: Vec<String>,
    pub period: u32,
    pub time_in_period: String,
    pub favorite_team: String,
    pub favorite_score: u32,
    pub opponent_team: String,
    pub opponent_score: u32,
}
