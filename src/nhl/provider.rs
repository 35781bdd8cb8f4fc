use async_trait::async_trait;
use chrono::NaiveDate;

use crate::db::models::{GameSnapshot, GoalEvent, Roster};
use crate::error::ApiResult;

/// Source of game data. `NhlClient` is the production implementation; the
/// loops only see this trait so they can be driven by canned data in tests.
#[async_trait]
pub trait ScoreFeed: Send + Sync {
    /// Every game on `date`, in upstream order.
    async fn fetch_schedule_and_scores(&self, date: NaiveDate) -> ApiResult<Vec<GameSnapshot>>;

    /// Scoring plays of one game, chronologically ordered.
    async fn fetch_play_by_play(&self, game_id: u64) -> ApiResult<Vec<GoalEvent>>;

    /// Player id to display name for both teams of one game.
    async fn fetch_roster(&self, game_id: u64) -> ApiResult<Roster>;

    /// Remaining season schedule for one team. Feeds the "upcoming" panel.
    async fn fetch_team_schedule(&self, team: &str) -> ApiResult<Vec<GameSnapshot>>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}
