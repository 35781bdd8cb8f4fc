use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::provider::ScoreFeed;
use crate::db::models::{GameSnapshot, GameState, GoalEvent, PeriodKind, Roster};
use crate::error::{ApiError, ApiResult};

pub const DEFAULT_BASE_URL: &str = "https://api-web.nhle.com/v1";

/// Client for the public NHL web API.
/// Docs (unofficial): <https://github.com/Zmalski/NHL-API-Reference>
#[derive(Clone)]
pub struct NhlClient {
    http: Client,
    base_url: String,
    /// Abbreviation used to flag `GameSnapshot::is_favorite`.
    favorite_team: String,
}

impl NhlClient {
    pub fn new(base_url: &str, favorite_team: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("nhl-goal-watch/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(NhlClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            favorite_team: favorite_team.trim().to_uppercase(),
        })
    }

    async fn get_json(&self, url: &str) -> ApiResult<Value> {
        debug!("GET {}", url);
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| ApiError::network(url, e))?;

        if !resp.status().is_success() {
            return Err(ApiError::network(url, format!("HTTP {}", resp.status())));
        }

        resp.json::<Value>()
            .await
            .map_err(|e| ApiError::parse(url, e))
    }
}

#[async_trait]
impl ScoreFeed for NhlClient {
    fn name(&self) -> &str {
        "NHL web API"
    }

    async fn fetch_schedule_and_scores(&self, date: NaiveDate) -> ApiResult<Vec<GameSnapshot>> {
        let url = format!("{}/score/{}", self.base_url, date.format("%Y-%m-%d"));
        let raw = self.get_json(&url).await?;
        parse_games(&raw, &self.favorite_team).ok_or_else(|| ApiError::parse(&url, "missing `games` array"))
    }

    async fn fetch_play_by_play(&self, game_id: u64) -> ApiResult<Vec<GoalEvent>> {
        let url = format!("{}/gamecenter/{}/play-by-play", self.base_url, game_id);
        let raw = self.get_json(&url).await?;
        parse_goals(&raw, game_id).ok_or_else(|| ApiError::parse(&url, "missing `plays` array"))
    }

    async fn fetch_roster(&self, game_id: u64) -> ApiResult<Roster> {
        let url = format!("{}/gamecenter/{}/boxscore", self.base_url, game_id);
        let raw = self.get_json(&url).await?;
        parse_roster(&raw).ok_or_else(|| ApiError::parse(&url, "missing `playerByGameStats`"))
    }

    async fn fetch_team_schedule(&self, team: &str) -> ApiResult<Vec<GameSnapshot>> {
        let url = format!(
            "{}/club-schedule-season/{}/now",
            self.base_url,
            team.to_uppercase()
        );
        let raw = self.get_json(&url).await?;
        parse_games(&raw, &self.favorite_team).ok_or_else(|| ApiError::parse(&url, "missing `games` array"))
    }
}

/// Map the upstream `gameState` vocabulary onto ours.
pub fn state_from_code(code: &str) -> GameState {
    match code.to_uppercase().as_str() {
        "LIVE" | "CRIT" => GameState::Live,
        "OFF" | "FINAL" => GameState::Final,
        "FUT" | "PRE" => GameState::Scheduled,
        other => {
            debug!("Unknown gameState '{}', treating as scheduled", other);
            GameState::Scheduled
        }
    }
}

fn period_kind_from_code(code: &str) -> PeriodKind {
    match code {
        "OT" => PeriodKind::Overtime,
        "SO" => PeriodKind::Shootout,
        _ => PeriodKind::Regulation,
    }
}

fn as_u32(v: &Value) -> Option<u32> {
    v.as_u64().and_then(|n| u32::try_from(n).ok())
}

/// Parse a response carrying a top-level `games` array (score and club
/// schedule endpoints share the per-game shape). Malformed games are skipped;
/// `None` means the response itself had the wrong shape.
fn parse_games(raw: &Value, favorite: &str) -> Option<Vec<GameSnapshot>> {
    let games = raw.get("games")?.as_array()?;
    Some(games.iter().filter_map(|g| parse_game(g, favorite)).collect())
}

fn parse_game(g: &Value, favorite: &str) -> Option<GameSnapshot> {
    let game_id = g["id"].as_u64()?;
    let start_time = g["startTimeUTC"]
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc));
    let Some(start_time) = start_time else {
        debug!("Skipping game {} without a usable startTimeUTC", game_id);
        return None;
    };

    let home_team = g["homeTeam"]["abbrev"].as_str().unwrap_or("TBD").to_string();
    let away_team = g["awayTeam"]["abbrev"].as_str().unwrap_or("TBD").to_string();
    let state = state_from_code(g["gameState"].as_str().unwrap_or("FUT"));

    let period = as_u32(&g["periodDescriptor"]["number"]).or_else(|| as_u32(&g["period"]));
    let period_kind = period_kind_from_code(
        g["periodDescriptor"]["periodType"].as_str().unwrap_or("REG"),
    );
    let time_remaining = g["clock"]["timeRemaining"].as_str().map(str::to_string);
    let in_intermission = g["clock"]["inIntermission"].as_bool().unwrap_or(false);

    let is_favorite = home_team.eq_ignore_ascii_case(favorite) || away_team.eq_ignore_ascii_case(favorite);

    Some(GameSnapshot {
        game_id,
        home_score: as_u32(&g["homeTeam"]["score"]).unwrap_or(0),
        away_score: as_u32(&g["awayTeam"]["score"]).unwrap_or(0),
        home_team,
        away_team,
        state,
        period,
        period_kind,
        time_remaining,
        in_intermission,
        start_time,
        is_favorite,
    })
}

/// Extract goal plays from a play-by-play document, sorted by
/// (period, time in period). Non-goal plays are discarded.
fn parse_goals(raw: &Value, game_id: u64) -> Option<Vec<GoalEvent>> {
    let plays = raw.get("plays")?.as_array()?;

    let home_id = raw["homeTeam"]["id"].as_u64();
    let away_id = raw["awayTeam"]["id"].as_u64();
    let home_team = raw["homeTeam"]["abbrev"].as_str().unwrap_or("TBD").to_string();
    let away_team = raw["awayTeam"]["abbrev"].as_str().unwrap_or("TBD").to_string();

    let mut goals: Vec<GoalEvent> = plays
        .iter()
        .filter(|p| p["typeDescKey"].as_str() == Some("goal"))
        .filter_map(|p| {
            let event_id = p["eventId"].as_u64()?;
            let details = &p["details"];
            let owner = details["eventOwnerTeamId"].as_u64();
            let scoring_team = if owner.is_some() && owner == home_id {
                home_team.clone()
            } else if owner.is_some() && owner == away_id {
                away_team.clone()
            } else {
                debug!("Goal {} in game {} has unknown owner {:?}", event_id, game_id, owner);
                "UNK".to_string()
            };

            let assist_ids = ["assist1PlayerId", "assist2PlayerId"]
                .iter()
                .filter_map(|key| details[*key].as_u64())
                .collect();

            Some(GoalEvent {
                game_id,
                event_id,
                scoring_team,
                period: as_u32(&p["periodDescriptor"]["number"]).unwrap_or(0),
                time_in_period: p["timeInPeriod"].as_str().unwrap_or("??:??").to_string(),
                scorer_id: details["scoringPlayerId"].as_u64(),
                assist_ids,
                home_team: home_team.clone(),
                away_team: away_team.clone(),
                home_score: as_u32(&details["homeScore"]).unwrap_or(0),
                away_score: as_u32(&details["awayScore"]).unwrap_or(0),
            })
        })
        .collect();

    goals.sort_by(|a, b| {
        (a.period, a.time_in_period.as_str()).cmp(&(b.period, b.time_in_period.as_str()))
    });
    Some(goals)
}

fn parse_roster(raw: &Value) -> Option<Roster> {
    let stats = raw.get("playerByGameStats")?;
    let mut roster = Roster::new();
    for side in ["awayTeam", "homeTeam"] {
        for group in ["forwards", "defense", "goalies"] {
            let Some(players) = stats[side][group].as_array() else {
                continue;
            };
            for p in players {
                let (Some(id), Some(name)) = (p["playerId"].as_u64(), p["name"]["default"].as_str()) else {
                    continue;
                };
                roster.insert(id, name.trim().to_string());
            }
        }
    }
    Some(roster)
}
