use crate::db::models::{GoalAlert, GoalEvent, Roster};

/// Name used when a player id cannot be resolved through the roster.
pub const UNKNOWN_PLAYER: &str = "Unknown Player";
/// Name used when the feed did not say who scored.
pub const UNKNOWN_SCORER: &str = "Unknown";

fn player_name(id: u64, roster: Option<&Roster>) -> String {
    roster
        .and_then(|r| r.get(&id))
        .cloned()
        .unwrap_or_else(|| UNKNOWN_PLAYER.to_string())
}

/// Attach player names and orient the score around the favorite team.
/// A missing roster only degrades names; it never drops the goal.
pub fn resolve_alert(goal: &GoalEvent, roster: Option<&Roster>, favorite: &str) -> GoalAlert {
    let scorer = match goal.scorer_id {
        Some(id) => player_name(id, roster),
        None => UNKNOWN_SCORER.to_string(),
    };
    let assists = goal
        .assist_ids
        .iter()
        .map(|id| player_name(*id, roster))
        .collect();

    let favorite_is_home = goal.home_team.eq_ignore_ascii_case(favorite);
    let (favorite_team, favorite_score, opponent_team, opponent_score) = if favorite_is_home {
        (&goal.home_team, goal.home_score, &goal.away_team, goal.away_score)
    } else {
        (&goal.away_team, goal.away_score, &goal.home_team, goal.home_score)
    };

    GoalAlert {
        game_id: goal.game_id,
        event_id: goal.event_id,
        scorer,
        assists,
        period: goal.period,
        time_in_period: goal.time_in_period.clone(),
        favorite_team: favorite_team.clone(),
        favorite_score,
        opponent_team: opponent_team.clone(),
        opponent_score,
    }
}

/// Two-line SMS body:
///
/// ```text
/// 🚨 FLYERS GOAL! T. Konecny (T. Sanheim, M. Michkov)
/// P2 05:00 | PHI 2-1 NYR
/// ```
pub fn format_goal_message(alert: &GoalAlert, team_name: &str) -> String {
    let mut message = format!("🚨 {} GOAL! {}", team_name.to_uppercase(), alert.scorer);
    if !alert.assists.is_empty() {
        message.push_str(&format!(" ({})", alert.assists.join(", ")));
    }
    message.push_str(&format!(
        "\nP{} {} | {} {}-{} {}",
        alert.period,
        alert.time_in_period,
        alert.favorite_team,
        alert.favorite_score,
        alert.opponent_score,
        alert.opponent_team
    ));
    message
}
