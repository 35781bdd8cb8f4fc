//! Goal detection loop: watch live favorite-team games and send one alert
//! per new goal.

pub mod message;
pub mod sms;

pub use message::{format_goal_message, resolve_alert};
pub use sms::{LogNotifier, Notifier, SmtpNotifier};

use anyhow::Result;
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::db::models::{GameSnapshot, GameState};
use crate::db::NotifiedStore;
use crate::nhl::{league_today, ScoreFeed};

/// What one detection cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub live_games: usize,
    pub new_goals: usize,
    pub sent: usize,
    pub failed: usize,
}

pub struct GoalMonitor {
    feed: Arc<dyn ScoreFeed>,
    notifier: Arc<dyn Notifier>,
    store: NotifiedStore,
    team: String,
    team_name: String,
}

impl GoalMonitor {
    pub fn new(
        feed: Arc<dyn ScoreFeed>,
        notifier: Arc<dyn Notifier>,
        store: NotifiedStore,
        team: &str,
        team_name: &str,
    ) -> Self {
        GoalMonitor {
            feed,
            notifier,
            store,
            team: team.trim().to_uppercase(),
            team_name: team_name.to_string(),
        }
    }

    pub fn store(&self) -> &NotifiedStore {
        &self.store
    }

    fn is_watched(&self, game: &GameSnapshot) -> bool {
        game.state == GameState::Live && game.involves(&self.team)
    }

    /// One scan of `date`. Fails only when the day's games cannot be fetched
    /// or the state store errors; per-game feed failures are logged and the
    /// game is retried next cycle.
    pub async fn run_cycle(&mut self, date: NaiveDate) -> Result<CycleReport> {
        let games = self.feed.fetch_schedule_and_scores(date).await?;
        let live: Vec<GameSnapshot> = games.into_iter().filter(|g| self.is_watched(g)).collect();

        let mut report = CycleReport {
            live_games: live.len(),
            ..Default::default()
        };
        if live.is_empty() {
            info!("No active {} games", self.team);
            return Ok(report);
        }

        for game in &live {
            info!(
                "Monitoring: {} @ {} ({}-{})",
                game.away_team, game.home_team, game.away_score, game.home_score
            );
            self.scan_game(game, &mut report).await?;
        }
        Ok(report)
    }

    async fn scan_game(&mut self, game: &GameSnapshot, report: &mut CycleReport) -> Result<()> {
        let goals = match self.feed.fetch_play_by_play(game.game_id).await {
            Ok(goals) => goals,
            Err(e) => {
                warn!("Play-by-play for game {} unavailable: {}", game.game_id, e);
                return Ok(());
            }
        };

        let mut fresh = Vec::new();
        for goal in goals {
            if !goal.scoring_team.eq_ignore_ascii_case(&self.team) {
                continue;
            }
            if self.store.contains(goal.game_id, goal.event_id)? {
                continue;
            }
            fresh.push(goal);
        }
        if fresh.is_empty() {
            debug!("No new goals in game {}", game.game_id);
            return Ok(());
        }
        report.new_goals += fresh.len();

        let roster = match self.feed.fetch_roster(game.game_id).await {
            Ok(roster) => Some(roster),
            Err(e) => {
                warn!("Roster for game {} unavailable, using placeholder names: {}", game.game_id, e);
                None
            }
        };

        for goal in &fresh {
            let alert = resolve_alert(goal, roster.as_ref(), &self.team);
            let text = format_goal_message(&alert, &self.team_name);
            info!("🚨 New goal detected (game {}, event {}):\n{}", goal.game_id, goal.event_id, text);

            match self.notifier.send(&text).await {
                Ok(()) => {
                    self.store.mark_notified(goal.game_id, goal.event_id)?;
                    report.sent += 1;
                }
                Err(e) => {
                    error!(
                        "Alert for game {} event {} not delivered, will retry next cycle: {}",
                        goal.game_id, goal.event_id, e
                    );
                    report.failed += 1;
                }
            }
        }
        Ok(())
    }

    /// Poll forever at `interval`. Cycle failures are logged and never stop
    /// the loop.
    pub async fn run(&mut self, interval: Duration) {
        info!(
            "🏒 Watching {} games every {:?}, alerts via {}",
            self.team,
            interval,
            self.notifier.name()
        );
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            match self.run_cycle(league_today()).await {
                Ok(report) if report.new_goals > 0 => info!(
                    "Cycle done: {} new goals, {} sent, {} failed",
                    report.new_goals, report.sent, report.failed
                ),
                Ok(_) => {}
                Err(e) => warn!("Goal check failed: {:#}", e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{GoalEvent, PeriodKind, Roster};
    use crate::error::{ApiError, ApiResult, SendError};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::sync::Mutex;

    const GAME: u64 = 2025020321;

    fn snapshot(state: GameState, away: &str, home: &str) -> GameSnapshot {
        GameSnapshot {
            game_id: GAME,
            home_team: home.into(),
            away_team: away.into(),
            home_score: 1,
            away_score: 1,
            state,
            period: Some(2),
            period_kind: PeriodKind::Regulation,
            time_remaining: Some("15:00".into()),
            in_intermission: false,
            start_time: Utc.with_ymd_and_hms(2025, 11, 24, 0, 0, 0).unwrap(),
            is_favorite: home == "PHI" || away == "PHI",
        }
    }

    fn goal(event_id: u64, team: &str, scorer: u64, assists: Vec<u64>, home: u32, away: u32) -> GoalEvent {
        GoalEvent {
            game_id: GAME,
            event_id,
            scoring_team: team.into(),
            period: 2,
            time_in_period: "05:00".into(),
            scorer_id: Some(scorer),
            assist_ids: assists,
            home_team: "PHI".into(),
            away_team: "NYR".into(),
            home_score: home,
            away_score: away,
        }
    }

    /// Each cycle pops the next play-by-play snapshot; the last one repeats.
    /// Goals are re-keyed to the requested game, and `failing_game` always errors.
    struct FakeFeed {
        games: ApiResult<Vec<GameSnapshot>>,
        plays: Mutex<Vec<Vec<GoalEvent>>>,
        failing_game: Option<u64>,
        roster: Option<Roster>,
        roster_calls: Mutex<usize>,
    }

    impl FakeFeed {
        fn new(games: Vec<GameSnapshot>, plays: Vec<Vec<GoalEvent>>) -> Self {
            FakeFeed {
                games: Ok(games),
                plays: Mutex::new(plays),
                failing_game: None,
                roster: Some(Roster::from([(1, "A".to_string()), (2, "B".to_string())])),
                roster_calls: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl ScoreFeed for FakeFeed {
        async fn fetch_schedule_and_scores(&self, _date: NaiveDate) -> ApiResult<Vec<GameSnapshot>> {
            match &self.games {
                Ok(g) => Ok(g.clone()),
                Err(_) => Err(ApiError::network("fake://score", "refused")),
            }
        }

        async fn fetch_play_by_play(&self, game_id: u64) -> ApiResult<Vec<GoalEvent>> {
            if self.failing_game == Some(game_id) {
                return Err(ApiError::network("fake://play-by-play", "timed out"));
            }
            let mut plays = self.plays.lock().unwrap();
            let goals = if plays.len() > 1 {
                plays.remove(0)
            } else {
                plays.first().cloned().unwrap_or_default()
            };
            Ok(goals
                .into_iter()
                .map(|mut g| {
                    g.game_id = game_id;
                    g
                })
                .collect())
        }

        async fn fetch_roster(&self, _game_id: u64) -> ApiResult<Roster> {
            *self.roster_calls.lock().unwrap() += 1;
            self.roster
                .clone()
                .ok_or_else(|| ApiError::parse("fake://boxscore", "missing `playerByGameStats`"))
        }

        async fn fetch_team_schedule(&self, _team: &str) -> ApiResult<Vec<GameSnapshot>> {
            Ok(vec![])
        }

        fn name(&self) -> &str {
            "fake"
        }
    }

    /// Records messages; the first `fail_first` sends fail.
    struct RecordingNotifier {
        sent: Mutex<Vec<String>>,
        attempts: Mutex<Vec<String>>,
        fail_first: Mutex<usize>,
    }

    impl RecordingNotifier {
        fn new(fail_first: usize) -> Self {
            RecordingNotifier {
                sent: Mutex::new(vec![]),
                attempts: Mutex::new(vec![]),
                fail_first: Mutex::new(fail_first),
            }
        }

        fn sent(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, message: &str) -> Result<(), SendError> {
            self.attempts.lock().unwrap().push(message.to_string());
            let mut fail = self.fail_first.lock().unwrap();
            if *fail > 0 {
                *fail -= 1;
                return Err(SendError::new("recording", "relay unavailable"));
            }
            self.sent.lock().unwrap().push(message.to_string());
            Ok(())
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    fn monitor(feed: FakeFeed, notifier: Arc<RecordingNotifier>) -> GoalMonitor {
        GoalMonitor::new(
            Arc::new(feed),
            notifier,
            NotifiedStore::open_in_memory().unwrap(),
            "PHI",
            "Flyers",
        )
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, 23).unwrap()
    }

    #[tokio::test]
    async fn test_new_goal_sends_one_alert() {
        let feed = FakeFeed::new(
            vec![snapshot(GameState::Live, "NYR", "PHI")],
            vec![vec![goal(310, "PHI", 1, vec![2], 2, 1)]],
        );
        let notifier = Arc::new(RecordingNotifier::new(0));
        let mut m = monitor(feed, notifier.clone());

        let report = m.run_cycle(date()).await.unwrap();

        assert_eq!(report, CycleReport { live_games: 1, new_goals: 1, sent: 1, failed: 0 });
        assert_eq!(notifier.sent(), vec!["🚨 FLYERS GOAL! A (B)\nP2 05:00 | PHI 2-1 NYR"]);
        assert_eq!(m.store().count().unwrap(), 1);
        assert!(m.store().contains(GAME, 310).unwrap());
    }

    #[tokio::test]
    async fn test_growing_goal_set_notifies_each_once() {
        let g1 = goal(101, "PHI", 1, vec![], 1, 0);
        let g2 = goal(202, "PHI", 2, vec![1], 2, 0);
        let g3 = goal(303, "PHI", 1, vec![2], 3, 0);
        let feed = FakeFeed::new(
            vec![snapshot(GameState::Live, "NYR", "PHI")],
            vec![
                vec![g1.clone()],
                vec![g1.clone(), g2.clone()],
                vec![g1.clone(), g2.clone()],
                vec![g1, g2, g3],
            ],
        );
        let notifier = Arc::new(RecordingNotifier::new(0));
        let mut m = monitor(feed, notifier.clone());

        for _ in 0..5 {
            m.run_cycle(date()).await.unwrap();
        }

        assert_eq!(m.store().count().unwrap(), 3);
        assert_eq!(notifier.sent().len(), 3);
        assert_eq!(m.store().notified_for_game(GAME).unwrap(), vec![101, 202, 303]);
    }

    #[tokio::test]
    async fn test_failed_send_is_retried_with_same_text() {
        let feed = FakeFeed::new(
            vec![snapshot(GameState::Live, "NYR", "PHI")],
            vec![vec![goal(310, "PHI", 1, vec![2], 2, 1)]],
        );
        let notifier = Arc::new(RecordingNotifier::new(1));
        let mut m = monitor(feed, notifier.clone());

        let first = m.run_cycle(date()).await.unwrap();
        assert_eq!(first.failed, 1);
        assert!(!m.store().contains(GAME, 310).unwrap());

        let second = m.run_cycle(date()).await.unwrap();
        assert_eq!(second.sent, 1);
        assert!(m.store().contains(GAME, 310).unwrap());

        let attempts = notifier.attempts.lock().unwrap().clone();
        assert_eq!(attempts.len(), 2);
        assert_eq!(attempts[0], attempts[1]);

        let third = m.run_cycle(date()).await.unwrap();
        assert_eq!(third.new_goals, 0);
        assert_eq!(notifier.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_roster_failure_still_notifies() {
        let mut feed = FakeFeed::new(
            vec![snapshot(GameState::Live, "PHI", "NYR")],
            vec![vec![goal(310, "PHI", 1, vec![2], 2, 1)]],
        );
        feed.roster = None;
        let notifier = Arc::new(RecordingNotifier::new(0));
        let mut m = monitor(feed, notifier.clone());

        m.run_cycle(date()).await.unwrap();

        assert_eq!(
            notifier.sent(),
            vec!["🚨 FLYERS GOAL! Unknown Player (Unknown Player)\nP2 05:00 | PHI 2-1 NYR"]
        );
        assert_eq!(m.store().count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_play_by_play_failure_does_not_block_other_games() {
        let mut other = snapshot(GameState::Live, "PHI", "BOS");
        other.game_id = 7;
        let mut feed = FakeFeed::new(
            vec![snapshot(GameState::Live, "NYR", "PHI"), other],
            vec![vec![goal(310, "PHI", 1, vec![2], 2, 1)]],
        );
        feed.failing_game = Some(GAME);
        let notifier = Arc::new(RecordingNotifier::new(0));
        let mut m = monitor(feed, notifier.clone());

        let report = m.run_cycle(date()).await.unwrap();

        assert_eq!(report.live_games, 2);
        assert_eq!(report.sent, 1);
        assert_eq!(notifier.sent().len(), 1);
        assert!(m.store().contains(7, 310).unwrap());
        assert!(!m.store().contains(GAME, 310).unwrap());
    }

    #[tokio::test]
    async fn test_padded_team_still_matches() {
        let feed = FakeFeed::new(
            vec![snapshot(GameState::Live, "NYR", "PHI")],
            vec![vec![goal(310, "PHI", 1, vec![2], 2, 1)]],
        );
        let notifier = Arc::new(RecordingNotifier::new(0));
        let mut m = GoalMonitor::new(
            Arc::new(feed),
            notifier.clone(),
            NotifiedStore::open_in_memory().unwrap(),
            "phi ",
            "Flyers",
        );

        let report = m.run_cycle(date()).await.unwrap();
        assert_eq!(report.sent, 1);
        assert_eq!(notifier.sent(), vec!["🚨 FLYERS GOAL! A (B)\nP2 05:00 | PHI 2-1 NYR"]);
    }

    #[tokio::test]
    async fn test_opponent_goals_are_ignored() {
        let feed = FakeFeed::new(
            vec![snapshot(GameState::Live, "NYR", "PHI")],
            vec![vec![goal(95, "NYR", 1, vec![], 0, 1)]],
        );
        let notifier = Arc::new(RecordingNotifier::new(0));
        let mut m = monitor(feed, notifier.clone());

        let report = m.run_cycle(date()).await.unwrap();
        assert_eq!(report.new_goals, 0);
        assert!(notifier.sent().is_empty());
        assert_eq!(m.store().count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_roster_fetched_once_per_game_and_only_for_new_goals() {
        let feed = Arc::new(FakeFeed::new(
            vec![snapshot(GameState::Live, "NYR", "PHI")],
            vec![vec![goal(1, "PHI", 1, vec![], 1, 0), goal(2, "PHI", 2, vec![], 2, 0)]],
        ));
        let notifier = Arc::new(RecordingNotifier::new(0));
        let mut m = GoalMonitor::new(
            feed.clone(),
            notifier.clone(),
            NotifiedStore::open_in_memory().unwrap(),
            "PHI",
            "Flyers",
        );

        m.run_cycle(date()).await.unwrap();
        m.run_cycle(date()).await.unwrap();

        assert_eq!(*feed.roster_calls.lock().unwrap(), 1);
        assert_eq!(notifier.sent().len(), 2);
    }

    #[tokio::test]
    async fn test_no_live_favorite_game_sends_nothing() {
        let mut other = snapshot(GameState::Live, "EDM", "CGY");
        other.game_id = 7;
        let feed = FakeFeed::new(
            vec![snapshot(GameState::Scheduled, "NYR", "PHI"), other],
            vec![vec![goal(310, "PHI", 1, vec![], 1, 0)]],
        );
        let notifier = Arc::new(RecordingNotifier::new(0));
        let mut m = monitor(feed, notifier.clone());

        let report = m.run_cycle(date()).await.unwrap();
        assert_eq!(report, CycleReport::default());
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn test_no_games_today() {
        let feed = FakeFeed::new(vec![], vec![]);
        let notifier = Arc::new(RecordingNotifier::new(0));
        let mut m = monitor(feed, notifier.clone());

        let report = m.run_cycle(date()).await.unwrap();
        assert_eq!(report, CycleReport::default());
        assert!(notifier.attempts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_schedule_failure_is_an_error_and_sends_nothing() {
        let mut feed = FakeFeed::new(vec![], vec![]);
        feed.games = Err(ApiError::network("fake://score", "refused"));
        let notifier = Arc::new(RecordingNotifier::new(0));
        let mut m = monitor(feed, notifier.clone());

        assert!(m.run_cycle(date()).await.is_err());
        assert!(notifier.sent().is_empty());
    }
}
