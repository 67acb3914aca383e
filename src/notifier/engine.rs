use anyhow::Result;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{error, info, warn};

use super::classifier::{classify, StatusResult};
use super::dedup::{should_notify, DedupState, DedupStore};
use super::dispatch::{DispatchReport, Dispatcher};
use super::gate::first_in_window;
use crate::db::Database;
use crate::live_scores::{CachedSchedule, ScoreboardSource};

/// What a poll did, for logging and tests.
#[derive(Debug)]
pub enum CycleOutcome {
    /// Schedule could not be fetched; nothing else was attempted.
    ScheduleUnavailable,
    NoGameInWindow,
    NoGameFound,
    NoSubscribers,
    Suppressed {
        signature: String,
    },
    Sent {
        result: StatusResult,
        signature: String,
        report: DispatchReport,
    },
}

/// One classify-and-maybe-notify pipeline for the tracked team.
///
/// Not safe to run concurrently with itself: the dedup read and write are
/// separate steps, so callers must serialize polls.
pub struct PollEngine {
    tracked_team: String,
    scoreboard: Arc<dyn ScoreboardSource>,
    schedule: CachedSchedule,
    db: Database,
    dispatcher: Dispatcher,
}

impl PollEngine {
    pub fn new(
        tracked_team: &str,
        scoreboard: Arc<dyn ScoreboardSource>,
        schedule: CachedSchedule,
        db: Database,
        dispatcher: Dispatcher,
    ) -> Self {
        PollEngine {
            tracked_team: tracked_team.trim().to_string(),
            scoreboard,
            schedule,
            db,
            dispatcher,
        }
    }

    /// Run a cycle if `now` falls inside some scheduled game's window.
    /// Only the first matching game is considered.
    pub async fn poll(&self, now: DateTime<Utc>) -> Result<CycleOutcome> {
        let games = match self.schedule.games(now).await {
            Ok(g) => g,
            Err(e) => {
                error!("Season schedule unavailable, treating as no games: {:#}", e);
                return Ok(CycleOutcome::ScheduleUnavailable);
            }
        };

        match first_in_window(&games, now) {
            Some(game) => {
                info!("Game in window (start {})", game.start);
                self.run_cycle().await
            }
            None => {
                info!("No games in 30min-before to 4hr-after window");
                Ok(CycleOutcome::NoGameInWindow)
            }
        }
    }

    /// Fetch, classify, dedup and dispatch once.
    pub async fn run_cycle(&self) -> Result<CycleOutcome> {
        let games = self
            .scoreboard
            .fetch_scoreboard(None)
            .await
            .unwrap_or_else(|e| {
                warn!("{} scoreboard fetch failed: {:#}", self.scoreboard.name(), e);
                vec![]
            });

        let result = classify(&games, &self.tracked_team);
        let state = DedupState::load(&self.db as &dyn DedupStore)?;
        info!(
            "Game status: {} [{}] (last notified: {:?})",
            result.status,
            result.completion().as_str(),
            state.last_signature
        );

        let Some(decision) = should_notify(&result, &state) else {
            return Ok(CycleOutcome::NoGameFound);
        };

        let subscribers = self.db.list_subscribers_with_push_token()?;
        if subscribers.is_empty() {
            info!("No subscribers with push tokens; skipping");
            return Ok(CycleOutcome::NoSubscribers);
        }

        if !decision.send {
            info!("Score unchanged ({}); not notifying", decision.signature);
            return Ok(CycleOutcome::Suppressed {
                signature: decision.signature,
            });
        }

        let report = self.dispatcher.dispatch(&result, &subscribers).await;
        // Pushes are already out; a failed commit only risks a repeat next cycle.
        if let Err(e) = DedupState::commit(&self.db, &decision.signature) {
            error!(
                "Sent '{}' but could not record signature {}: {:#}",
                result.status, decision.signature, e
            );
        }

        Ok(CycleOutcome::Sent {
            result,
            signature: decision.signature,
            report,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{Game, LifecyclePhase, ScheduledGame};
    use crate::live_scores::ScheduleSource;
    use crate::notifier::classifier::GameStatus;
    use crate::notifier::dispatch::tests::FakePush;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};
    use std::sync::Mutex;

    struct FakeBoard {
        games: Mutex<Vec<Game>>,
        fail: Mutex<bool>,
    }

    impl FakeBoard {
        fn new() -> Self {
            FakeBoard {
                games: Mutex::new(vec![]),
                fail: Mutex::new(false),
            }
        }

        fn show(&self, games: Vec<Game>) {
            *self.games.lock().unwrap() = games;
        }
    }

    #[async_trait]
    impl ScoreboardSource for FakeBoard {
        fn name(&self) -> &str {
            "fake-board"
        }

        async fn fetch_scoreboard(&self, _date_path: Option<&str>) -> Result<Vec<Game>> {
            if *self.fail.lock().unwrap() {
                anyhow::bail!("timed out");
            }
            Ok(self.games.lock().unwrap().clone())
        }
    }

    struct FixedSchedule(Option<Vec<ScheduledGame>>);

    #[async_trait]
    impl ScheduleSource for FixedSchedule {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn fetch_season(
            &self,
            _team: &str,
            _conference: &str,
            _from: DateTime<Utc>,
            _to: DateTime<Utc>,
        ) -> Result<Vec<ScheduledGame>> {
            self.0.clone().ok_or_else(|| anyhow::anyhow!("503"))
        }
    }

    fn tip_off() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 20, 19, 0, 0).unwrap()
    }

    fn live(hs: u32, aws: u32) -> Game {
        Game {
            home_team: "Florida".into(),
            away_team: "Auburn".into(),
            home_score: hs,
            away_score: aws,
            phase: LifecyclePhase::Live,
        }
    }

    struct Harness {
        engine: PollEngine,
        board: Arc<FakeBoard>,
        push: Arc<FakePush>,
        db: Database,
    }

    fn harness_with(schedule: Option<Vec<ScheduledGame>>) -> Harness {
        let db = Database::open(":memory:").unwrap();
        db.upsert_subscriber(1, Some("tok-a")).unwrap();
        db.upsert_subscriber(2, Some("tok-a")).unwrap();
        db.upsert_subscriber(3, Some("tok-b")).unwrap();

        let board = Arc::new(FakeBoard::new());
        let push = Arc::new(FakePush::default());
        let schedule = CachedSchedule::new(
            Arc::new(FixedSchedule(schedule)),
            db.clone(),
            "Florida",
            "SEC",
            tip_off() + Duration::days(60),
        );
        let dispatcher = Dispatcher::new(push.clone(), Arc::new(db.clone()), "Health Notification");
        let engine = PollEngine::new("Florida", board.clone(), schedule, db.clone(), dispatcher);
        Harness { engine, board, push, db }
    }

    fn harness() -> Harness {
        harness_with(Some(vec![ScheduledGame {
            start: tip_off(),
            home_team: Some("Florida".into()),
            away_team: Some("Auburn".into()),
        }]))
    }

    fn pushes(h: &Harness) -> usize {
        h.push.sent.lock().unwrap().len()
    }

    #[tokio::test]
    async fn test_unchanged_score_sends_once() {
        let h = harness();
        h.board.show(vec![live(10, 8)]);

        match h.engine.run_cycle().await.unwrap() {
            CycleOutcome::Sent { result, signature, report } => {
                assert_eq!(result.status, GameStatus::WinningClose);
                assert_eq!(signature, "10-8");
                assert_eq!(report.pushes_sent(), 2);
                assert_eq!(report.records_created(), 3);
            }
            other => panic!("expected send, got {:?}", other),
        }
        assert!(matches!(
            h.engine.run_cycle().await.unwrap(),
            CycleOutcome::Suppressed { .. }
        ));
        assert_eq!(pushes(&h), 2);
        assert_eq!(h.db.list_recent_notifications(10).unwrap().len(), 3);

        h.board.show(vec![live(12, 8)]);
        assert!(matches!(h.engine.run_cycle().await.unwrap(), CycleOutcome::Sent { .. }));
        assert_eq!(pushes(&h), 4);
    }

    #[tokio::test]
    async fn test_no_game_found_leaves_dedup_state() {
        let h = harness();
        DedupState::commit(&h.db, "10-8").unwrap();

        h.board.show(vec![]);
        assert!(matches!(h.engine.run_cycle().await.unwrap(), CycleOutcome::NoGameFound));
        assert_eq!(
            DedupState::load(&h.db).unwrap().last_signature.as_deref(),
            Some("10-8")
        );

        // a new score after the gap still goes out
        h.board.show(vec![live(10, 10)]);
        assert!(matches!(h.engine.run_cycle().await.unwrap(), CycleOutcome::Sent { .. }));

        // and a gap followed by the same score stays suppressed
        h.board.show(vec![]);
        h.engine.run_cycle().await.unwrap();
        h.board.show(vec![live(10, 10)]);
        assert!(matches!(
            h.engine.run_cycle().await.unwrap(),
            CycleOutcome::Suppressed { .. }
        ));
    }

    #[tokio::test]
    async fn test_fresh_state_after_no_game_still_sends() {
        let h = harness();
        h.board.show(vec![]);
        h.engine.run_cycle().await.unwrap();
        h.board.show(vec![live(0, 0)]);
        assert!(matches!(h.engine.run_cycle().await.unwrap(), CycleOutcome::Sent { .. }));
    }

    #[tokio::test]
    async fn test_scoreboard_failure_is_no_game() {
        let h = harness();
        *h.board.fail.lock().unwrap() = true;
        assert!(matches!(h.engine.run_cycle().await.unwrap(), CycleOutcome::NoGameFound));
        assert_eq!(pushes(&h), 0);
    }

    #[tokio::test]
    async fn test_not_started_then_tip_off() {
        let h = harness();
        let mut pre = live(0, 0);
        pre.phase = LifecyclePhase::Pre;
        h.board.show(vec![pre]);

        match h.engine.run_cycle().await.unwrap() {
            CycleOutcome::Sent { signature, .. } => assert_eq!(signature, "Game not started"),
            other => panic!("expected send, got {:?}", other),
        }
        h.board.show(vec![live(0, 0)]);
        assert!(matches!(h.engine.run_cycle().await.unwrap(), CycleOutcome::Sent { .. }));
    }

    #[tokio::test]
    async fn test_no_subscribers_does_not_touch_state() {
        let h = harness();
        for id in 1..=3 {
            h.db.upsert_subscriber(id, None).unwrap();
        }
        h.board.show(vec![live(3, 0)]);
        assert!(matches!(h.engine.run_cycle().await.unwrap(), CycleOutcome::NoSubscribers));
        assert!(DedupState::load(&h.db).unwrap().last_signature.is_none());
    }

    #[tokio::test]
    async fn test_commit_failure_still_reports_sent() {
        let h = harness();
        h.db.execute_batch(
            "CREATE TRIGGER kv_read_only BEFORE INSERT ON kv_store
             BEGIN SELECT RAISE(ABORT, 'read-only'); END;",
        )
        .unwrap();
        h.board.show(vec![live(5, 2)]);

        match h.engine.run_cycle().await.unwrap() {
            CycleOutcome::Sent { signature, report, .. } => {
                assert_eq!(signature, "5-2");
                assert_eq!(report.pushes_sent(), 2);
            }
            other => panic!("expected send, got {:?}", other),
        }
        assert!(DedupState::load(&h.db).unwrap().last_signature.is_none());
    }

    #[tokio::test]
    async fn test_poll_respects_window() {
        let h = harness();
        h.board.show(vec![live(3, 0)]);

        let early = tip_off() - Duration::hours(2);
        assert!(matches!(h.engine.poll(early).await.unwrap(), CycleOutcome::NoGameInWindow));
        assert_eq!(pushes(&h), 0);

        let during = tip_off() + Duration::hours(1);
        assert!(matches!(h.engine.poll(during).await.unwrap(), CycleOutcome::Sent { .. }));
    }

    #[tokio::test]
    async fn test_schedule_failure_differs_from_empty_season() {
        let failing = harness_with(None);
        assert!(matches!(
            failing.engine.poll(tip_off()).await.unwrap(),
            CycleOutcome::ScheduleUnavailable
        ));

        let empty = harness_with(Some(vec![]));
        assert!(matches!(
            empty.engine.poll(tip_off()).await.unwrap(),
            CycleOutcome::NoGameInWindow
        ));
    }
}
