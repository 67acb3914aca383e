use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::db::models::{Game, ScheduledGame};

/// Trait that every scoreboard feed must implement.
#[async_trait]
pub trait ScoreboardSource: Send + Sync {
    /// All games on the board for a day. `date_path` is `YYYY/MM/DD`;
    /// `None` means today.
    async fn fetch_scoreboard(&self, date_path: Option<&str>) -> Result<Vec<Game>>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}

/// Season schedule for one team.
#[async_trait]
pub trait ScheduleSource: Send + Sync {
    async fn fetch_season(
        &self,
        team: &str,
        conference: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ScheduledGame>>;

    fn name(&self) -> &str;
}
