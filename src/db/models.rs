use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Coarse game state as reported by the scoreboard feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    Pre,
    Live,
    Final,
    Unknown,
}

impl LifecyclePhase {
    /// Case-insensitive; anything unrecognised folds into `Unknown`.
    pub fn from_feed(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "pre" => LifecyclePhase::Pre,
            "live" => LifecyclePhase::Live,
            "final" => LifecyclePhase::Final,
            _ => LifecyclePhase::Unknown,
        }
    }
}

/// One scoreboard entry, rebuilt fresh on every poll.
#[derive(Debug, Clone, PartialEq)]
pub struct Game {
    pub home_team: String,
    pub away_team: String,
    pub home_score: u32,
    pub away_score: u32,
    pub phase: LifecyclePhase,
}

/// A game on the tracked team's season schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledGame {
    pub start: DateTime<Utc>,
    pub home_team: Option<String>,
    pub away_team: Option<String>,
}

/// A notification recipient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscriber {
    pub user_id: i64,
    /// Push destination; subscribers without one never reach the dispatcher.
    pub push_token: Option<String>,
}

/// Append-only delivery history entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: Option<i64>,
    pub user_id: i64,
    pub title: String,
    pub message: String,
    pub sent_at: DateTime<Utc>,
}
