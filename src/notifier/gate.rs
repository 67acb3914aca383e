use chrono::{DateTime, Duration, Utc};

use crate::db::models::ScheduledGame;

/// Polling opens this long before tip-off...
pub const WINDOW_LEAD_MINUTES: i64 = 30;
/// ...and closes this long after it.
pub const WINDOW_TRAIL_HOURS: i64 = 4;

/// `start − 30min ≤ now ≤ start + 4h`, both ends inclusive.
pub fn in_window(start: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    start - Duration::minutes(WINDOW_LEAD_MINUTES) <= now
        && now <= start + Duration::hours(WINDOW_TRAIL_HOURS)
}

/// First scheduled game, in list order, whose window contains `now`.
pub fn first_in_window(games: &[ScheduledGame], now: DateTime<Utc>) -> Option<&ScheduledGame> {
    games.iter().find(|g| in_window(g.start, now))
}
