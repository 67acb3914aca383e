use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, NaiveDateTime, SecondsFormat, Utc};
use reqwest::Client;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::ScheduleSource;
use crate::db::models::ScheduledGame;
use crate::db::Database;

/// How long a fetched season schedule stays fresh.
pub const SCHEDULE_CACHE_TTL_HOURS: i64 = 24;

/// Season schedule from collegebasketballdata.com.
pub struct CollegeBasketballData {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl CollegeBasketballData {
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(CollegeBasketballData {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl ScheduleSource for CollegeBasketballData {
    fn name(&self) -> &str {
        "CollegeBasketballData"
    }

    async fn fetch_season(
        &self,
        team: &str,
        conference: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ScheduledGame>> {
        let url = url::Url::parse_with_params(
            &format!("{}/games", self.base_url),
            &[
                ("startDateRange", from.to_rfc3339_opts(SecondsFormat::Secs, true)),
                ("endDateRange", to.to_rfc3339_opts(SecondsFormat::Secs, true)),
                ("team", team.to_string()),
                ("conference", conference.to_string()),
            ],
        )
        .context("Invalid schedule API URL")?;
        debug!("Fetching season schedule from {}", url);

        let mut req = self.http.get(url);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let resp = req.send().await.context("Schedule API request failed")?;

        if !resp.status().is_success() {
            anyhow::bail!("Schedule API error: {}", resp.status());
        }

        let raw: serde_json::Value = resp
            .json()
            .await
            .context("Failed to parse schedule response")?;

        Ok(parse_schedule(&raw))
    }
}

/// Accepts a bare list or an object wrapping it in `data` / `games`.
pub fn parse_schedule(raw: &serde_json::Value) -> Vec<ScheduledGame> {
    let list = if raw.is_array() {
        raw
    } else if raw["data"].is_array() {
        &raw["data"]
    } else {
        &raw["games"]
    };
    let Some(items) = list.as_array() else {
        return vec![];
    };

    items
        .iter()
        .filter_map(|g| {
            let raw_start = g["startDate"]
                .as_str()
                .or_else(|| g["start_date"].as_str())?;
            let start = match parse_start(raw_start) {
                Some(s) => s,
                None => {
                    warn!("Skipping scheduled game with unparsable start '{}'", raw_start);
                    return None;
                }
            };
            Some(ScheduledGame {
                start,
                home_team: g["homeTeam"].as_str().map(str::to_string),
                away_team: g["awayTeam"].as_str().map(str::to_string),
            })
        })
        .collect()
}

/// RFC 3339, or a naive timestamp taken as UTC.
fn parse_start(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Season schedule with a 24h cache in front of the remote source.
pub struct CachedSchedule {
    source: Arc<dyn ScheduleSource>,
    db: Database,
    team: String,
    conference: String,
    season_end: DateTime<Utc>,
}

impl CachedSchedule {
    pub fn new(
        source: Arc<dyn ScheduleSource>,
        db: Database,
        team: &str,
        conference: &str,
        season_end: DateTime<Utc>,
    ) -> Self {
        CachedSchedule {
            source,
            db,
            team: team.to_string(),
            conference: conference.to_string(),
            season_end,
        }
    }

    fn cache_key(&self, now: DateTime<Utc>) -> String {
        format!("season_schedule:{}:{}", self.team.to_lowercase(), now.year())
    }

    /// Upcoming games from today through the end of the season.
    ///
    /// `Err` means the schedule is unknown this cycle and is never cached;
    /// `Ok(vec![])` is a genuinely empty season.
    pub async fn games(&self, now: DateTime<Utc>) -> Result<Vec<ScheduledGame>> {
        let key = self.cache_key(now);
        match self.db.kv_get(&key) {
            Ok(Some(bytes)) => match serde_json::from_slice::<Vec<ScheduledGame>>(&bytes) {
                Ok(games) => {
                    info!("Cache hit: {} scheduled games for {}", games.len(), self.team);
                    return Ok(games);
                }
                Err(e) => warn!("Discarding unreadable schedule cache entry: {}", e),
            },
            Ok(None) => {}
            Err(e) => warn!("Schedule cache read failed: {}", e),
        }

        info!("Cache miss: fetching {} schedule from {}", self.team, self.source.name());
        let from = now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|d| d.and_utc())
            .unwrap_or(now);
        let games = self
            .source
            .fetch_season(&self.team, &self.conference, from, self.season_end)
            .await?;

        let encoded = serde_json::to_vec(&games)?;
        if let Err(e) = self.db.kv_set(
            &key,
            &encoded,
            Some(Duration::hours(SCHEDULE_CACHE_TTL_HOURS)),
        ) {
            warn!("Schedule cache write failed: {}", e);
        }
        Ok(games)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeSchedule {
        calls: AtomicUsize,
        fail: bool,
        games: Vec<ScheduledGame>,
    }

    #[async_trait]
    impl ScheduleSource for FakeSchedule {
        fn name(&self) -> &str {
            "fake"
        }

        async fn fetch_season(
            &self,
            _team: &str,
            _conference: &str,
            _from: DateTime<Utc>,
            _to: DateTime<Utc>,
        ) -> Result<Vec<ScheduledGame>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("connection refused");
            }
            Ok(self.games.clone())
        }
    }

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 10, h, 0, 0).unwrap()
    }

    fn cached(fake: Arc<FakeSchedule>, db: Database) -> CachedSchedule {
        CachedSchedule::new(fake, db, "Florida", "SEC", at(23))
    }

    #[test]
    fn test_parse_schedule_shapes() {
        let bare = json!([{ "startDate": "2026-01-10T18:00:00.000Z", "homeTeam": "Florida" }]);
        let wrapped = json!({ "data": [{ "start_date": "2026-01-10T18:00:00" }] });
        let games_key = json!({ "games": [{ "startDate": "2026-01-10T18:00:00+00:00" }] });
        for raw in [bare, wrapped, games_key] {
            let games = parse_schedule(&raw);
            assert_eq!(games.len(), 1);
            assert_eq!(games[0].start, at(18));
        }
    }

    #[test]
    fn test_parse_schedule_skips_records_without_start() {
        let raw = json!([{ "homeTeam": "Florida" }, { "startDate": "soon" }, { "startDate": "2026-01-10T18:00:00Z" }]);
        assert_eq!(parse_schedule(&raw).len(), 1);
        assert!(parse_schedule(&json!({ "data": "oops" })).is_empty());
    }

    #[tokio::test]
    async fn test_cache_hit_skips_fetch() {
        let db = Database::open(":memory:").unwrap();
        let fake = Arc::new(FakeSchedule {
            calls: AtomicUsize::new(0),
            fail: false,
            games: vec![ScheduledGame { start: at(18), home_team: None, away_team: None }],
        });
        let schedule = cached(fake.clone(), db);

        assert_eq!(schedule.games(at(9)).await.unwrap().len(), 1);
        assert_eq!(schedule.games(at(10)).await.unwrap().len(), 1);
        assert_eq!(fake.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_error_not_empty_season() {
        let db = Database::open(":memory:").unwrap();
        let failing = Arc::new(FakeSchedule {
            calls: AtomicUsize::new(0),
            fail: true,
            games: vec![],
        });
        let schedule = cached(failing.clone(), db.clone());
        assert!(schedule.games(at(9)).await.is_err());
        // failures are not cached
        assert!(schedule.games(at(9)).await.is_err());
        assert_eq!(failing.calls.load(Ordering::SeqCst), 2);

        let empty = Arc::new(FakeSchedule {
            calls: AtomicUsize::new(0),
            fail: false,
            games: vec![],
        });
        let schedule = cached(empty, db);
        assert_eq!(schedule.games(at(9)).await.unwrap(), vec![]);
    }
}
