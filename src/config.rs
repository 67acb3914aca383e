use chrono::{DateTime, Utc};
use clap::Parser;

/// Game-day push notifier for one tracked team
#[derive(Parser, Debug, Clone)]
#[command(name = "gameday-notifier", version, about)]
pub struct Config {
    /// Team whose games are tracked on the scoreboard (substring match)
    #[arg(long, env = "CURR_TEAM", default_value = "Florida")]
    pub tracked_team: String,

    /// Team name used for the season schedule lookup
    #[arg(long, env = "SCHEDULE_TEAM", default_value = "Florida")]
    pub schedule_team: String,

    /// Conference filter for the season schedule lookup
    #[arg(long, env = "SCHEDULE_CONFERENCE", default_value = "SEC")]
    pub schedule_conference: String,

    /// Last day of the season (RFC 3339)
    #[arg(long, env = "SEASON_END", default_value = "2026-04-15T23:59:59Z")]
    pub season_end: String,

    /// Scoreboard URL (a `/YYYY/MM/DD` suffix selects another day)
    #[arg(
        long,
        env = "NCAA_SCOREBOARD_URL",
        default_value = "https://ncaa-api.henrygd.me/scoreboard/basketball-men/d1"
    )]
    pub scoreboard_url: String,

    /// Season schedule API base URL
    #[arg(
        long,
        env = "SCHEDULE_API_URL",
        default_value = "https://api.collegebasketballdata.com"
    )]
    pub schedule_api_url: String,

    /// Bearer key for the season schedule API
    #[arg(long, env = "COLLEGE_BASKETBALL_API_KEY")]
    pub schedule_api_key: Option<String>,

    /// Push service endpoint
    #[arg(
        long,
        env = "PUSH_API_URL",
        default_value = "https://exp.host/--/api/v2/push/send"
    )]
    pub push_api_url: String,

    /// Title shown on every push
    #[arg(long, env = "NOTIFICATION_TITLE", default_value = "Health Notification")]
    pub notification_title: String,

    /// SQLite database path
    #[arg(long, env = "DATABASE_PATH", default_value = "gameday.db")]
    pub database_path: String,

    /// Lock file guarding against overlapping polls
    #[arg(long, env = "LOCK_PATH", default_value = "gameday-notifier.lock")]
    pub lock_path: String,

    /// Status API listen address
    #[arg(long, env = "DASHBOARD_ADDR", default_value = "0.0.0.0:8080")]
    pub dashboard_addr: String,

    /// Seconds between polls in long-running mode
    #[arg(long, env = "POLL_INTERVAL_SECS", default_value = "300")]
    pub poll_interval_secs: u64,

    /// Run one poll and exit (for cron)
    #[arg(long, env = "ONCE", default_value = "false")]
    pub once: bool,

    /// Log pushes instead of sending them
    #[arg(long, env = "DRY_RUN", default_value = "false")]
    pub dry_run: bool,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.tracked_team.trim().is_empty() {
            anyhow::bail!("tracked_team must not be empty");
        }
        if self.schedule_team.trim().is_empty() {
            anyhow::bail!("schedule_team must not be empty");
        }
        if self.poll_interval_secs == 0 {
            anyhow::bail!("poll_interval_secs must be positive");
        }
        self.season_end()?;
        Ok(())
    }

    pub fn season_end(&self) -> anyhow::Result<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.season_end)
            .map(|d| d.with_timezone(&Utc))
            .map_err(|e| anyhow::anyhow!("season_end '{}' is not RFC 3339: {}", self.season_end, e))
    }
}
