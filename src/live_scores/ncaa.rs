use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::ScoreboardSource;
use crate::db::models::{Game, LifecyclePhase};

/// Scoreboard backed by the public NCAA API mirror.
/// Docs: <https://github.com/henrygd/ncaa-api>
pub struct NcaaScoreboard {
    http: Client,
    /// Base scoreboard URL, e.g. `.../scoreboard/basketball-men/d1`
    base_url: String,
}

impl NcaaScoreboard {
    pub fn new(base_url: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(NcaaScoreboard {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url_for(&self, date_path: Option<&str>) -> String {
        match date_path {
            Some(path) if !path.is_empty() => format!("{}/{}", self.base_url, path),
            _ => self.base_url.clone(),
        }
    }
}

#[async_trait]
impl ScoreboardSource for NcaaScoreboard {
    fn name(&self) -> &str {
        "NCAA"
    }

    async fn fetch_scoreboard(&self, date_path: Option<&str>) -> Result<Vec<Game>> {
        let url = self.url_for(date_path);
        debug!("Fetching scoreboard from {}", url);

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .context("NCAA scoreboard request failed")?;

        if !resp.status().is_success() {
            anyhow::bail!("NCAA scoreboard error: {}", resp.status());
        }

        let raw: serde_json::Value = resp
            .json()
            .await
            .context("Failed to parse NCAA scoreboard response")?;

        Ok(parse_scoreboard(&raw))
    }
}

/// Reduce the raw scoreboard payload to `Game`s. Malformed fields fall back
/// to defaults instead of dropping the game.
pub fn parse_scoreboard(raw: &serde_json::Value) -> Vec<Game> {
    let items = match raw["games"].as_array() {
        Some(a) => a,
        None => return vec![],
    };

    items
        .iter()
        .map(|item| {
            let g = if item["game"].is_object() { &item["game"] } else { item };
            let home = &g["home"];
            let away = &g["away"];

            Game {
                home_team: team_name(home, "Home"),
                away_team: team_name(away, "Away"),
                home_score: parse_score(&home["score"]),
                away_score: parse_score(&away["score"]),
                phase: LifecyclePhase::from_feed(
                    g["gameState"]
                        .as_str()
                        .filter(|s| !s.is_empty())
                        .unwrap_or("pre"),
                ),
            }
        })
        .collect()
}

fn team_name(side: &serde_json::Value, fallback: &str) -> String {
    let names = &side["names"];
    names["short"]
        .as_str()
        .filter(|s| !s.is_empty())
        .or_else(|| names["full"].as_str().filter(|s| !s.is_empty()))
        .unwrap_or(fallback)
        .to_string()
}

fn parse_score(v: &serde_json::Value) -> u32 {
    v.as_str()
        .and_then(|s| s.trim().parse().ok())
        .or_else(|| v.as_u64().and_then(|n| u32::try_from(n).ok()))
        .unwrap_or(0)
}
