//! Maps a day's scoreboard to one status for the tracked team.
//!
//! Status is bucketed on the tracked team's score differential:
//!
//! ```text
//!   diff ≥ 14        decisive lead     (winning_decisive / won_decisive)
//!   1 ≤ diff < 14    close lead        (winning_close    / won_close)
//!   diff == 0        tied              (live only)
//!   −14 < diff ≤ −1  close deficit     (losing_close     / lost_close)
//!   diff ≤ −14       decisive deficit  (losing_decisive  / lost_decisive)
//! ```

use tracing::{info, warn};

use crate::db::models::{Game, LifecyclePhase};

/// Differential at which a lead or deficit counts as decisive.
pub const DECISIVE_MARGIN: i64 = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    WinningDecisive,
    WinningClose,
    Tied,
    LosingClose,
    LosingDecisive,
    WonDecisive,
    WonClose,
    LostClose,
    LostDecisive,
    NotStarted,
    NoGameFound,
}

impl GameStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameStatus::WinningDecisive => "winning_decisive",
            GameStatus::WinningClose => "winning_close",
            GameStatus::Tied => "tied",
            GameStatus::LosingClose => "losing_close",
            GameStatus::LosingDecisive => "losing_decisive",
            GameStatus::WonDecisive => "won_decisive",
            GameStatus::WonClose => "won_close",
            GameStatus::LostClose => "lost_close",
            GameStatus::LostDecisive => "lost_decisive",
            GameStatus::NotStarted => "Game not started",
            GameStatus::NoGameFound => "No game found",
        }
    }

    /// The only completion phase this status may be paired with.
    pub fn completion(&self) -> CompletionPhase {
        match self {
            GameStatus::WinningDecisive
            | GameStatus::WinningClose
            | GameStatus::Tied
            | GameStatus::LosingClose
            | GameStatus::LosingDecisive => CompletionPhase::InProgress,
            GameStatus::WonDecisive
            | GameStatus::WonClose
            | GameStatus::LostClose
            | GameStatus::LostDecisive => CompletionPhase::Completed,
            GameStatus::NotStarted => CompletionPhase::Scheduled,
            GameStatus::NoGameFound => CompletionPhase::Unknown,
        }
    }
}

impl std::fmt::Display for GameStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionPhase {
    Unknown,
    Scheduled,
    InProgress,
    Completed,
}

impl CompletionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompletionPhase::Unknown => "unknown",
            CompletionPhase::Scheduled => "scheduled",
            CompletionPhase::InProgress => "in_progress",
            CompletionPhase::Completed => "completed",
        }
    }
}

/// Classifier output; the unit handed to dedup and dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusResult {
    pub status: GameStatus,
    pub home_team: String,
    pub away_team: String,
    pub home_score: u32,
    pub away_score: u32,
}

impl StatusResult {
    fn new(status: GameStatus, game: &Game, home_score: u32, away_score: u32) -> Self {
        StatusResult {
            status,
            home_team: game.home_team.clone(),
            away_team: game.away_team.clone(),
            home_score,
            away_score,
        }
    }

    pub fn no_game() -> Self {
        StatusResult {
            status: GameStatus::NoGameFound,
            home_team: String::new(),
            away_team: String::new(),
            home_score: 0,
            away_score: 0,
        }
    }

    /// Derived from `status`, so the pair can never disagree.
    pub fn completion(&self) -> CompletionPhase {
        self.status.completion()
    }
}

/// Exact name or substring match on either side, after trimming.
pub fn team_matches(name: &str, team: &str) -> bool {
    let name = name.trim();
    name == team || name.contains(team)
}

fn involves(game: &Game, team: &str) -> bool {
    team_matches(&game.home_team, team) || team_matches(&game.away_team, team)
}

/// Classify the first game on the board (in list order) involving `team`.
pub fn classify(games: &[Game], team: &str) -> StatusResult {
    let team = team.trim();
    let mut matches = games.iter().filter(|g| involves(g, team));

    let Some(game) = matches.next() else {
        info!("No game found for {}", team);
        return StatusResult::no_game();
    };
    // Substring matching is loose ("Florida" also hits "Florida State");
    // surface the ambiguity instead of silently picking one.
    for other in matches {
        warn!(
            "'{}' also matches {} vs {}; using {} vs {}",
            team, other.home_team, other.away_team, game.home_team, game.away_team
        );
    }

    let (ours, theirs) = if team_matches(&game.home_team, team) {
        (game.home_score, game.away_score)
    } else {
        (game.away_score, game.home_score)
    };
    let diff = i64::from(ours) - i64::from(theirs);

    let status = match game.phase {
        LifecyclePhase::Live => live_status(diff),
        LifecyclePhase::Final => final_status(diff),
        LifecyclePhase::Pre | LifecyclePhase::Unknown => {
            info!(
                "Game not started ({} vs {}, phase={:?})",
                game.home_team, game.away_team, game.phase
            );
            return StatusResult::new(GameStatus::NotStarted, game, 0, 0);
        }
    };

    info!(
        "{} vs {}: {} (score_diff={})",
        game.home_team, game.away_team, status, diff
    );
    StatusResult::new(status, game, game.home_score, game.away_score)
}

fn live_status(diff: i64) -> GameStatus {
    match diff {
        d if d >= DECISIVE_MARGIN => GameStatus::WinningDecisive,
        d if d >= 1 => GameStatus::WinningClose,
        0 => GameStatus::Tied,
        d if d > -DECISIVE_MARGIN => GameStatus::LosingClose,
        _ => GameStatus::LosingDecisive,
    }
}

fn final_status(diff: i64) -> GameStatus {
    match diff {
        d if d >= DECISIVE_MARGIN => GameStatus::WonDecisive,
        d if d >= 1 => GameStatus::WonClose,
        d if d <= -1 && d > -DECISIVE_MARGIN => GameStatus::LostClose,
        d => {
            // No drawn-final status exists; a level final lands here too.
            if d == 0 {
                warn!("Final game reported level; classifying as lost_decisive");
            }
            GameStatus::LostDecisive
        }
    }
}
