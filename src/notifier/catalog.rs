use super::classifier::{GameStatus, StatusResult};

/// Notification text for a classified game. `None` for `NoGameFound`,
/// which never produces a notification.
pub fn message_for(result: &StatusResult) -> Option<String> {
    let score = format!(
        "Current score: {}: {}, {}: {}",
        result.home_team, result.home_score, result.away_team, result.away_score
    );
    let text = match result.status {
        GameStatus::WinningDecisive => format!(
            "The Gators are up, and you should be, too! Make sure you are up and moving to meet your health goals today. {}",
            score
        ),
        GameStatus::WinningClose => format!(
            "Don't let your guard down just yet! Keep working to meet your health goals for today's game! {}",
            score
        ),
        GameStatus::Tied => format!("Florida is tied! {}", score),
        GameStatus::LosingClose => format!(
            "The Gators won't back down, so why should you? Work hard to meet your health goals today! {}",
            score
        ),
        GameStatus::LosingDecisive => format!(
            "The game isn't lost yet, and neither are your goals! Try to make healthy choices the rest of the game! {}",
            score
        ),
        GameStatus::WonDecisive => format!(
            "When the Gators win, you win! Make this win count by meeting your health goals, too! {}",
            score
        ),
        GameStatus::WonClose => format!(
            "Match the Gator's energy by keeping up with your health goals for today! {}",
            score
        ),
        GameStatus::LostClose => format!(
            "Don't let a loss get you down! Keep an eye on your health journey, instead! {}",
            score
        ),
        GameStatus::LostDecisive => format!(
            "Just because the Gators lost doesn't mean you have to! Make healthy choices after the game! {}",
            score
        ),
        GameStatus::NotStarted => {
            "The game hasn't started yet. Get ready to meet your health goals when it does!".to_string()
        }
        GameStatus::NoGameFound => return None,
    };
    Some(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(status: GameStatus) -> StatusResult {
        StatusResult {
            status,
            home_team: "Florida".into(),
            away_team: "Auburn".into(),
            home_score: 61,
            away_score: 58,
        }
    }

    #[test]
    fn test_live_messages_carry_score() {
        let msg = message_for(&result(GameStatus::WinningClose)).unwrap();
        assert!(msg.starts_with("Don't let your guard down"));
        assert!(msg.ends_with("Current score: Florida: 61, Auburn: 58"));
        assert_eq!(
            message_for(&result(GameStatus::Tied)).unwrap(),
            "Florida is tied! Current score: Florida: 61, Auburn: 58"
        );
    }

    #[test]
    fn test_not_started_is_static() {
        let msg = message_for(&result(GameStatus::NotStarted)).unwrap();
        assert!(!msg.contains("Current score"));
    }

    #[test]
    fn test_no_game_has_no_message() {
        assert!(message_for(&StatusResult::no_game()).is_none());
    }
}
