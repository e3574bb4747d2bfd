/// Records stored in the relational tables
use crate::db::parse_timestamp;
use crate::error::{AppError, AppResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{any::AnyRow, Row};

/// Registered player
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub(crate) fn from_row(row: &AnyRow) -> AppResult<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            password_hash: row.try_get("password_hash")?,
            created_at: parse_timestamp(&row.try_get::<String, _>("created_at")?)?,
        })
    }
}

/// Outcome of a finished hand, as stored in `hand_history.result`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandResult {
    Win,
    Loss,
    Push,
}

impl HandResult {
    pub const ALL: [HandResult; 3] = [HandResult::Win, HandResult::Loss, HandResult::Push];

    pub fn as_str(&self) -> &'static str {
        match self {
            HandResult::Win => "win",
            HandResult::Loss => "loss",
            HandResult::Push => "push",
        }
    }

    pub fn from_str(s: &str) -> AppResult<Self> {
        match s {
            "win" => Ok(HandResult::Win),
            "loss" => Ok(HandResult::Loss),
            "push" => Ok(HandResult::Push),
            _ => Err(AppError::Validation(format!("Invalid hand result: {}", s))),
        }
    }

    /// Chips won (positive) or lost (negative) for a bet
    pub fn winnings(&self, bet: i64) -> i64 {
        match self {
            HandResult::Win => bet,
            HandResult::Loss => -bet,
            HandResult::Push => 0,
        }
    }
}

/// Kinds of entries in the action log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Register,
    Login,
    LoginFailed,
    Logout,
    Hit,
    Stand,
    NewGame,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Register => "register",
            ActionKind::Login => "login",
            ActionKind::LoginFailed => "login_failed",
            ActionKind::Logout => "logout",
            ActionKind::Hit => "hit",
            ActionKind::Stand => "stand",
            ActionKind::NewGame => "new_game",
        }
    }

    pub fn from_str(s: &str) -> AppResult<Self> {
        match s {
            "register" => Ok(ActionKind::Register),
            "login" => Ok(ActionKind::Login),
            "login_failed" => Ok(ActionKind::LoginFailed),
            "logout" => Ok(ActionKind::Logout),
            "hit" => Ok(ActionKind::Hit),
            "stand" => Ok(ActionKind::Stand),
            "new_game" => Ok(ActionKind::NewGame),
            _ => Err(AppError::Validation(format!("Invalid action: {}", s))),
        }
    }
}

/// A hand ready to be written to `hand_history`
#[derive(Debug, Clone)]
pub struct NewHand {
    pub user_id: i64,
    pub game_id: String,
    pub hand_number: i64,
    pub result: HandResult,
    pub bet_amount: i64,
    pub winnings: i64,
    pub player_hand: String,
    pub dealer_hand: String,
}

/// Row of `hand_history`
#[derive(Debug, Clone, Serialize)]
pub struct HandRecord {
    pub id: i64,
    pub user_id: i64,
    pub game_id: String,
    pub hand_number: i64,
    pub timestamp: DateTime<Utc>,
    pub result: HandResult,
    pub bet_amount: i64,
    pub winnings: i64,
    pub player_hand: String,
    pub dealer_hand: String,
}

impl HandRecord {
    pub(crate) fn from_row(row: &AnyRow) -> AppResult<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            game_id: row.try_get("game_id")?,
            hand_number: row.try_get("hand_number")?,
            timestamp: parse_timestamp(&row.try_get::<String, _>("timestamp")?)?,
            result: HandResult::from_str(&row.try_get::<String, _>("result")?)?,
            bet_amount: row.try_get("bet_amount")?,
            winnings: row.try_get("winnings")?,
            player_hand: row.try_get("player_hand")?,
            dealer_hand: row.try_get("dealer_hand")?,
        })
    }
}

/// Row of `action_log`
///
/// `action` stays a plain string so rows written by other tools still load.
#[derive(Debug, Clone, Serialize)]
pub struct ActionRecord {
    pub id: i64,
    pub user_id: i64,
    pub action: String,
    pub details: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ActionRecord {
    pub(crate) fn from_row(row: &AnyRow) -> AppResult<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            action: row.try_get("action")?,
            details: row.try_get("details")?,
            created_at: parse_timestamp(&row.try_get::<String, _>("created_at")?)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hand_result_parsing() {
        for result in HandResult::ALL {
            assert_eq!(HandResult::from_str(result.as_str()).unwrap(), result);
        }
        assert!(HandResult::from_str("blackjack").is_err());
    }

    #[test]
    fn test_winnings_follow_result() {
        assert_eq!(HandResult::Win.winnings(25), 25);
        assert_eq!(HandResult::Loss.winnings(25), -25);
        assert_eq!(HandResult::Push.winnings(25), 0);
    }

    #[test]
    fn test_action_kind_names() {
        assert_eq!(ActionKind::NewGame.as_str(), "new_game");
        assert_eq!(ActionKind::from_str("login_failed").unwrap(), ActionKind::LoginFailed);
        assert!(ActionKind::from_str("shuffle").is_err());
    }
}
