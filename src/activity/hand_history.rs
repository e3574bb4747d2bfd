/// Completed hands and per-player statistics
use super::percentage;
use super::action_log::{insert_action, record_logged};
use crate::{
    db::{format_timestamp, models::{ActionKind, HandRecord, NewHand}},
    error::{AppError, AppResult},
    metrics,
    timeframe::days_between,
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use sqlx::{AnyConnection, AnyPool, Row};
use std::collections::HashMap;
use tracing::{info, warn};

/// Lifetime statistics for one player
#[derive(Debug, Clone, Default, Serialize)]
pub struct UserStatistics {
    pub total_games: i64,
    pub wins: i64,
    pub losses: i64,
    pub pushes: i64,
    /// Percentage of hands won, one decimal place
    pub win_rate: f64,
    pub net_winnings: i64,
}

/// Hands played on one calendar day
#[derive(Debug, Clone, Serialize)]
pub struct DailyGames {
    pub date: NaiveDate,
    pub games: i64,
    pub wins: i64,
}

/// What [`HandHistoryManager::record_turn`] wrote
#[derive(Debug)]
pub enum Turn {
    /// The action was logged; the hand goes on
    Logged,
    /// The action was logged and the finished hand recorded
    Settled(HandRecord),
    /// The hand was recorded earlier; nothing was written
    AlreadySettled,
}

/// Hand history manager
#[derive(Clone)]
pub struct HandHistoryManager {
    db: AnyPool,
}

impl HandHistoryManager {
    pub fn new(db: AnyPool) -> Self {
        Self { db }
    }

    /// Record a completed hand with an explicit timestamp
    pub async fn record_hand_at(&self, hand: &NewHand, at: DateTime<Utc>) -> AppResult<HandRecord> {
        let mut conn = self.db.acquire().await?;
        let record = insert_hand(&mut conn, hand, at).await?;
        record_settled(&record);
        Ok(record)
    }

    /// Write one hit or stand together with the hand it finished, if any
    ///
    /// Both rows commit or neither does. A hand that is already in the history
    /// (a replayed table cookie) rolls the whole turn back and yields
    /// [`Turn::AlreadySettled`].
    pub async fn record_turn(
        &self,
        user_id: i64,
        action: ActionKind,
        details: serde_json::Value,
        hand: Option<&NewHand>,
    ) -> AppResult<Turn> {
        let at = Utc::now();
        let mut tx = self.db.begin().await?;

        insert_action(&mut tx, user_id, action, Some(&details), at).await?;

        let record = match hand {
            Some(hand) => match insert_hand(&mut tx, hand, at).await {
                Ok(record) => Some(record),
                Err(e) if is_unique_violation(&e) => {
                    tx.rollback().await?;
                    warn!(
                        user_id,
                        game_id = %hand.game_id,
                        hand_number = hand.hand_number,
                        "hand already recorded; turn discarded"
                    );
                    return Ok(Turn::AlreadySettled);
                }
                Err(e) => return Err(e),
            },
            None => None,
        };

        tx.commit().await?;

        record_logged(user_id, action);
        Ok(match record {
            Some(record) => {
                record_settled(&record);
                Turn::Settled(record)
            }
            None => Turn::Logged,
        })
    }

    /// Win / loss / push counts for one player
    pub async fn user_statistics(&self, user_id: i64) -> AppResult<UserStatistics> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total_games,
                CAST(COALESCE(SUM(CASE WHEN result = 'win' THEN 1 ELSE 0 END), 0) AS BIGINT) AS wins,
                CAST(COALESCE(SUM(CASE WHEN result = 'loss' THEN 1 ELSE 0 END), 0) AS BIGINT) AS losses,
                CAST(COALESCE(SUM(CASE WHEN result = 'push' THEN 1 ELSE 0 END), 0) AS BIGINT) AS pushes,
                CAST(COALESCE(SUM(winnings), 0) AS BIGINT) AS net_winnings
            FROM hand_history
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        let total_games: i64 = row.try_get("total_games")?;
        let wins: i64 = row.try_get("wins")?;

        Ok(UserStatistics {
            total_games,
            wins,
            losses: row.try_get("losses")?,
            pushes: row.try_get("pushes")?,
            win_rate: percentage(wins, total_games),
            net_winnings: row.try_get("net_winnings")?,
        })
    }

    /// Most recent hands of one player, newest first
    pub async fn recent_games(&self, user_id: i64, limit: i64) -> AppResult<Vec<HandRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, game_id, hand_number, timestamp, result,
                   bet_amount, winnings, player_hand, dealer_hand
            FROM hand_history
            WHERE user_id = $1
            ORDER BY timestamp DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        rows.iter().map(HandRecord::from_row).collect()
    }

    /// Hands per day for one player over the last `days` days, gaps filled with zeros
    pub async fn user_game_history(
        &self,
        user_id: i64,
        days: i64,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<DailyGames>> {
        let since = now - Duration::days(days);

        let rows = sqlx::query(
            r#"
            SELECT substr(timestamp, 1, 10) AS day,
                   COUNT(*) AS games,
                   CAST(COALESCE(SUM(CASE WHEN result = 'win' THEN 1 ELSE 0 END), 0) AS BIGINT) AS wins
            FROM hand_history
            WHERE user_id = $1 AND timestamp >= $2
            GROUP BY substr(timestamp, 1, 10)
            "#,
        )
        .bind(user_id)
        .bind(format_timestamp(since))
        .fetch_all(&self.db)
        .await?;

        let mut by_day: HashMap<String, (i64, i64)> = HashMap::new();
        for row in &rows {
            by_day.insert(
                row.try_get("day")?,
                (row.try_get("games")?, row.try_get("wins")?),
            );
        }

        Ok(days_between(since, now)
            .into_iter()
            .map(|date| {
                let (games, wins) = by_day
                    .get(&date.format("%Y-%m-%d").to_string())
                    .copied()
                    .unwrap_or((0, 0));
                DailyGames { date, games, wins }
            })
            .collect())
    }
}

fn is_unique_violation(error: &AppError) -> bool {
    matches!(error, AppError::Database(sqlx::Error::Database(db_err)) if db_err.is_unique_violation())
}

/// Insert one hand row on an open connection or transaction
async fn insert_hand(
    conn: &mut AnyConnection,
    hand: &NewHand,
    at: DateTime<Utc>,
) -> AppResult<HandRecord> {
    let row = sqlx::query(
        r#"
        INSERT INTO hand_history
            (user_id, game_id, hand_number, timestamp, result,
             bet_amount, winnings, player_hand, dealer_hand)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING id
        "#,
    )
    .bind(hand.user_id)
    .bind(&hand.game_id)
    .bind(hand.hand_number)
    .bind(format_timestamp(at))
    .bind(hand.result.as_str())
    .bind(hand.bet_amount)
    .bind(hand.winnings)
    .bind(&hand.player_hand)
    .bind(&hand.dealer_hand)
    .fetch_one(&mut *conn)
    .await?;

    Ok(HandRecord {
        id: row.try_get("id")?,
        user_id: hand.user_id,
        game_id: hand.game_id.clone(),
        hand_number: hand.hand_number,
        timestamp: at,
        result: hand.result,
        bet_amount: hand.bet_amount,
        winnings: hand.winnings,
        player_hand: hand.player_hand.clone(),
        dealer_hand: hand.dealer_hand.clone(),
    })
}

fn record_settled(record: &HandRecord) {
    metrics::record_hand(record.result.as_str());
    info!(
        user_id = record.user_id,
        game_id = %record.game_id,
        hand_number = record.hand_number,
        result = record.result.as_str(),
        winnings = record.winnings,
        "hand recorded"
    );
}
