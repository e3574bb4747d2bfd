/// Append-only action log
use crate::{
    db::{format_timestamp, models::{ActionKind, ActionRecord}},
    error::AppResult,
    metrics,
};
use chrono::{DateTime, Utc};
use sqlx::{AnyConnection, AnyPool, Row};
use tracing::debug;

/// Action log manager
#[derive(Clone)]
pub struct ActionLogManager {
    db: AnyPool,
}

impl ActionLogManager {
    pub fn new(db: AnyPool) -> Self {
        Self { db }
    }

    /// Append an action for a user, stamped with the current time
    pub async fn log(
        &self,
        user_id: i64,
        action: ActionKind,
        details: Option<serde_json::Value>,
    ) -> AppResult<i64> {
        self.log_at(user_id, action, details, Utc::now()).await
    }

    /// Append an action with an explicit timestamp
    pub async fn log_at(
        &self,
        user_id: i64,
        action: ActionKind,
        details: Option<serde_json::Value>,
        at: DateTime<Utc>,
    ) -> AppResult<i64> {
        let mut conn = self.db.acquire().await?;
        let id = insert_action(&mut conn, user_id, action, details.as_ref(), at).await?;
        record_logged(user_id, action);
        Ok(id)
    }

    /// Most recent actions of one user, newest first
    pub async fn recent_for_user(&self, user_id: i64, limit: i64) -> AppResult<Vec<ActionRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, action, details, created_at
            FROM action_log
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        rows.iter().map(ActionRecord::from_row).collect()
    }

    /// Number of entries of one kind since `since`
    pub async fn count_since(&self, action: ActionKind, since: DateTime<Utc>) -> AppResult<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM action_log WHERE action = $1 AND created_at >= $2",
        )
        .bind(action.as_str())
        .bind(format_timestamp(since))
        .fetch_one(&self.db)
        .await?;

        Ok(row.try_get("n")?)
    }
}

/// Insert one action row on an open connection or transaction
pub(crate) async fn insert_action(
    conn: &mut AnyConnection,
    user_id: i64,
    action: ActionKind,
    details: Option<&serde_json::Value>,
    at: DateTime<Utc>,
) -> AppResult<i64> {
    let row = sqlx::query(
        r#"
        INSERT INTO action_log (user_id, action, details, created_at)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(action.as_str())
    .bind(details.map(|d| d.to_string()))
    .bind(format_timestamp(at))
    .fetch_one(&mut *conn)
    .await?;

    Ok(row.try_get("id")?)
}

/// Count and trace an action once its row is durable
pub(crate) fn record_logged(user_id: i64, action: ActionKind) {
    metrics::record_action(action.as_str());
    debug!(user_id, action = action.as_str(), "action logged");
}
