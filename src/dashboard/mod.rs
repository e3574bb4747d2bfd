/// Operational dashboard aggregation
///
/// Turns the raw `users`, `hand_history` and `action_log` tables into the
/// numbers shown on the dashboards: counts over rolling windows, per-day and
/// per-hour activity, distinct active users, the busiest players and the
/// action histogram. Every query takes `now` explicitly so the windows are
/// consistent within one render.
///
/// A failing database never fails the page: [`DashboardManager::snapshot`]
/// falls back to an empty snapshot whose health reads "disconnected".

pub mod security;

pub use security::{
    ActionItem, CriticalIssue, HealthSummary, InfrastructureHealth, SecurityMetrics, SecurityScore,
};

use crate::{
    activity::{percentage, ratio},
    config::ServerConfig,
    db::{format_timestamp, DatabaseBackend},
    error::{AppError, AppResult},
    metrics,
    timeframe::{days_between, Window},
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use sqlx::{AnyPool, Row};
use std::{collections::BTreeMap, collections::HashMap, sync::Arc};
use tracing::warn;

/// Days of history on the daily activity chart
pub const DAILY_ACTIVITY_DAYS: i64 = 30;
/// Days folded into the hour-of-day chart
pub const HOURLY_ACTIVITY_DAYS: i64 = 7;
/// Rows in the most active players table
pub const MOST_ACTIVE_LIMIT: i64 = 10;

/// Headline counts
#[derive(Debug, Clone, Default, Serialize)]
pub struct SystemOverview {
    pub total_users: i64,
    pub new_users_today: i64,
    pub new_users_7d: i64,
    pub new_users_30d: i64,
    pub active_users_today: i64,
    pub active_users_24h: i64,
    pub active_users_7d: i64,
    pub total_games: i64,
    pub games_today: i64,
    pub games_24h: i64,
    pub games_7d: i64,
    pub games_30d: i64,
    pub total_actions: i64,
    pub logins_today: i64,
    pub logins_24h: i64,
    pub logins_7d: i64,
}

/// Activity on one calendar day
#[derive(Debug, Clone, Serialize)]
pub struct DailyActivity {
    pub date: NaiveDate,
    pub games: i64,
    pub logins: i64,
    pub new_users: i64,
}

/// Activity in one hour of the day, summed across the window
#[derive(Debug, Clone, Serialize)]
pub struct HourlyActivity {
    pub hour: u32,
    pub games: i64,
    pub logins: i64,
}

/// Row of the most active players table
#[derive(Debug, Clone, Serialize)]
pub struct ActiveUser {
    pub username: String,
    pub games: i64,
    pub wins: i64,
    pub win_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseStatus {
    Connected,
    Disconnected,
}

impl DatabaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseStatus::Connected => "connected",
            DatabaseStatus::Disconnected => "disconnected",
        }
    }
}

/// Rows per table
#[derive(Debug, Clone, Default, Serialize)]
pub struct RecordCounts {
    pub users: i64,
    pub games: i64,
    pub actions: i64,
}

impl RecordCounts {
    pub fn total(&self) -> i64 {
        self.users + self.games + self.actions
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemHealth {
    pub database_status: DatabaseStatus,
    pub total_records: RecordCounts,
    pub avg_games_per_user: f64,
    /// Percentage of all hands won by players
    pub overall_win_rate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SystemHealth {
    pub fn disconnected(error: String) -> Self {
        Self {
            database_status: DatabaseStatus::Disconnected,
            total_records: RecordCounts::default(),
            avg_games_per_user: 0.0,
            overall_win_rate: 0.0,
            error: Some(error),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.database_status == DatabaseStatus::Connected
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PerformanceMetrics {
    pub total_users: i64,
    pub total_games: i64,
    pub total_actions: i64,
    pub avg_games_per_user: f64,
    pub games_last_hour: i64,
    pub actions_last_hour: i64,
    pub active_users_last_hour: i64,
    /// Actions per active user in the last hour
    pub activity_rate: f64,
}

/// Everything the operational dashboard shows, gathered at one instant
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub generated_at: DateTime<Utc>,
    pub overview: SystemOverview,
    pub daily_activity: Vec<DailyActivity>,
    pub hourly_activity: Vec<HourlyActivity>,
    pub action_distribution: BTreeMap<String, i64>,
    pub most_active_users: Vec<ActiveUser>,
    pub system_health: SystemHealth,
    pub performance: PerformanceMetrics,
}

impl DashboardSnapshot {
    /// Placeholder used when the database cannot be queried
    pub fn degraded(now: DateTime<Utc>, error: String) -> Self {
        Self {
            generated_at: now,
            overview: SystemOverview::default(),
            daily_activity: Vec::new(),
            hourly_activity: empty_hours(),
            action_distribution: BTreeMap::new(),
            most_active_users: Vec::new(),
            system_health: SystemHealth::disconnected(error),
            performance: PerformanceMetrics::default(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        !self.system_health.is_connected()
    }
}

/// Admin view: the snapshot plus the security report
#[derive(Debug, Clone, Serialize)]
pub struct AdminReport {
    pub snapshot: DashboardSnapshot,
    pub security: SecurityMetrics,
    pub security_score: SecurityScore,
    pub critical_issues: Vec<CriticalIssue>,
    pub action_items: Vec<ActionItem>,
    pub health_summary: HealthSummary,
    pub infrastructure: InfrastructureHealth,
}

/// Dashboard query service
#[derive(Clone)]
pub struct DashboardManager {
    db: AnyPool,
    backend: DatabaseBackend,
    config: Arc<ServerConfig>,
}

impl DashboardManager {
    pub fn new(db: AnyPool, backend: DatabaseBackend, config: Arc<ServerConfig>) -> Self {
        Self {
            db,
            backend,
            config,
        }
    }

    /// Gather the full dashboard, degrading instead of failing on database errors
    pub async fn snapshot(&self, now: DateTime<Utc>) -> DashboardSnapshot {
        match self.try_snapshot(now).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "dashboard metrics unavailable, serving degraded view");
                metrics::record_dashboard_degraded();
                DashboardSnapshot::degraded(now, e.to_string())
            }
        }
    }

    /// Gather the full dashboard, propagating the first database error
    pub async fn try_snapshot(&self, now: DateTime<Utc>) -> AppResult<DashboardSnapshot> {
        let system_health = self.system_health().await;
        if let Some(error) = &system_health.error {
            return Err(AppError::Internal(error.clone()));
        }

        Ok(DashboardSnapshot {
            generated_at: now,
            overview: self.system_overview(now).await?,
            daily_activity: self.daily_activity(DAILY_ACTIVITY_DAYS, now).await?,
            hourly_activity: self.hourly_activity(HOURLY_ACTIVITY_DAYS, now).await?,
            action_distribution: self.action_distribution(None).await?,
            most_active_users: self.most_active_users(MOST_ACTIVE_LIMIT).await?,
            system_health,
            performance: self.performance_metrics(now).await?,
        })
    }

    /// Snapshot plus security posture for the admin dashboard
    pub async fn admin_report(&self, now: DateTime<Utc>) -> AdminReport {
        let snapshot = self.snapshot(now).await;
        let security = match self.security_metrics(now).await {
            Ok(security) => security,
            Err(e) => {
                warn!(error = %e, "security metrics unavailable");
                SecurityMetrics::from_config(&self.config, 0, 0, 0)
            }
        };
        let security_score = security.score();
        let critical_issues = security::critical_issues(&security, &snapshot.system_health);
        let action_items = security::action_items(&critical_issues);
        let health_summary =
            security::health_summary(&snapshot.system_health, &security, &security_score, now);
        let infrastructure =
            InfrastructureHealth::new(&self.config, self.backend, &snapshot.system_health);

        AdminReport {
            snapshot,
            security,
            security_score,
            critical_issues,
            action_items,
            health_summary,
            infrastructure,
        }
    }

    /// Headline counts over the standard windows
    pub async fn system_overview(&self, now: DateTime<Utc>) -> AppResult<SystemOverview> {
        let today = format_timestamp(Window::Today.since(now));
        let last_24h = format_timestamp(Window::Last24Hours.since(now));
        let last_7d = format_timestamp(Window::Last7Days.since(now));
        let last_30d = format_timestamp(Window::Last30Days.since(now));

        let users = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total,
                CAST(COALESCE(SUM(CASE WHEN created_at >= $1 THEN 1 ELSE 0 END), 0) AS BIGINT) AS today,
                CAST(COALESCE(SUM(CASE WHEN created_at >= $2 THEN 1 ELSE 0 END), 0) AS BIGINT) AS last_7d,
                CAST(COALESCE(SUM(CASE WHEN created_at >= $3 THEN 1 ELSE 0 END), 0) AS BIGINT) AS last_30d
            FROM users
            "#,
        )
        .bind(&today)
        .bind(&last_7d)
        .bind(&last_30d)
        .fetch_one(&self.db)
        .await?;

        let games = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total,
                CAST(COALESCE(SUM(CASE WHEN timestamp >= $1 THEN 1 ELSE 0 END), 0) AS BIGINT) AS today,
                CAST(COALESCE(SUM(CASE WHEN timestamp >= $2 THEN 1 ELSE 0 END), 0) AS BIGINT) AS last_24h,
                CAST(COALESCE(SUM(CASE WHEN timestamp >= $3 THEN 1 ELSE 0 END), 0) AS BIGINT) AS last_7d,
                CAST(COALESCE(SUM(CASE WHEN timestamp >= $4 THEN 1 ELSE 0 END), 0) AS BIGINT) AS last_30d
            FROM hand_history
            "#,
        )
        .bind(&today)
        .bind(&last_24h)
        .bind(&last_7d)
        .bind(&last_30d)
        .fetch_one(&self.db)
        .await?;

        let actions = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total,
                CAST(COALESCE(SUM(CASE WHEN action = 'login' AND created_at >= $1 THEN 1 ELSE 0 END), 0) AS BIGINT) AS logins_today,
                CAST(COALESCE(SUM(CASE WHEN action = 'login' AND created_at >= $2 THEN 1 ELSE 0 END), 0) AS BIGINT) AS logins_24h,
                CAST(COALESCE(SUM(CASE WHEN action = 'login' AND created_at >= $3 THEN 1 ELSE 0 END), 0) AS BIGINT) AS logins_7d
            FROM action_log
            "#,
        )
        .bind(&today)
        .bind(&last_24h)
        .bind(&last_7d)
        .fetch_one(&self.db)
        .await?;

        // Distinct users with a login in each window
        let active = sqlx::query(
            r#"
            SELECT
                COUNT(DISTINCT CASE WHEN created_at >= $1 THEN user_id END) AS today,
                COUNT(DISTINCT CASE WHEN created_at >= $2 THEN user_id END) AS last_24h,
                COUNT(DISTINCT CASE WHEN created_at >= $3 THEN user_id END) AS last_7d
            FROM action_log
            WHERE action = 'login'
            "#,
        )
        .bind(&today)
        .bind(&last_24h)
        .bind(&last_7d)
        .fetch_one(&self.db)
        .await?;

        Ok(SystemOverview {
            total_users: users.try_get("total")?,
            new_users_today: users.try_get("today")?,
            new_users_7d: users.try_get("last_7d")?,
            new_users_30d: users.try_get("last_30d")?,
            active_users_today: active.try_get("today")?,
            active_users_24h: active.try_get("last_24h")?,
            active_users_7d: active.try_get("last_7d")?,
            total_games: games.try_get("total")?,
            games_today: games.try_get("today")?,
            games_24h: games.try_get("last_24h")?,
            games_7d: games.try_get("last_7d")?,
            games_30d: games.try_get("last_30d")?,
            total_actions: actions.try_get("total")?,
            logins_today: actions.try_get("logins_today")?,
            logins_24h: actions.try_get("logins_24h")?,
            logins_7d: actions.try_get("logins_7d")?,
        })
    }

    /// Games, logins and sign-ups per calendar day since `now - days`, oldest first
    pub async fn daily_activity(&self, days: i64, now: DateTime<Utc>) -> AppResult<Vec<DailyActivity>> {
        let since = now - Duration::days(days);
        let since_str = format_timestamp(since);

        let games = self
            .count_by_bucket(
                "SELECT substr(timestamp, 1, 10) AS bucket, COUNT(*) AS n \
                 FROM hand_history WHERE timestamp >= $1 \
                 GROUP BY substr(timestamp, 1, 10)",
                &since_str,
            )
            .await?;
        let logins = self
            .count_by_bucket(
                "SELECT substr(created_at, 1, 10) AS bucket, COUNT(*) AS n \
                 FROM action_log WHERE action = 'login' AND created_at >= $1 \
                 GROUP BY substr(created_at, 1, 10)",
                &since_str,
            )
            .await?;
        let new_users = self
            .count_by_bucket(
                "SELECT substr(created_at, 1, 10) AS bucket, COUNT(*) AS n \
                 FROM users WHERE created_at >= $1 \
                 GROUP BY substr(created_at, 1, 10)",
                &since_str,
            )
            .await?;

        Ok(days_between(since, now)
            .into_iter()
            .map(|date| {
                let key = date.format("%Y-%m-%d").to_string();
                DailyActivity {
                    date,
                    games: games.get(&key).copied().unwrap_or(0),
                    logins: logins.get(&key).copied().unwrap_or(0),
                    new_users: new_users.get(&key).copied().unwrap_or(0),
                }
            })
            .collect())
    }

    /// Games and logins by hour of day (UTC) over the last `days` days; always 24 entries
    pub async fn hourly_activity(&self, days: i64, now: DateTime<Utc>) -> AppResult<Vec<HourlyActivity>> {
        let since_str = format_timestamp(now - Duration::days(days));

        let games = self
            .count_by_bucket(
                "SELECT substr(timestamp, 12, 2) AS bucket, COUNT(*) AS n \
                 FROM hand_history WHERE timestamp >= $1 \
                 GROUP BY substr(timestamp, 12, 2)",
                &since_str,
            )
            .await?;
        let logins = self
            .count_by_bucket(
                "SELECT substr(created_at, 12, 2) AS bucket, COUNT(*) AS n \
                 FROM action_log WHERE action = 'login' AND created_at >= $1 \
                 GROUP BY substr(created_at, 12, 2)",
                &since_str,
            )
            .await?;

        let mut hours = empty_hours();
        for (bucket, count) in games {
            hours[parse_hour(&bucket)?].games += count;
        }
        for (bucket, count) in logins {
            hours[parse_hour(&bucket)?].logins += count;
        }

        Ok(hours)
    }

    /// Number of action log entries per action, optionally limited to `since`
    pub async fn action_distribution(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> AppResult<BTreeMap<String, i64>> {
        let sql = if since.is_some() {
            "SELECT action, COUNT(*) AS n FROM action_log WHERE created_at >= $1 GROUP BY action"
        } else {
            "SELECT action, COUNT(*) AS n FROM action_log GROUP BY action"
        };

        let mut query = sqlx::query(sql);
        if let Some(since) = since {
            query = query.bind(format_timestamp(since));
        }

        let rows = query.fetch_all(&self.db).await?;
        let mut distribution = BTreeMap::new();
        for row in &rows {
            distribution.insert(row.try_get::<String, _>("action")?, row.try_get::<i64, _>("n")?);
        }

        Ok(distribution)
    }

    /// Number of action log entries, optionally limited to `since`
    pub async fn action_count(&self, since: Option<DateTime<Utc>>) -> AppResult<i64> {
        let row = match since {
            Some(since) => {
                sqlx::query("SELECT COUNT(*) AS n FROM action_log WHERE created_at >= $1")
                    .bind(format_timestamp(since))
                    .fetch_one(&self.db)
                    .await?
            }
            None => {
                sqlx::query("SELECT COUNT(*) AS n FROM action_log")
                    .fetch_one(&self.db)
                    .await?
            }
        };

        Ok(row.try_get("n")?)
    }

    /// Players with the most hands, ties broken by username
    pub async fn most_active_users(&self, limit: i64) -> AppResult<Vec<ActiveUser>> {
        let rows = sqlx::query(
            r#"
            SELECT u.username AS username,
                   COUNT(h.id) AS games,
                   CAST(COALESCE(SUM(CASE WHEN h.result = 'win' THEN 1 ELSE 0 END), 0) AS BIGINT) AS wins
            FROM hand_history h
            JOIN users u ON u.id = h.user_id
            GROUP BY u.id, u.username
            ORDER BY games DESC, u.username ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        rows.iter()
            .map(|row| {
                let games: i64 = row.try_get("games")?;
                let wins: i64 = row.try_get("wins")?;
                Ok(ActiveUser {
                    username: row.try_get("username")?,
                    games,
                    wins,
                    win_rate: percentage(wins, games),
                })
            })
            .collect()
    }

    /// Database reachability and table sizes
    pub async fn system_health(&self) -> SystemHealth {
        match self.record_counts().await {
            Ok((counts, wins)) => SystemHealth {
                database_status: DatabaseStatus::Connected,
                avg_games_per_user: ratio(counts.games, counts.users),
                overall_win_rate: percentage(wins, counts.games),
                total_records: counts,
                error: None,
            },
            Err(e) => {
                warn!(error = %e, "database health check failed");
                SystemHealth::disconnected(e.to_string())
            }
        }
    }

    /// Load over the last hour
    pub async fn performance_metrics(&self, now: DateTime<Utc>) -> AppResult<PerformanceMetrics> {
        let (counts, _) = self.record_counts().await?;
        let hour_ago = Window::LastHour.since(now);

        let games_last_hour: i64 = sqlx::query(
            "SELECT COUNT(*) AS n FROM hand_history WHERE timestamp >= $1",
        )
        .bind(format_timestamp(hour_ago))
        .fetch_one(&self.db)
        .await?
        .try_get("n")?;

        let active_users_last_hour: i64 = sqlx::query(
            "SELECT COUNT(DISTINCT user_id) AS n FROM action_log WHERE created_at >= $1",
        )
        .bind(format_timestamp(hour_ago))
        .fetch_one(&self.db)
        .await?
        .try_get("n")?;

        let actions_last_hour = self.action_count(Some(hour_ago)).await?;

        Ok(PerformanceMetrics {
            avg_games_per_user: ratio(counts.games, counts.users),
            total_users: counts.users,
            total_games: counts.games,
            total_actions: counts.actions,
            games_last_hour,
            actions_last_hour,
            active_users_last_hour,
            activity_rate: ratio(actions_last_hour, active_users_last_hour),
        })
    }

    /// Login and failed-login counts plus the configured protections
    pub async fn security_metrics(&self, now: DateTime<Utc>) -> AppResult<SecurityMetrics> {
        let row = sqlx::query(
            r#"
            SELECT
                CAST(COALESCE(SUM(CASE WHEN action = 'login' AND created_at >= $1 THEN 1 ELSE 0 END), 0) AS BIGINT) AS logins_24h,
                CAST(COALESCE(SUM(CASE WHEN action = 'login' AND created_at >= $2 THEN 1 ELSE 0 END), 0) AS BIGINT) AS logins_7d,
                CAST(COALESCE(SUM(CASE WHEN action = 'login_failed' AND created_at >= $1 THEN 1 ELSE 0 END), 0) AS BIGINT) AS failed_24h
            FROM action_log
            "#,
        )
        .bind(format_timestamp(Window::Last24Hours.since(now)))
        .bind(format_timestamp(Window::Last7Days.since(now)))
        .fetch_one(&self.db)
        .await?;

        Ok(SecurityMetrics::from_config(
            &self.config,
            row.try_get("logins_24h")?,
            row.try_get("logins_7d")?,
            row.try_get("failed_24h")?,
        ))
    }

    /// Row counts per table and the number of winning hands
    async fn record_counts(&self) -> AppResult<(RecordCounts, i64)> {
        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users) AS users,
                (SELECT COUNT(*) FROM hand_history) AS games,
                (SELECT COUNT(*) FROM action_log) AS actions,
                (SELECT COUNT(*) FROM hand_history WHERE result = 'win') AS wins
            "#,
        )
        .fetch_one(&self.db)
        .await?;

        Ok((
            RecordCounts {
                users: row.try_get("users")?,
                games: row.try_get("games")?,
                actions: row.try_get("actions")?,
            },
            row.try_get("wins")?,
        ))
    }

    /// Run a `bucket, n` grouping query bound to one lower bound
    async fn count_by_bucket(&self, sql: &str, since: &str) -> AppResult<HashMap<String, i64>> {
        let rows = sqlx::query(sql).bind(since).fetch_all(&self.db).await?;

        let mut buckets = HashMap::new();
        for row in &rows {
            buckets.insert(row.try_get::<String, _>("bucket")?, row.try_get::<i64, _>("n")?);
        }
        Ok(buckets)
    }
}

fn empty_hours() -> Vec<HourlyActivity> {
    (0..24)
        .map(|hour| HourlyActivity {
            hour,
            games: 0,
            logins: 0,
        })
        .collect()
}

fn parse_hour(bucket: &str) -> AppResult<usize> {
    bucket
        .parse::<usize>()
        .ok()
        .filter(|h| *h < 24)
        .ok_or_else(|| AppError::Internal(format!("Invalid hour bucket {:?}", bucket)))
}
