/// Database layer for the Blackjack table
///
/// Manages the connection pool and migrations, and provides the typed records
/// stored in the `users`, `hand_history` and `action_log` tables. The same
/// runtime queries run against SQLite and PostgreSQL through sqlx's `Any` driver.

pub mod models;

use crate::error::{AppError, AppResult};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use sqlx::{any::AnyPoolOptions, AnyPool};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Storage format for every timestamp column (UTC)
///
/// Sorts lexicographically in time order; characters 1-10 are the day and
/// 12-13 the hour, which the dashboard groups on.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Supported database backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseBackend {
    Sqlite,
    Postgres,
}

impl DatabaseBackend {
    /// Detect the backend from a connection URL
    pub fn from_url(url: &str) -> AppResult<Self> {
        if url.starts_with("sqlite:") {
            Ok(DatabaseBackend::Sqlite)
        } else if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Ok(DatabaseBackend::Postgres)
        } else {
            Err(AppError::Validation(format!(
                "Unsupported database URL scheme: {}",
                url.split(':').next().unwrap_or_default()
            )))
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseBackend::Sqlite => "sqlite",
            DatabaseBackend::Postgres => "postgres",
        }
    }
}

/// Database connection options
#[derive(Debug, Clone)]
pub struct DatabaseOptions {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            max_connections: 5,
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

/// Create a connection pool for the given URL
pub async fn create_pool(url: &str, options: DatabaseOptions) -> AppResult<(AnyPool, DatabaseBackend)> {
    let backend = DatabaseBackend::from_url(url)?;
    sqlx::any::install_default_drivers();

    // Ensure the parent directory of a file-backed SQLite database exists
    if backend == DatabaseBackend::Sqlite {
        if let Some(parent) = sqlite_file_path(url).as_deref().and_then(Path::parent) {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
    }

    let pool = AnyPoolOptions::new()
        .max_connections(options.max_connections)
        .acquire_timeout(options.acquire_timeout)
        .connect(url)
        .await?;

    info!(backend = backend.as_str(), "database pool ready");

    Ok((pool, backend))
}

/// Run migrations for a database
/// Migrations are embedded at compile time, one directory per backend
pub async fn run_migrations(pool: &AnyPool, backend: DatabaseBackend) -> AppResult<()> {
    match backend {
        DatabaseBackend::Sqlite => sqlx::migrate!("./migrations/sqlite").run(pool).await?,
        DatabaseBackend::Postgres => sqlx::migrate!("./migrations/postgres").run(pool).await?,
    }

    Ok(())
}

/// Test database connection
pub async fn test_connection(pool: &AnyPool) -> AppResult<()> {
    sqlx::query("SELECT 1").execute(pool).await?;

    Ok(())
}

/// Format a timestamp for storage
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a stored timestamp
pub fn parse_timestamp(raw: &str) -> AppResult<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(|e| AppError::Internal(format!("Invalid stored timestamp {:?}: {}", raw, e)))
}

/// File path of a SQLite URL, or None for in-memory databases
fn sqlite_file_path(url: &str) -> Option<std::path::PathBuf> {
    let rest = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or_default();
    if path.is_empty() || path == ":memory:" {
        return None;
    }
    Some(std::path::PathBuf::from(path))
}
