/// Account manager implementation using runtime queries
use super::{hash_password, verify_password, Credentials};
use crate::{
    activity::ActionLogManager,
    config::BUILTIN_ADMIN,
    db::{format_timestamp, models::{ActionKind, User}},
    error::{AppError, AppResult},
    metrics,
};
use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::{AnyPool, Row};
use tracing::{info, warn};
use validator::Validate;

const INVALID_CREDENTIALS: &str = "Invalid username or password";

/// Account manager service
#[derive(Clone)]
pub struct AccountManager {
    db: AnyPool,
    actions: ActionLogManager,
}

impl AccountManager {
    /// Create a new account manager
    pub fn new(db: AnyPool, actions: ActionLogManager) -> Self {
        Self { db, actions }
    }

    /// Register a new player
    pub async fn register(&self, credentials: &Credentials) -> AppResult<User> {
        self.register_at(credentials, Utc::now()).await
    }

    /// Register a new player with an explicit creation time
    pub async fn register_at(&self, credentials: &Credentials, at: DateTime<Utc>) -> AppResult<User> {
        let credentials = credentials.trimmed();
        credentials.validate()?;

        // Only the bootstrap password can create the built-in administrator
        if credentials.username.eq_ignore_ascii_case(BUILTIN_ADMIN) {
            warn!(username = %credentials.username, "refused to register reserved username");
            return Err(AppError::Conflict("Username is reserved".to_string()));
        }

        if self.find_by_username(&credentials.username).await?.is_some() {
            return Err(AppError::Conflict("Username already exists".to_string()));
        }

        let password_hash = hash_password(&credentials.password)?;
        let user = self.insert_user(&credentials.username, &password_hash, at).await?;

        self.actions
            .log_at(user.id, ActionKind::Register, None, at)
            .await?;
        metrics::record_account_creation();
        info!(user_id = user.id, username = %user.username, "account registered");

        Ok(user)
    }

    /// Insert a user row with an already hashed password
    pub async fn insert_user(
        &self,
        username: &str,
        password_hash: &str,
        at: DateTime<Utc>,
    ) -> AppResult<User> {
        let row = sqlx::query(
            r#"
            INSERT INTO users (username, password_hash, created_at)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .bind(format_timestamp(at))
        .fetch_one(&self.db)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict("Username already exists".to_string())
            }
            other => AppError::Database(other),
        })?;

        Ok(User {
            id: row.try_get("id")?,
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at: at,
        })
    }

    /// Check a username / password pair and log the attempt
    pub async fn authenticate(&self, credentials: &Credentials) -> AppResult<User> {
        let credentials = credentials.trimmed();

        let user = match self.find_by_username(&credentials.username).await? {
            Some(user) => user,
            None => {
                metrics::record_login_attempt("unknown_user");
                return Err(AppError::Authentication(INVALID_CREDENTIALS.to_string()));
            }
        };

        if !verify_password(&credentials.password, &user.password_hash)? {
            metrics::record_login_attempt("bad_password");
            warn!(user_id = user.id, "login failed: bad password");
            self.actions
                .log(
                    user.id,
                    ActionKind::LoginFailed,
                    Some(json!({ "reason": "bad_password" })),
                )
                .await?;
            return Err(AppError::Authentication(INVALID_CREDENTIALS.to_string()));
        }

        self.actions.log(user.id, ActionKind::Login, None).await?;
        metrics::record_login_attempt("success");
        info!(user_id = user.id, username = %user.username, "user logged in");

        Ok(user)
    }

    /// Look up a user by id
    pub async fn find_by_id(&self, id: i64) -> AppResult<Option<User>> {
        let row = sqlx::query(
            "SELECT id, username, password_hash, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        row.as_ref().map(User::from_row).transpose()
    }

    /// Look up a user by username
    pub async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let row = sqlx::query(
            "SELECT id, username, password_hash, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await?;

        row.as_ref().map(User::from_row).transpose()
    }

    /// Total registered users
    pub async fn count(&self) -> AppResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM users")
            .fetch_one(&self.db)
            .await?;

        Ok(row.try_get("n")?)
    }

    /// Create the built-in `admin` account if it does not exist yet
    pub async fn ensure_admin(&self, password: &str) -> AppResult<bool> {
        if self.find_by_username(BUILTIN_ADMIN).await?.is_some() {
            return Ok(false);
        }

        let password_hash = hash_password(password)?;
        let user = self.insert_user(BUILTIN_ADMIN, &password_hash, Utc::now()).await?;
        self.actions
            .log(user.id, ActionKind::Register, Some(json!({ "bootstrap": true })))
            .await?;
        metrics::record_account_creation();
        info!(user_id = user.id, "bootstrap admin account created");

        Ok(true)
    }
}
