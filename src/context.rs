/// Application context and dependency injection
use crate::{
    account::AccountManager,
    activity::{ActionLogManager, HandHistoryManager},
    config::ServerConfig,
    dashboard::DashboardManager,
    db::{self, DatabaseBackend, DatabaseOptions},
    error::AppResult,
    rate_limit::RateLimiter,
};
use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use sha2::{Digest, Sha512};
use sqlx::AnyPool;
use std::{sync::Arc, time::Instant};
use tracing::{info, warn};

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: AnyPool,
    pub backend: DatabaseBackend,
    pub account_manager: Arc<AccountManager>,
    pub hand_history: Arc<HandHistoryManager>,
    pub action_log: Arc<ActionLogManager>,
    pub dashboard: Arc<DashboardManager>,
    pub rate_limiter: Arc<RateLimiter>,
    /// Encrypts the session, table and flash cookies
    pub cookie_key: Key,
    pub started_at: Instant,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> AppResult<Self> {
        // Validate configuration
        config.validate()?;

        let (db, backend) = db::create_pool(
            &config.storage.database_url,
            DatabaseOptions {
                max_connections: config.storage.max_connections,
                ..DatabaseOptions::default()
            },
        )
        .await?;

        // Run migrations
        db::run_migrations(&db, backend).await?;

        // Test connection
        db::test_connection(&db).await?;

        let config = Arc::new(config);

        let action_log = ActionLogManager::new(db.clone());
        let hand_history = HandHistoryManager::new(db.clone());
        let account_manager = AccountManager::new(db.clone(), action_log.clone());
        let dashboard = DashboardManager::new(db.clone(), backend, Arc::clone(&config));
        let rate_limiter = RateLimiter::new(&config.rate_limit);

        if let Some(password) = &config.authentication.bootstrap_admin_password {
            account_manager.ensure_admin(password).await?;
        }

        let cookie_key = derive_cookie_key(config.authentication.session_secret.as_deref());

        info!(
            backend = backend.as_str(),
            environment = %config.service.environment,
            "application context ready"
        );

        Ok(Self {
            config,
            db,
            backend,
            account_manager: Arc::new(account_manager),
            hand_history: Arc::new(hand_history),
            action_log: Arc::new(action_log),
            dashboard: Arc::new(dashboard),
            rate_limiter: Arc::new(rate_limiter),
            cookie_key,
            started_at: Instant::now(),
        })
    }

    /// Whether a username may open the admin dashboard
    pub fn is_admin(&self, username: &str) -> bool {
        self.config.is_admin(username)
    }
}

impl FromRef<AppContext> for Key {
    fn from_ref(ctx: &AppContext) -> Self {
        ctx.cookie_key.clone()
    }
}

/// Stretch the configured secret to a 64-byte cookie key, or generate a random one
fn derive_cookie_key(secret: Option<&str>) -> Key {
    match secret {
        Some(secret) => Key::from(Sha512::digest(secret.as_bytes()).as_slice()),
        None => {
            warn!("BLACKJACK_SESSION_SECRET not set; sessions will not survive a restart");
            Key::generate()
        }
    }
}
