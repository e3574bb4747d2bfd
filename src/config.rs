/// Configuration management for the Blackjack table
use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::env;

/// Default SQLite database, created on first start
pub const DEFAULT_DATABASE_URL: &str = "sqlite://./data/blackjack.db?mode=rwc";

/// Username that is always treated as an administrator
pub const BUILTIN_ADMIN: &str = "admin";

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub authentication: AuthConfig,
    pub table: TableConfig,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    /// "development" or "production"
    pub environment: String,
    pub version: String,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// `sqlite://...` or `postgres://...`
    pub database_url: String,
    pub max_connections: u32,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Key material for the private session cookies
    #[serde(skip_serializing)]
    pub session_secret: Option<String>,
    /// Usernames allowed to open the admin dashboard
    pub admin_users: Vec<String>,
    /// Password for the built-in `admin` account, created on startup when set
    #[serde(skip_serializing)]
    pub bootstrap_admin_password: Option<String>,
    /// Mark cookies `Secure` (HTTPS only)
    pub cookie_secure: bool,
}

/// Table stakes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableConfig {
    pub default_bet: i64,
    pub max_bet: i64,
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    /// Login and registration attempts allowed per username per minute
    pub login_attempts_per_minute: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    /// "pretty" or "json"
    pub format: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                hostname: "127.0.0.1".to_string(),
                port: 5000,
                environment: "development".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            storage: StorageConfig {
                database_url: DEFAULT_DATABASE_URL.to_string(),
                max_connections: 5,
            },
            authentication: AuthConfig {
                session_secret: None,
                admin_users: vec![BUILTIN_ADMIN.to_string()],
                bootstrap_admin_password: None,
                cookie_secure: false,
            },
            table: TableConfig {
                default_bet: 10,
                max_bet: 500,
            },
            rate_limit: RateLimitConfig {
                enabled: true,
                login_attempts_per_minute: 10,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> AppResult<Self> {
        dotenv::dotenv().ok();

        let defaults = Self::default();

        let hostname = env::var("BLACKJACK_HOST").unwrap_or(defaults.service.hostname);
        let port = env::var("BLACKJACK_PORT")
            .unwrap_or_else(|_| "5000".to_string())
            .parse()
            .map_err(|_| AppError::Validation("Invalid port number".to_string()))?;
        let environment = env::var("BLACKJACK_ENV").unwrap_or(defaults.service.environment);

        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());
        let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "5".to_string())
            .parse()
            .unwrap_or(5);

        let session_secret = env::var("BLACKJACK_SESSION_SECRET")
            .ok()
            .filter(|s| !s.is_empty());
        let admin_users = parse_admin_users(
            &env::var("BLACKJACK_ADMIN_USERS").unwrap_or_else(|_| String::new()),
        );
        let bootstrap_admin_password = env::var("BLACKJACK_ADMIN_PASSWORD")
            .ok()
            .filter(|s| !s.is_empty());
        let cookie_secure = env::var("BLACKJACK_COOKIE_SECURE")
            .unwrap_or_else(|_| "false".to_string())
            .parse()
            .unwrap_or(false);

        let default_bet = env::var("BLACKJACK_DEFAULT_BET")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .map_err(|_| AppError::Validation("Invalid default bet".to_string()))?;
        let max_bet = env::var("BLACKJACK_MAX_BET")
            .unwrap_or_else(|_| "500".to_string())
            .parse()
            .map_err(|_| AppError::Validation("Invalid max bet".to_string()))?;

        let rate_limit_enabled = env::var("BLACKJACK_RATE_LIMITS_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .unwrap_or(true);
        let login_attempts_per_minute = env::var("BLACKJACK_LOGIN_ATTEMPTS_PER_MINUTE")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let log_format = env::var("BLACKJACK_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                environment,
                version: defaults.service.version,
            },
            storage: StorageConfig {
                database_url,
                max_connections,
            },
            authentication: AuthConfig {
                session_secret,
                admin_users,
                bootstrap_admin_password,
                cookie_secure,
            },
            table: TableConfig {
                default_bet,
                max_bet,
            },
            rate_limit: RateLimitConfig {
                enabled: rate_limit_enabled,
                login_attempts_per_minute,
            },
            logging: LoggingConfig {
                level: log_level,
                format: log_format,
            },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> AppResult<()> {
        if self.service.hostname.is_empty() {
            return Err(AppError::Validation("Hostname cannot be empty".to_string()));
        }

        if self.service.port == 0 {
            return Err(AppError::Validation("Port cannot be zero".to_string()));
        }

        if self.storage.database_url.is_empty() {
            return Err(AppError::Validation("Database URL cannot be empty".to_string()));
        }

        if self.table.default_bet <= 0 || self.table.max_bet < self.table.default_bet {
            return Err(AppError::Validation(
                "Bets must be positive and the default bet cannot exceed the max bet".to_string(),
            ));
        }

        match &self.authentication.session_secret {
            Some(secret) if secret.len() < 32 => {
                return Err(AppError::Validation(
                    "Session secret must be at least 32 characters".to_string(),
                ));
            }
            None if self.is_production() => {
                return Err(AppError::Validation(
                    "BLACKJACK_SESSION_SECRET is required in production".to_string(),
                ));
            }
            _ => {}
        }

        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.service.environment.eq_ignore_ascii_case("production")
    }

    /// Whether a username may open the admin dashboard
    pub fn is_admin(&self, username: &str) -> bool {
        username == BUILTIN_ADMIN || self.authentication.admin_users.iter().any(|u| u == username)
    }
}

/// Parse a comma-separated list of admin usernames; `admin` is always included
fn parse_admin_users(raw: &str) -> Vec<String> {
    let mut users = vec![BUILTIN_ADMIN.to_string()];
    for name in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !users.iter().any(|u| u == name) {
            users.push(name.to_string());
        }
    }
    users
}
