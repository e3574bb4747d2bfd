/// Rate limiting for login and registration attempts
use crate::{
    config::RateLimitConfig,
    error::{AppError, AppResult},
    metrics,
};
use governor::{
    clock::DefaultClock,
    state::keyed::DefaultKeyedStateStore,
    Quota, RateLimiter as GovernorLimiter,
};
use std::{num::NonZeroU32, sync::Arc, time::Duration};

type KeyedLimiter = GovernorLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Usernames never exceed this, so longer submissions share one key
const MAX_KEY_CHARS: usize = 32;

/// Past this many tracked usernames, idle entries are evicted
const MAX_TRACKED_KEYS: usize = 10_000;

/// Rate limiter manager
///
/// Attempts are keyed by the submitted username, so one noisy client cannot lock
/// everybody else out of the login form.
#[derive(Clone)]
pub struct RateLimiter {
    enabled: bool,
    max_tracked_keys: usize,
    login: Arc<KeyedLimiter>,
    register: Arc<KeyedLimiter>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        let per_minute = NonZeroU32::new(config.login_attempts_per_minute)
            .unwrap_or(NonZeroU32::MIN.saturating_add(9));
        Self::with_quota(config.enabled, Quota::per_minute(per_minute), MAX_TRACKED_KEYS)
    }

    fn with_quota(enabled: bool, quota: Quota, max_tracked_keys: usize) -> Self {
        Self {
            enabled,
            max_tracked_keys,
            login: Arc::new(GovernorLimiter::keyed(quota)),
            register: Arc::new(GovernorLimiter::keyed(quota)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Usernames currently tracked by the login and registration quotas
    pub fn tracked_keys(&self) -> usize {
        self.login.len() + self.register.len()
    }

    /// Check the login quota for a username
    pub fn check_login(&self, username: &str) -> AppResult<()> {
        self.check(&self.login, username).map_err(|e| {
            metrics::record_login_attempt("rate_limited");
            e
        })
    }

    /// Check the registration quota for a username
    pub fn check_register(&self, username: &str) -> AppResult<()> {
        self.check(&self.register, username)
    }

    fn check(&self, limiter: &KeyedLimiter, username: &str) -> AppResult<()> {
        if !self.enabled {
            return Ok(());
        }

        if limiter.len() >= self.max_tracked_keys {
            limiter.retain_recent();
            limiter.shrink_to_fit();
            tracing::debug!(remaining = limiter.len(), "evicted idle rate limit entries");
        }

        let key: String = username
            .trim()
            .chars()
            .take(MAX_KEY_CHARS)
            .collect::<String>()
            .to_lowercase();
        match limiter.check_key(&key) {
            Ok(_) => Ok(()),
            Err(_) => {
                tracing::warn!(username = %key, "rate limit exceeded");
                Err(AppError::RateLimitExceeded {
                    retry_after: Duration::from_secs(60),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(per_minute: u32, enabled: bool) -> RateLimiter {
        RateLimiter::new(&RateLimitConfig {
            enabled,
            login_attempts_per_minute: per_minute,
        })
    }

    #[test]
    fn test_burst_limit() {
        let limiter = limiter(3, true);

        for _ in 0..3 {
            assert!(limiter.check_login("alice").is_ok());
        }

        // Should hit rate limit after burst
        assert!(limiter.check_login("alice").is_err());
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = limiter(1, true);
        assert!(limiter.check_login("alice").is_ok());
        assert!(limiter.check_login("Alice ").is_err());
        assert!(limiter.check_login("bob").is_ok());
        assert!(limiter.check_register("alice").is_ok());
    }

    #[test]
    fn test_idle_entries_are_evicted_past_the_cap() {
        let limiter =
            RateLimiter::with_quota(true, Quota::with_period(Duration::from_millis(1)).unwrap(), 8);

        for i in 0..8 {
            assert!(limiter.check_login(&format!("user{}", i)).is_ok());
        }
        assert_eq!(limiter.tracked_keys(), 8);

        std::thread::sleep(Duration::from_millis(20));
        assert!(limiter.check_login("latecomer").is_ok());
        assert_eq!(limiter.tracked_keys(), 1);
    }

    #[test]
    fn test_long_usernames_share_a_key() {
        let limiter = limiter(1, true);
        let long = "x".repeat(500);
        assert!(limiter.check_login(&long).is_ok());
        assert!(limiter.check_login(&format!("{}y", long)).is_err());
        assert_eq!(limiter.tracked_keys(), 1);
    }

    #[test]
    fn test_disabled_limiter_allows_everything() {
        let limiter = limiter(1, false);
        for _ in 0..10 {
            assert!(limiter.check_login("alice").is_ok());
        }
    }
}
