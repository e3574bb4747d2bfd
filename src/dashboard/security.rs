/// Security posture and health roll-up for the admin dashboard
use super::SystemHealth;
use crate::{
    api::health::{determine_overall_status, ComponentHealth},
    config::ServerConfig,
    db::DatabaseBackend,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Failed logins per day above which the dashboard raises an issue
pub const FAILED_LOGIN_ALERT_THRESHOLD: i64 = 20;

/// Minimum session secret length considered secure
pub const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Clone, Serialize)]
pub struct SecurityMetrics {
    pub logins_24h: i64,
    pub logins_7d: i64,
    pub failed_logins_24h: i64,
    pub secret_key_secure: bool,
    pub https_enforced: bool,
    pub password_hashing: &'static str,
    pub parameterized_queries: bool,
    pub output_escaping: bool,
    pub rate_limiting: bool,
}

impl SecurityMetrics {
    pub fn from_config(
        config: &ServerConfig,
        logins_24h: i64,
        logins_7d: i64,
        failed_logins_24h: i64,
    ) -> Self {
        Self {
            logins_24h,
            logins_7d,
            failed_logins_24h,
            secret_key_secure: config
                .authentication
                .session_secret
                .as_ref()
                .is_some_and(|s| s.len() >= MIN_SECRET_LEN),
            https_enforced: config.authentication.cookie_secure,
            password_hashing: "argon2id",
            parameterized_queries: true,
            output_escaping: true,
            rate_limiting: config.rate_limit.enabled,
        }
    }

    /// Weighted checklist, 100 points total
    pub fn score(&self) -> SecurityScore {
        let checks: [(bool, u32, &str); 6] = [
            (
                self.secret_key_secure,
                30,
                "Session secret is not configured or too short",
            ),
            (self.https_enforced, 20, "Cookies are not restricted to HTTPS"),
            (self.rate_limiting, 15, "Login rate limiting is disabled"),
            (
                self.failed_logins_24h < FAILED_LOGIN_ALERT_THRESHOLD,
                15,
                "Elevated failed login attempts in the last 24 hours",
            ),
            (self.parameterized_queries, 10, "Queries are not parameterized"),
            (self.output_escaping, 10, "HTML output is not escaped"),
        ];

        let max_score: u32 = checks.iter().map(|(_, weight, _)| weight).sum();
        let score: u32 = checks
            .iter()
            .filter(|(passed, _, _)| *passed)
            .map(|(_, weight, _)| weight)
            .sum();
        let issues = checks
            .iter()
            .filter(|(passed, _, _)| !passed)
            .map(|(_, _, issue)| issue.to_string())
            .collect();

        let percentage = f64::from(score) / f64::from(max_score) * 100.0;

        SecurityScore {
            score,
            max_score,
            percentage,
            grade: grade_for(percentage),
            issues,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SecurityScore {
    pub score: u32,
    pub max_score: u32,
    pub percentage: f64,
    pub grade: char,
    pub issues: Vec<String>,
}

/// Letter grade: A >= 90, B >= 80, C >= 70, D >= 60, otherwise F
pub fn grade_for(percentage: f64) -> char {
    match percentage {
        p if p >= 90.0 => 'A',
        p if p >= 80.0 => 'B',
        p if p >= 70.0 => 'C',
        p if p >= 60.0 => 'D',
        _ => 'F',
    }
}

/// Deployment facts shown next to the health checks
#[derive(Debug, Clone, Serialize)]
pub struct InfrastructureHealth {
    pub database_status: &'static str,
    pub database_type: &'static str,
    pub environment: String,
    pub is_production: bool,
    pub version: String,
}

impl InfrastructureHealth {
    pub fn new(config: &ServerConfig, backend: DatabaseBackend, health: &SystemHealth) -> Self {
        Self {
            database_status: health.database_status.as_str(),
            database_type: backend.as_str(),
            environment: config.service.environment.clone(),
            is_production: config.is_production(),
            version: config.service.version.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CriticalIssue {
    /// "critical", "high" or "medium"
    pub severity: &'static str,
    pub title: String,
    pub description: String,
    pub fix: String,
    /// Rough effort to fix
    pub time: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionItem {
    pub severity: &'static str,
    pub title: String,
    pub fix: String,
    pub completed: bool,
}

/// Problems that need an operator, most severe first
pub fn critical_issues(security: &SecurityMetrics, health: &SystemHealth) -> Vec<CriticalIssue> {
    let mut issues = Vec::new();

    if !health.is_connected() {
        issues.push(CriticalIssue {
            severity: "critical",
            title: "Database Unreachable".to_string(),
            description: "Dashboard queries are failing; metrics are not being reported."
                .to_string(),
            fix: "Check DATABASE_URL and that the database server is running".to_string(),
            time: "15 minutes",
        });
    }

    if !security.secret_key_secure {
        issues.push(CriticalIssue {
            severity: "critical",
            title: "Insecure Session Secret".to_string(),
            description: format!(
                "Session cookies are encrypted with a key that is missing or shorter than {} characters; sessions do not survive restarts.",
                MIN_SECRET_LEN
            ),
            fix: "Set BLACKJACK_SESSION_SECRET to a random value of at least 32 characters"
                .to_string(),
            time: "5 minutes",
        });
    }

    if !security.https_enforced {
        issues.push(CriticalIssue {
            severity: "high",
            title: "HTTPS Not Enforced".to_string(),
            description: "Session cookies may be sent over plain HTTP.".to_string(),
            fix: "Serve behind TLS and set BLACKJACK_COOKIE_SECURE=true".to_string(),
            time: "30 minutes",
        });
    }

    if !security.rate_limiting {
        issues.push(CriticalIssue {
            severity: "high",
            title: "Login Rate Limiting Disabled".to_string(),
            description: "Password guessing against the login form is not throttled.".to_string(),
            fix: "Set BLACKJACK_RATE_LIMITS_ENABLED=true".to_string(),
            time: "5 minutes",
        });
    }

    if security.failed_logins_24h >= FAILED_LOGIN_ALERT_THRESHOLD {
        issues.push(CriticalIssue {
            severity: "medium",
            title: "Elevated Failed Logins".to_string(),
            description: format!(
                "{} failed login attempts in the last 24 hours.",
                security.failed_logins_24h
            ),
            fix: "Review the action log for login_failed entries and lower BLACKJACK_LOGIN_ATTEMPTS_PER_MINUTE"
                .to_string(),
            time: "20 minutes",
        });
    }

    issues
}

/// One open to-do per issue
pub fn action_items(issues: &[CriticalIssue]) -> Vec<ActionItem> {
    issues
        .iter()
        .map(|issue| ActionItem {
            severity: issue.severity,
            title: issue.title.clone(),
            fix: issue.fix.clone(),
            completed: false,
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthSummary {
    /// "healthy", "degraded" or "unhealthy"
    pub overall_status: String,
    pub overall_message: String,
    /// 0-100; healthy components count fully, degraded ones half
    pub health_score: u32,
    pub components: Vec<ComponentHealth>,
    pub last_check: DateTime<Utc>,
}

/// Roll the database, session key and security checks into one status
pub fn health_summary(
    health: &SystemHealth,
    security: &SecurityMetrics,
    score: &SecurityScore,
    now: DateTime<Utc>,
) -> HealthSummary {
    let components = vec![
        component(
            "database",
            if health.is_connected() { "healthy" } else { "unhealthy" },
            health.error.clone(),
            serde_json::json!({ "records": health.total_records.total() }),
        ),
        component(
            "session_key",
            if security.secret_key_secure { "healthy" } else { "degraded" },
            None,
            serde_json::json!({ "secure": security.secret_key_secure }),
        ),
        component(
            "security",
            if score.percentage >= 80.0 { "healthy" } else { "degraded" },
            None,
            serde_json::json!({ "grade": score.grade.to_string(), "score": score.score }),
        ),
    ];

    let overall_status = determine_overall_status(&components);
    let overall_message = match overall_status.as_str() {
        "healthy" => "All systems operational",
        "degraded" => "Some components need attention",
        _ => "Critical components are failing",
    }
    .to_string();

    let points: u32 = components
        .iter()
        .map(|c| match c.status.as_str() {
            "healthy" => 2,
            "degraded" => 1,
            _ => 0,
        })
        .sum();
    let health_score = points * 100 / (components.len() as u32 * 2);

    HealthSummary {
        overall_status,
        overall_message,
        health_score,
        components,
        last_check: now,
    }
}

fn component(
    name: &str,
    status: &str,
    error: Option<String>,
    details: serde_json::Value,
) -> ComponentHealth {
    ComponentHealth {
        name: name.to_string(),
        status: status.to_string(),
        response_time_ms: None,
        error,
        details: Some(details),
    }
}
