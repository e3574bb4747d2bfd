/// Health check endpoints for liveness and readiness probes
///
/// Supports two types of probes:
/// - Liveness: Is the process alive? (restart if not)
/// - Readiness: Can the table serve players? (remove from load balancer if not)
///
/// `/health/detailed` additionally reports per-component status for monitoring.

use crate::{context::AppContext, error::AppResult, metrics, rate_limit::RateLimiter};
use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Health status response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Overall status: "healthy", "degraded", or "unhealthy"
    pub status: String,

    /// Application version
    pub version: String,

    /// Uptime in seconds
    pub uptime_seconds: f64,

    /// Individual component checks
    pub checks: Vec<ComponentHealth>,

    /// Optional message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Health status of individual component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    /// Component name
    pub name: String,

    /// Status: "healthy", "degraded", or "unhealthy"
    pub status: String,

    /// Response time in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u64>,

    /// Optional error message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Build health check routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/health", get(health_basic))
        .route("/health/live", get(liveness_probe))
        .route("/health/ready", get(readiness_probe))
        .route("/health/detailed", get(health_detailed))
}

/// Basic health check
pub async fn health_basic() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Liveness probe
///
/// If we can respond, we're alive.
pub async fn liveness_probe() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "alive",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Readiness probe
///
/// Returns 503 while the database is unreachable.
pub async fn readiness_probe(
    State(ctx): State<AppContext>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    if let Err(e) = check_database(&ctx).await {
        tracing::warn!(error = %e, "readiness_probe_failed: database check failed");
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    Ok(Json(serde_json::json!({
        "status": "ready",
        "version": env!("CARGO_PKG_VERSION")
    })))
}

/// Detailed health check with all component statuses
pub async fn health_detailed(State(ctx): State<AppContext>) -> (StatusCode, Json<HealthStatus>) {
    let start = Instant::now();

    let checks = vec![
        check_database_detailed(&ctx).await,
        check_session_key(&ctx),
        check_rate_limiter(&ctx),
    ];

    let overall_status = determine_overall_status(&checks);

    let uptime = ctx.started_at.elapsed().as_secs_f64();
    metrics::update_uptime(uptime);

    let health = HealthStatus {
        status: overall_status.clone(),
        version: ctx.config.service.version.clone(),
        uptime_seconds: uptime,
        checks,
        message: if overall_status == "healthy" {
            None
        } else {
            Some("One or more components are unhealthy".to_string())
        },
    };

    let status_code = match overall_status.as_str() {
        "healthy" => StatusCode::OK,
        "degraded" => StatusCode::OK, // Still serving players
        _ => StatusCode::SERVICE_UNAVAILABLE,
    };

    tracing::info!(
        status = %overall_status,
        duration_ms = start.elapsed().as_millis(),
        "health_check_completed"
    );

    (status_code, Json(health))
}

/// Check database connectivity
async fn check_database(ctx: &AppContext) -> AppResult<()> {
    sqlx::query("SELECT 1").fetch_one(&ctx.db).await?;
    Ok(())
}

/// Check database with detailed metrics
async fn check_database_detailed(ctx: &AppContext) -> ComponentHealth {
    let start = Instant::now();

    match check_database(ctx).await {
        Ok(_) => ComponentHealth {
            name: "database".to_string(),
            status: "healthy".to_string(),
            response_time_ms: Some(start.elapsed().as_millis() as u64),
            error: None,
            details: Some(serde_json::json!({
                "type": ctx.backend.as_str(),
                "pool_size": ctx.db.size(),
            })),
        },
        Err(e) => ComponentHealth {
            name: "database".to_string(),
            status: "unhealthy".to_string(),
            response_time_ms: Some(start.elapsed().as_millis() as u64),
            error: Some(e.to_string()),
            details: None,
        },
    }
}

/// A generated cookie key works, but sessions end on every restart
fn check_session_key(ctx: &AppContext) -> ComponentHealth {
    let configured = ctx.config.authentication.session_secret.is_some();
    ComponentHealth {
        name: "session_key".to_string(),
        status: if configured { "healthy" } else { "degraded" }.to_string(),
        response_time_ms: None,
        error: None,
        details: Some(serde_json::json!({ "configured": configured })),
    }
}

fn check_rate_limiter(ctx: &AppContext) -> ComponentHealth {
    rate_limiter_health(&ctx.rate_limiter, ctx.config.rate_limit.login_attempts_per_minute)
}

/// Login throttling switched off leaves the login form open to brute force
fn rate_limiter_health(limiter: &RateLimiter, per_minute: u32) -> ComponentHealth {
    let enabled = limiter.is_enabled();
    ComponentHealth {
        name: "rate_limiter".to_string(),
        status: if enabled { "healthy" } else { "degraded" }.to_string(),
        response_time_ms: None,
        error: (!enabled).then(|| "login rate limiting is disabled".to_string()),
        details: Some(serde_json::json!({
            "enabled": enabled,
            "login_attempts_per_minute": per_minute,
            "tracked_usernames": limiter.tracked_keys(),
        })),
    }
}

/// Determine overall health status from individual checks
pub fn determine_overall_status(checks: &[ComponentHealth]) -> String {
    let unhealthy_count = checks.iter().filter(|c| c.status == "unhealthy").count();
    let degraded_count = checks.iter().filter(|c| c.status == "degraded").count();

    if unhealthy_count > 0 {
        "unhealthy".to_string()
    } else if degraded_count > 0 {
        "degraded".to_string()
    } else {
        "healthy".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RateLimitConfig;

    fn check(name: &str, status: &str) -> ComponentHealth {
        ComponentHealth {
            name: name.to_string(),
            status: status.to_string(),
            response_time_ms: Some(5),
            error: None,
            details: None,
        }
    }

    #[test]
    fn test_determine_overall_status_healthy() {
        let checks = vec![check("database", "healthy"), check("session_key", "healthy")];
        assert_eq!(determine_overall_status(&checks), "healthy");
    }

    #[test]
    fn test_determine_overall_status_degraded() {
        let checks = vec![check("database", "healthy"), check("session_key", "degraded")];
        assert_eq!(determine_overall_status(&checks), "degraded");
    }

    #[test]
    fn test_determine_overall_status_unhealthy() {
        let checks = vec![check("database", "unhealthy"), check("session_key", "degraded")];
        assert_eq!(determine_overall_status(&checks), "unhealthy");
    }

    #[test]
    fn test_disabled_rate_limiter_is_degraded() {
        let config = |enabled| RateLimitConfig {
            enabled,
            login_attempts_per_minute: 5,
        };

        let on = rate_limiter_health(&RateLimiter::new(&config(true)), 5);
        assert_eq!(on.status, "healthy");
        assert!(on.error.is_none());

        let off = rate_limiter_health(&RateLimiter::new(&config(false)), 5);
        assert_eq!(off.status, "degraded");
        assert_eq!(off.details.unwrap()["enabled"], false);
    }

    #[test]
    fn test_health_status_serialization() {
        let health = HealthStatus {
            status: "healthy".to_string(),
            version: "0.1.0".to_string(),
            uptime_seconds: 3600.5,
            checks: vec![ComponentHealth {
                details: Some(serde_json::json!({"type": "sqlite"})),
                ..check("database", "healthy")
            }],
            message: None,
        };

        let json = serde_json::to_string(&health).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("database"));
        assert!(json.contains("0.1.0"));
        assert!(!json.contains("message"));
    }
}
