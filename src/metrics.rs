/// Metrics and telemetry for the Blackjack table
///
/// Provides Prometheus-compatible metrics for monitoring:
/// - HTTP request counts and latencies
/// - Hands settled by result
/// - Action log entries by type
/// - Account creations and login attempts

use lazy_static::lazy_static;
use prometheus::{
    register_gauge, register_histogram_vec, register_int_counter, register_int_counter_vec,
    register_int_gauge, Encoder, Gauge, HistogramVec, IntCounter, IntCounterVec, IntGauge,
    TextEncoder,
};

lazy_static! {
    // ========== HTTP Metrics ==========

    /// Total HTTP requests by method, path, and status
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    /// HTTP request duration in seconds
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request latencies in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    /// Active HTTP requests
    pub static ref HTTP_REQUESTS_ACTIVE: IntGauge = register_int_gauge!(
        "http_requests_active",
        "Number of HTTP requests currently being processed"
    )
    .unwrap();

    // ========== Game Metrics ==========

    /// Hands settled by result
    pub static ref HANDS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "blackjack_hands_total",
        "Total number of hands settled",
        &["result"]
    )
    .unwrap();

    /// Action log entries by action
    pub static ref ACTIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "blackjack_actions_total",
        "Total number of logged user actions",
        &["action"]
    )
    .unwrap();

    // ========== Account Metrics ==========

    /// Account creations
    pub static ref ACCOUNT_CREATIONS_TOTAL: IntCounter = register_int_counter!(
        "account_creations_total",
        "Total number of accounts created"
    )
    .unwrap();

    /// Login attempts by outcome
    pub static ref LOGIN_ATTEMPTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "login_attempts_total",
        "Total number of login attempts",
        &["outcome"]
    )
    .unwrap();

    /// Dashboard renders that fell back to the degraded view
    pub static ref DASHBOARD_DEGRADED_TOTAL: IntCounter = register_int_counter!(
        "dashboard_degraded_total",
        "Dashboard renders served without database metrics"
    )
    .unwrap();

    // ========== System Metrics ==========

    /// Application uptime in seconds
    pub static ref UPTIME_SECONDS: Gauge = register_gauge!(
        "uptime_seconds",
        "Application uptime in seconds"
    )
    .unwrap();
}

/// Render metrics in Prometheus text format
pub fn render_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "failed to encode metrics");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration);
}

/// Record a settled hand
pub fn record_hand(result: &str) {
    HANDS_TOTAL.with_label_values(&[result]).inc();
}

/// Record an action log entry
pub fn record_action(action: &str) {
    ACTIONS_TOTAL.with_label_values(&[action]).inc();
}

/// Record an account creation
pub fn record_account_creation() {
    ACCOUNT_CREATIONS_TOTAL.inc();
}

/// Record a login attempt ("success", "bad_password", "unknown_user", "rate_limited")
pub fn record_login_attempt(outcome: &str) {
    LOGIN_ATTEMPTS_TOTAL.with_label_values(&[outcome]).inc();
}

/// Record a dashboard served in degraded mode
pub fn record_dashboard_degraded() {
    DASHBOARD_DEGRADED_TOTAL.inc();
}

/// Update uptime
pub fn update_uptime(seconds: f64) {
    UPTIME_SECONDS.set(seconds);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_includes_recorded_series() {
        record_http_request("GET", "/", 200, 0.004);
        record_hand("win");
        record_action("login");
        record_login_attempt("success");

        let text = render_metrics();
        assert!(text.contains("http_requests_total"));
        assert!(text.contains("blackjack_hands_total"));
        assert!(text.contains("blackjack_actions_total"));
        assert!(text.contains("login_attempts_total"));
    }

    #[test]
    fn test_uptime_gauge() {
        update_uptime(42.0);
        assert_eq!(UPTIME_SECONDS.get(), 42.0);
    }
}
