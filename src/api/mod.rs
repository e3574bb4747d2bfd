/// HTTP routes and handlers
pub mod auth;
pub mod dashboard;
pub mod game;
pub mod health;
pub mod middleware;

use crate::{context::AppContext, metrics, views};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};

/// Build all routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(game::routes())
        .merge(auth::routes())
        .merge(dashboard::routes())
        .merge(health::routes())
        .route("/metrics", get(prometheus_metrics))
}

/// `302 Found` to `location`
///
/// Form posts follow the post/redirect/get pattern, so a refresh never repeats
/// a hit or stand.
pub fn redirect_to(location: &str) -> Response {
    (
        StatusCode::FOUND,
        [(header::LOCATION, location.to_string())],
        Html(views::redirect_page(location)),
    )
        .into_response()
}

/// Prometheus scrape endpoint
async fn prometheus_metrics(State(ctx): State<AppContext>) -> impl IntoResponse {
    metrics::update_uptime(ctx.started_at.elapsed().as_secs_f64());
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::render_metrics(),
    )
}
