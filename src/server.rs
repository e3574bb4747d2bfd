/// HTTP server setup and routing
use crate::{
    api::{self, middleware::track_http_metrics},
    context::AppContext,
    error::{AppError, AppResult},
    views,
};
use axum::{http::StatusCode, middleware, response::Html, Router};
use tower_http::{compression::CompressionLayer, trace::TraceLayer};
use tracing::info;

/// Build the main application router
/// Returns Router<()> because state is already provided
pub fn build_router(ctx: AppContext) -> Router {
    Router::new()
        .merge(api::routes())
        // Only matched routes, so metrics are labelled by route template
        .route_layer(middleware::from_fn(track_http_metrics))
        .fallback(not_found)
        .with_state(ctx)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
}

/// 404 handler
async fn not_found() -> (StatusCode, Html<String>) {
    (
        StatusCode::NOT_FOUND,
        Html(views::error_page(
            StatusCode::NOT_FOUND,
            "There is no table here.",
        )),
    )
}

/// Start the HTTP server and run until Ctrl-C
pub async fn serve(ctx: AppContext) -> AppResult<()> {
    let addr = format!("{}:{}", ctx.config.service.hostname, ctx.config.service.port);

    info!("Blackjack table listening on http://{}", addr);
    info!("   Environment: {}", ctx.config.service.environment);
    info!("   Database: {}", ctx.backend.as_str());

    let app = build_router(ctx);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to bind to {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::Internal(format!("Server error: {}", e)))?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
