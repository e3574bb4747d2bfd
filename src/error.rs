/// Unified error types for the Blackjack table
use crate::{api::redirect_to, game::GameError, session, views};
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

/// Main error type for the service
#[derive(Error, Debug)]
pub enum AppError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration errors
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Authentication errors (no session, bad credentials)
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Authorization errors (signed in, but not allowed)
    #[error("Not authorized: {0}")]
    Authorization(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Conflict errors (e.g., duplicate username)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Rate limiting errors
    #[error("Rate limit exceeded")]
    RateLimitExceeded { retry_after: std::time::Duration },

    /// Blackjack rule violations
    #[error("Game error: {0}")]
    Game(#[from] GameError),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let fields = errors
            .field_errors()
            .keys()
            .map(|field| field.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        AppError::Validation(format!("Invalid {}", fields))
    }
}

/// Convert AppError to an HTTP response
///
/// Authentication failures send the browser back to the login page and drop the
/// session cookie; authorization failures send it back to the table. Everything
/// else renders an HTML error page.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Authentication(reason) => {
                tracing::debug!(reason = %reason, "redirecting unauthenticated request");
                let mut response = redirect_to("/login");
                if let Ok(value) = HeaderValue::from_str(&session::removal_cookie().to_string()) {
                    response.headers_mut().append(header::SET_COOKIE, value);
                }
                return response;
            }
            AppError::Authorization(reason) => {
                tracing::warn!(reason = %reason, "denied access to restricted page");
                return redirect_to("/");
            }
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::Conflict(_) => (StatusCode::CONFLICT, self.to_string()),
            AppError::Game(_) => (StatusCode::CONFLICT, self.to_string()),
            AppError::RateLimitExceeded { retry_after } => {
                let body = views::error_page(
                    StatusCode::TOO_MANY_REQUESTS,
                    "Too many attempts. Please wait a moment and try again.",
                );
                return (
                    StatusCode::TOO_MANY_REQUESTS,
                    [(header::RETRY_AFTER, retry_after.as_secs().max(1).to_string())],
                    Html(body),
                )
                    .into_response();
            }
            AppError::Database(_)
            | AppError::Migration(_)
            | AppError::Internal(_)
            | AppError::Io(_) => {
                tracing::error!(error = %self, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(), // Don't leak details
                )
            }
        };

        (status, Html(views::error_page(status, &message))).into_response()
    }
}

/// Result type alias for service operations
pub type AppResult<T> = Result<T, AppError>;
