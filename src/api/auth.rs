/// Login, registration and logout
use super::redirect_to;
use crate::{
    account::Credentials,
    context::AppContext,
    db::models::ActionKind,
    error::{AppError, AppResult},
    session::{self, SessionData},
    views,
};
use axum::{
    extract::State,
    response::{Html, IntoResponse, Response},
    routing::get,
    Form, Router,
};
use axum_extra::extract::cookie::PrivateCookieJar;
use chrono::Utc;
use tracing::{info, warn};

const LOGIN_FAILED: &str = "Invalid username or password.";

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/login", get(login_form).post(login))
        .route("/register", get(register_form).post(register))
        .route("/logout", get(logout).post(logout))
}

async fn login_form(jar: PrivateCookieJar) -> Response {
    if session::read_session(&jar).is_some() {
        return redirect_to("/");
    }
    let (jar, flash) = session::take_flash(jar);
    (jar, Html(views::login_page(flash.as_deref(), None, ""))).into_response()
}

async fn login(
    State(ctx): State<AppContext>,
    jar: PrivateCookieJar,
    Form(credentials): Form<Credentials>,
) -> AppResult<Response> {
    let credentials = credentials.trimmed();
    ctx.rate_limiter.check_login(&credentials.username)?;

    let user = match ctx.account_manager.authenticate(&credentials).await {
        Ok(user) => user,
        Err(AppError::Authentication(_)) => {
            // Re-render the form rather than redirecting, so the error is visible
            return Ok(Html(views::login_page(
                None,
                Some(LOGIN_FAILED),
                &credentials.username,
            ))
            .into_response());
        }
        Err(e) => return Err(e),
    };

    let secure = ctx.config.authentication.cookie_secure;
    let jar = session::start_session(jar, &SessionData::new(&user, Utc::now()), secure);
    let jar = session::set_flash(jar, "Logged in successfully.", secure);

    Ok((jar, redirect_to("/")).into_response())
}

async fn register_form(jar: PrivateCookieJar) -> Response {
    if session::read_session(&jar).is_some() {
        return redirect_to("/");
    }
    let (jar, flash) = session::take_flash(jar);
    (jar, Html(views::register_page(flash.as_deref()))).into_response()
}

async fn register(
    State(ctx): State<AppContext>,
    jar: PrivateCookieJar,
    Form(credentials): Form<Credentials>,
) -> AppResult<Response> {
    let credentials = credentials.trimmed();
    ctx.rate_limiter.check_register(&credentials.username)?;
    let secure = ctx.config.authentication.cookie_secure;

    match ctx.account_manager.register(&credentials).await {
        Ok(user) => {
            info!(user_id = user.id, "registration complete");
            let jar = session::set_flash(jar, "Account created! Please log in.", secure);
            Ok((jar, redirect_to("/login")).into_response())
        }
        Err(AppError::Conflict(message)) => {
            let jar = session::set_flash(jar, &message, secure);
            Ok((jar, redirect_to("/register")).into_response())
        }
        Err(AppError::Validation(_)) => {
            let jar = session::set_flash(
                jar,
                "Usernames need 3-32 letters, digits, '_', '-' or '.', and passwords at least 6 characters.",
                secure,
            );
            Ok((jar, redirect_to("/register")).into_response())
        }
        Err(e) => Err(e),
    }
}

async fn logout(State(ctx): State<AppContext>, jar: PrivateCookieJar) -> Response {
    if let Some(session) = session::read_session(&jar) {
        let details = serde_json::json!({
            "session_seconds": session.elapsed_seconds(Utc::now()),
        });
        // Signing out must work even while the database is down
        if let Err(e) = ctx
            .action_log
            .log(session.user_id, ActionKind::Logout, Some(details))
            .await
        {
            warn!(user_id = session.user_id, error = %e, "failed to log logout");
        }
        info!(user_id = session.user_id, "user logged out");
    }

    let jar = session::end_session(jar);
    let jar = session::set_flash(
        jar,
        "You have been logged out.",
        ctx.config.authentication.cookie_secure,
    );
    (jar, redirect_to("/login")).into_response()
}
