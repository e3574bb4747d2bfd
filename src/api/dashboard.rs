/// Player and operator dashboards
use crate::{
    auth::{AdminUser, SessionUser},
    context::AppContext,
    dashboard::AdminReport,
    error::AppResult,
    session,
    views::{self, Nav, PlayerDashboardPage},
};
use axum::{
    extract::State,
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use axum_extra::extract::cookie::PrivateCookieJar;
use chrono::Utc;
use tracing::warn;

/// Days on the player's games-per-day table
const PLAYER_HISTORY_DAYS: i64 = 7;
/// Rows in the player's recent games and recent activity tables
const PLAYER_RECENT_LIMIT: i64 = 10;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/dashboard", get(player_dashboard))
        .route("/admin/dashboard", get(admin_dashboard))
        .route("/api/admin/metrics", get(admin_metrics))
}

/// Fall back to an empty value so one failing query cannot take the page down
fn or_empty<T: Default>(result: AppResult<T>, what: &str) -> T {
    result.unwrap_or_else(|e| {
        warn!(error = %e, "{} unavailable", what);
        T::default()
    })
}

async fn player_dashboard(
    State(ctx): State<AppContext>,
    user: SessionUser,
    jar: PrivateCookieJar,
) -> Response {
    let now = Utc::now();
    let user_id = user.user.id;
    let (jar, flash) = session::take_flash(jar);

    let stats = or_empty(ctx.hand_history.user_statistics(user_id).await, "player statistics");
    let recent_games = or_empty(
        ctx.hand_history.recent_games(user_id, PLAYER_RECENT_LIMIT).await,
        "recent games",
    );
    let history = or_empty(
        ctx.hand_history
            .user_game_history(user_id, PLAYER_HISTORY_DAYS, now)
            .await,
        "game history",
    );
    let recent_actions = or_empty(
        ctx.action_log.recent_for_user(user_id, PLAYER_RECENT_LIMIT).await,
        "recent actions",
    );
    let snapshot = ctx.dashboard.snapshot(now).await;

    let html = views::player_dashboard(&PlayerDashboardPage {
        nav: Nav {
            username: Some(&user.user.username),
            is_admin: user.is_admin,
        },
        flash: flash.as_deref(),
        stats: &stats,
        recent_games: &recent_games,
        history: &history,
        recent_actions: &recent_actions,
        snapshot: &snapshot,
    });

    (jar, Html(html)).into_response()
}

async fn admin_dashboard(State(ctx): State<AppContext>, AdminUser(admin): AdminUser) -> Html<String> {
    let report = ctx.dashboard.admin_report(Utc::now()).await;
    Html(views::admin_dashboard(
        &report,
        Nav {
            username: Some(&admin.user.username),
            is_admin: true,
        },
    ))
}

/// The admin report as JSON, for scripts and uptime checks
async fn admin_metrics(State(ctx): State<AppContext>, _admin: AdminUser) -> Json<AdminReport> {
    Json(ctx.dashboard.admin_report(Utc::now()).await)
}
