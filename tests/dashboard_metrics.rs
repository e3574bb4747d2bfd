//! Dashboard aggregation against a real database with backdated rows
mod common;

use axum::http::StatusCode;
use blackjack_table::{
    account::Credentials,
    db::models::{ActionKind, HandResult, NewHand},
    AppContext,
};
use chrono::{DateTime, Duration, Utc};
use common::TestApp;

async fn user_at(ctx: &AppContext, username: &str, at: DateTime<Utc>) -> i64 {
    let credentials = Credentials {
        username: username.to_string(),
        password: common::PASSWORD.to_string(),
    };
    ctx.account_manager
        .register_at(&credentials, at)
        .await
        .unwrap()
        .id
}

async fn hand_at(ctx: &AppContext, user_id: i64, result: HandResult, at: DateTime<Utc>) {
    let hand = NewHand {
        user_id,
        game_id: uuid::Uuid::new_v4().to_string(),
        hand_number: 1,
        result,
        bet_amount: 10,
        winnings: result.winnings(10),
        player_hand: "KS,9H".to_string(),
        dealer_hand: "TC,8D".to_string(),
    };
    ctx.hand_history.record_hand_at(&hand, at).await.unwrap();
}

async fn action_at(ctx: &AppContext, user_id: i64, action: ActionKind, at: DateTime<Utc>) {
    ctx.action_log.log_at(user_id, action, None, at).await.unwrap();
}

#[tokio::test]
async fn test_new_user_windows_are_nested() {
    let app = TestApp::new().await;
    let ctx = &app.ctx;
    let now = Utc::now();

    user_at(ctx, "today", now).await;
    user_at(ctx, "three_days", now - Duration::days(3)).await;
    user_at(ctx, "ten_days", now - Duration::days(10)).await;
    user_at(ctx, "forty_days", now - Duration::days(40)).await;

    let overview = ctx.dashboard.system_overview(now).await.unwrap();
    assert_eq!(overview.total_users, 4);
    assert_eq!(overview.new_users_today, 1);
    assert_eq!(overview.new_users_7d, 2);
    assert_eq!(overview.new_users_30d, 3);
    assert!(overview.new_users_today <= overview.new_users_7d);
    assert!(overview.new_users_7d <= overview.new_users_30d);
    assert!(overview.new_users_30d <= overview.total_users);
}

#[tokio::test]
async fn test_hourly_activity_sums_to_weekly_totals() {
    let app = TestApp::new().await;
    let ctx = &app.ctx;
    let now = Utc::now();
    let alice = user_at(ctx, "alice", now - Duration::days(20)).await;
    let bob = user_at(ctx, "bob", now - Duration::days(20)).await;

    for offset in [
        Duration::zero(),
        Duration::hours(2),
        Duration::hours(30),
        Duration::days(6),
        Duration::days(8),
        Duration::days(29),
    ] {
        hand_at(ctx, alice, HandResult::Win, now - offset).await;
        action_at(ctx, bob, ActionKind::Login, now - offset).await;
    }
    hand_at(ctx, bob, HandResult::Loss, now - Duration::minutes(5)).await;

    let overview = ctx.dashboard.system_overview(now).await.unwrap();
    assert_eq!(overview.games_7d, 5);
    assert_eq!(overview.logins_7d, 4);

    let hours = ctx.dashboard.hourly_activity(7, now).await.unwrap();
    assert_eq!(hours.len(), 24);
    assert_eq!(hours.iter().map(|h| h.games).sum::<i64>(), overview.games_7d);
    assert_eq!(hours.iter().map(|h| h.logins).sum::<i64>(), overview.logins_7d);

    let days = ctx.dashboard.daily_activity(30, now).await.unwrap();
    assert_eq!(days.len(), 31);
    assert_eq!(days.last().unwrap().date, now.date_naive());
    assert_eq!(days.iter().map(|d| d.games).sum::<i64>(), overview.games_30d);
    assert_eq!(overview.games_30d, 7);
}

#[tokio::test]
async fn test_action_distribution_matches_row_count() {
    let app = TestApp::new().await;
    let ctx = &app.ctx;
    let now = Utc::now();
    let user = user_at(ctx, "carol", now - Duration::days(3)).await;

    action_at(ctx, user, ActionKind::Login, now - Duration::hours(1)).await;
    action_at(ctx, user, ActionKind::Hit, now - Duration::minutes(30)).await;
    action_at(ctx, user, ActionKind::Hit, now - Duration::minutes(29)).await;
    action_at(ctx, user, ActionKind::Stand, now - Duration::minutes(28)).await;
    action_at(ctx, user, ActionKind::Logout, now - Duration::days(2)).await;

    let since = now - Duration::hours(24);
    let distribution = ctx.dashboard.action_distribution(Some(since)).await.unwrap();
    let total: i64 = distribution.values().sum();
    assert_eq!(total, ctx.dashboard.action_count(Some(since)).await.unwrap());
    assert_eq!(total, 4);
    assert_eq!(distribution.get("hit"), Some(&2));
    assert_eq!(distribution.get("logout"), None);

    // Unbounded: includes the registration entry
    let distribution = ctx.dashboard.action_distribution(None).await.unwrap();
    assert_eq!(
        distribution.values().sum::<i64>(),
        ctx.dashboard.action_count(None).await.unwrap()
    );
    assert_eq!(distribution.get("register"), Some(&1));

    assert_eq!(
        ctx.action_log.count_since(ActionKind::Hit, since).await.unwrap(),
        2
    );
}

#[tokio::test]
async fn test_active_users_and_leaderboard() {
    let app = TestApp::new().await;
    let ctx = &app.ctx;
    let now = Utc::now();
    let dana = user_at(ctx, "dana", now - Duration::days(9)).await;
    let eve = user_at(ctx, "eve", now - Duration::days(9)).await;
    let finn = user_at(ctx, "finn", now - Duration::days(9)).await;

    action_at(ctx, dana, ActionKind::Login, now - Duration::minutes(10)).await;
    action_at(ctx, dana, ActionKind::Login, now - Duration::minutes(5)).await;
    action_at(ctx, eve, ActionKind::Login, now - Duration::days(3)).await;
    action_at(ctx, finn, ActionKind::Hit, now).await;

    let overview = ctx.dashboard.system_overview(now).await.unwrap();
    assert_eq!(overview.active_users_24h, 1);
    assert_eq!(overview.active_users_7d, 2);

    hand_at(ctx, eve, HandResult::Win, now).await;
    hand_at(ctx, eve, HandResult::Loss, now).await;
    hand_at(ctx, dana, HandResult::Win, now).await;
    hand_at(ctx, finn, HandResult::Push, now).await;
    hand_at(ctx, finn, HandResult::Push, now).await;

    let top = ctx.dashboard.most_active_users(10).await.unwrap();
    let names: Vec<_> = top.iter().map(|u| u.username.as_str()).collect();
    assert_eq!(names, vec!["eve", "finn", "dana"]);
    assert_eq!(top[0].wins, 1);
    assert_eq!(top[0].win_rate, 50.0);
    assert_eq!(top[2].win_rate, 100.0);

    assert_eq!(ctx.dashboard.most_active_users(1).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_snapshot_health_degrades_when_database_is_gone() {
    let app = TestApp::new().await;
    let ctx = &app.ctx;
    let now = Utc::now();
    user_at(ctx, "gina", now).await;

    let snapshot = ctx.dashboard.snapshot(now).await;
    assert!(!snapshot.is_degraded());
    assert_eq!(snapshot.system_health.total_records.users, 1);

    ctx.db.close().await;

    let snapshot = ctx.dashboard.snapshot(now).await;
    assert!(snapshot.is_degraded());
    assert_eq!(snapshot.system_health.database_status.as_str(), "disconnected");
    assert!(snapshot.system_health.error.is_some());

    let report = ctx.dashboard.admin_report(now).await;
    assert_eq!(report.health_summary.overall_status, "unhealthy");
    assert!(report
        .critical_issues
        .iter()
        .any(|issue| issue.title == "Database Unreachable"));
}

#[tokio::test]
async fn test_dashboard_page_after_a_win_and_login() {
    let mut app = TestApp::new().await;
    let user_id = app.sign_up("hank").await;
    let now = Utc::now();

    hand_at(&app.ctx, user_id, HandResult::Win, now).await;
    action_at(&app.ctx, user_id, ActionKind::Login, now).await;

    let response = app.get("/dashboard").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Total Users"));
    assert!(response.body.contains("Games Today"));
    assert!(response.body.contains("System Health"));
    assert!(response.body.contains("Recent Games"));

    let overview = app.ctx.dashboard.system_overview(now).await.unwrap();
    assert_eq!(overview.games_today, 1);
    assert!(overview.logins_today >= 2);
}
