//! End-to-end tests of the web flow: accounts, the table and access control
mod common;

use axum::http::StatusCode;
use common::TestApp;

async fn actions_of(app: &TestApp, user_id: i64) -> Vec<String> {
    app.ctx
        .action_log
        .recent_for_user(user_id, 100)
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.action)
        .collect()
}

#[tokio::test]
async fn test_protected_pages_redirect_to_login() {
    let mut app = TestApp::new().await;

    for path in ["/", "/dashboard", "/hit", "/stand", "/new", "/admin/dashboard"] {
        let response = app.get(path).await;
        assert_eq!(response.status, StatusCode::FOUND, "{}", path);
        assert_eq!(response.location.as_deref(), Some("/login"), "{}", path);
    }

    // Non-following clients still see where they landed
    let response = app.get("/").await;
    assert!(response.status.as_u16() < 500);
    assert!(response.body.contains("Blackjack"));
}

#[tokio::test]
async fn test_login_page_renders() {
    let mut app = TestApp::new().await;
    let response = app.get("/login").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Blackjack"));
    assert!(response.body.contains(r#"action="/login""#));
}

#[tokio::test]
async fn test_register_login_and_play() {
    let mut app = TestApp::new().await;

    let response = app.register("alice").await;
    assert_eq!(response.location.as_deref(), Some("/login"));
    let response = app.get("/login").await;
    assert!(response.body.contains("Account created! Please log in."));

    let response = app.login("alice").await;
    assert_eq!(response.status, StatusCode::FOUND);
    assert_eq!(response.location.as_deref(), Some("/"));

    let response = app.get("/").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Blackjack Table"));
    assert!(response.body.contains("Dealer's Hand"));
    assert!(response.body.contains("Your Hand"));
    assert!(response.body.contains("Logged in successfully."));
    assert!(response.body.contains("Hit or stand?"));

    // Signed-in users skip the login form
    let response = app.get("/login").await;
    assert_eq!(response.location.as_deref(), Some("/"));
}

#[tokio::test]
async fn test_bad_password_rerenders_form() {
    let mut app = TestApp::new().await;
    let user_id = app.sign_up("bob").await;
    app.clear_cookies();

    let response = app
        .post("/login", &[("username", "bob"), ("password", "wrong-password")])
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Invalid username or password."));

    let response = app
        .post("/login", &[("username", "nobody"), ("password", "whatever")])
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Invalid username or password."));

    let actions = actions_of(&app, user_id).await;
    assert!(actions.contains(&"login_failed".to_string()));

    // Still signed out
    let response = app.get("/").await;
    assert_eq!(response.location.as_deref(), Some("/login"));
}

#[tokio::test]
async fn test_duplicate_and_invalid_registration() {
    let mut app = TestApp::new().await;
    app.register("carol").await;

    let response = app.register("carol").await;
    assert_eq!(response.location.as_deref(), Some("/register"));
    let response = app.get("/register").await;
    assert!(response.body.contains("Username already exists"));

    let response = app
        .post("/register", &[("username", "x"), ("password", "pw")])
        .await;
    assert_eq!(response.location.as_deref(), Some("/register"));
    assert_eq!(app.ctx.account_manager.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_stand_records_exactly_one_hand() {
    let mut app = TestApp::new().await;
    let user_id = app.sign_up("dave").await;

    app.get("/").await;
    let response = app.post("/stand", &[]).await;
    assert_eq!(response.location.as_deref(), Some("/"));

    let stats = app.ctx.hand_history.user_statistics(user_id).await.unwrap();
    assert_eq!(stats.total_games, 1);
    assert_eq!(stats.wins + stats.losses + stats.pushes, 1);

    let response = app.get("/").await;
    assert!(!response.body.contains("Hit or stand?"));

    // Acting on a finished hand changes nothing
    app.post("/stand", &[]).await;
    app.post("/hit", &[]).await;
    let response = app.get("/").await;
    assert!(response.body.contains("This hand is over"));
    let stats = app.ctx.hand_history.user_statistics(user_id).await.unwrap();
    assert_eq!(stats.total_games, 1);

    let recent = app.ctx.hand_history.recent_games(user_id, 10).await.unwrap();
    assert_eq!(recent[0].bet_amount, app.ctx.config.table.default_bet);
    assert_eq!(recent[0].hand_number, 1);
}

#[tokio::test]
async fn test_hit_until_settled_then_new_game() {
    let mut app = TestApp::new().await;
    let user_id = app.sign_up("erin").await;
    app.get("/").await;

    // Twelve hits always bust a single-deck hand
    for _ in 0..12 {
        app.post("/hit", &[]).await;
    }
    let stats = app.ctx.hand_history.user_statistics(user_id).await.unwrap();
    assert_eq!(stats.total_games, 1);
    assert_eq!(stats.losses, 1);

    let response = app.post("/new", &[("bet", "25")]).await;
    assert_eq!(response.location.as_deref(), Some("/"));
    let response = app.get("/").await;
    assert!(response.body.contains("Hit or stand?"));
    assert!(response.body.contains("Hand #2"));

    app.post("/stand", &[]).await;
    let recent = app.ctx.hand_history.recent_games(user_id, 10).await.unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].bet_amount, 25);
    assert_eq!(recent[0].game_id, recent[1].game_id);

    let actions = actions_of(&app, user_id).await;
    assert!(actions.iter().filter(|a| *a == "hit").count() >= 12);
    assert!(actions.contains(&"new_game".to_string()));
    assert!(actions.contains(&"stand".to_string()));
}

#[tokio::test]
async fn test_bet_is_clamped_to_table_limit() {
    let mut app = TestApp::new().await;
    let user_id = app.sign_up("frank").await;

    app.get("/new?bet=999999").await;
    app.post("/stand", &[]).await;

    let recent = app.ctx.hand_history.recent_games(user_id, 1).await.unwrap();
    assert_eq!(recent[0].bet_amount, app.ctx.config.table.max_bet);
}

#[tokio::test]
async fn test_logout_ends_session() {
    let mut app = TestApp::new().await;
    let user_id = app.sign_up("grace").await;

    let response = app.get("/logout").await;
    assert_eq!(response.location.as_deref(), Some("/login"));
    let response = app.get("/login").await;
    assert!(response.body.contains("You have been logged out."));

    let response = app.get("/").await;
    assert_eq!(response.location.as_deref(), Some("/login"));
    assert!(actions_of(&app, user_id)
        .await
        .contains(&"logout".to_string()));
}

#[tokio::test]
async fn test_admin_pages_require_admin() {
    let mut app = TestApp::with_config(|config| {
        config.authentication.bootstrap_admin_password = Some(common::PASSWORD.to_string());
    })
    .await;
    app.sign_up("heidi").await;

    let response = app.get("/admin/dashboard").await;
    assert_eq!(response.status, StatusCode::FOUND);
    assert_eq!(response.location.as_deref(), Some("/"));
    let response = app.get("/api/admin/metrics").await;
    assert_eq!(response.location.as_deref(), Some("/"));

    app.get("/logout").await;
    let response = app.login("admin").await;
    assert_eq!(response.location.as_deref(), Some("/"));

    let response = app.get("/admin/dashboard").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Operations Dashboard"));
    assert!(response.body.contains("Total Users"));
    assert!(response.body.contains("Insecure Session Secret"));

    let response = app.get("/api/admin/metrics").await;
    assert_eq!(response.status, StatusCode::OK);
    let report: serde_json::Value = serde_json::from_str(&response.body).unwrap();
    assert_eq!(report["snapshot"]["overview"]["total_users"], 2);
    assert_eq!(report["security_score"]["max_score"], 100);
}

#[tokio::test]
async fn test_builtin_admin_cannot_be_registered() {
    let mut app = TestApp::new().await;

    for name in ["admin", "Admin"] {
        let response = app.register(name).await;
        assert_eq!(response.location.as_deref(), Some("/register"));
        let response = app.get("/register").await;
        assert!(response.body.contains("Username is reserved"));
    }
    assert_eq!(app.ctx.account_manager.count().await.unwrap(), 0);

    let response = app.login("admin").await;
    assert_eq!(response.status, StatusCode::OK);
    let response = app.get("/api/admin/metrics").await;
    assert_eq!(response.location.as_deref(), Some("/login"));
}

#[tokio::test]
async fn test_replayed_table_cookie_settles_hand_once() {
    let mut app = TestApp::new().await;
    let user_id = app.sign_up("judy").await;

    app.get("/").await;
    let dealt = app.save_cookies();

    app.post("/stand", &[]).await;
    app.restore_cookies(&dealt);
    app.post("/stand", &[]).await;
    app.restore_cookies(&dealt);
    for _ in 0..12 {
        app.post("/hit", &[]).await;
    }

    let recent = app.ctx.hand_history.recent_games(user_id, 10).await.unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].hand_number, 1);

    let response = app.get("/").await;
    assert!(response.body.contains("This hand is over"));
}

#[tokio::test]
async fn test_session_of_deleted_user_is_cleared() {
    let mut app = TestApp::new().await;
    let user_id = app.sign_up("kate").await;
    assert!(app.has_cookie("bj_session"));

    for table in ["action_log", "hand_history", "users"] {
        let column = if table == "users" { "id" } else { "user_id" };
        sqlx::query(&format!("DELETE FROM {} WHERE {} = $1", table, column))
            .bind(user_id)
            .execute(&app.ctx.db)
            .await
            .unwrap();
    }

    let response = app.get("/dashboard").await;
    assert_eq!(response.status, StatusCode::FOUND);
    assert_eq!(response.location.as_deref(), Some("/login"));
    assert!(!app.has_cookie("bj_session"));
}

#[tokio::test]
async fn test_health_metrics_and_not_found() {
    let mut app = TestApp::new().await;

    let response = app.get("/health").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("ok"));

    let response = app.get("/health/ready").await;
    assert_eq!(response.status, StatusCode::OK);

    // No session secret configured: degraded, but still serving
    let response = app.get("/health/detailed").await;
    assert_eq!(response.status, StatusCode::OK);
    let health: serde_json::Value = serde_json::from_str(&response.body).unwrap();
    assert_eq!(health["status"], "degraded");

    let response = app.get("/metrics").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("http_requests_total"));

    let response = app.get("/no-such-page").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_login_rate_limited() {
    let mut app = TestApp::with_config(|config| {
        config.rate_limit.enabled = true;
        config.rate_limit.login_attempts_per_minute = 2;
    })
    .await;

    for _ in 0..2 {
        let response = app
            .post("/login", &[("username", "ivan"), ("password", "nope-nope")])
            .await;
        assert_eq!(response.status, StatusCode::OK);
    }

    let response = app
        .post("/login", &[("username", "ivan"), ("password", "nope-nope")])
        .await;
    assert_eq!(response.status, StatusCode::TOO_MANY_REQUESTS);
}
