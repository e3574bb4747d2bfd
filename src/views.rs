/// Server-rendered HTML pages
///
/// Pages are assembled with `format!`; every value that originates from a user
/// or the database goes through [`escape`] first.
use crate::{
    activity::{DailyGames, UserStatistics},
    dashboard::{AdminReport, DashboardSnapshot},
    db::models::{ActionRecord, HandRecord},
    game::{Card, Table},
};
use axum::http::StatusCode;
use std::fmt::Write;

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; margin: 0; background: #0b3d2e; color: #f4f1e8; }
header { display: flex; justify-content: space-between; align-items: center; padding: 0.75rem 1.5rem; background: #072a20; }
header a { color: #f4d35e; margin-left: 1rem; text-decoration: none; }
main { max-width: 1100px; margin: 1.5rem auto; padding: 0 1rem; }
h1, h2, h3 { color: #f4d35e; }
.flash { background: #f4d35e; color: #072a20; padding: 0.6rem 1rem; border-radius: 6px; margin-bottom: 1rem; }
.error { background: #b23a48; color: #fff; padding: 0.6rem 1rem; border-radius: 6px; margin-bottom: 1rem; }
.panel { background: #10503c; border-radius: 10px; padding: 1rem 1.25rem; margin-bottom: 1.25rem; }
.cards { display: flex; gap: 0.5rem; margin: 0.5rem 0; }
.card { background: #fff; color: #111; border-radius: 6px; width: 3.2rem; height: 4.4rem; display: flex; align-items: center; justify-content: center; font-size: 1.3rem; font-weight: bold; }
.card.red { color: #c0392b; }
.card.hidden { background: repeating-linear-gradient(45deg, #7a1f2b, #7a1f2b 6px, #94303d 6px, #94303d 12px); }
.actions form { display: inline; }
button { background: #f4d35e; color: #072a20; border: 0; border-radius: 6px; padding: 0.5rem 1.1rem; font-weight: bold; cursor: pointer; }
button:disabled { opacity: 0.4; cursor: default; }
input { padding: 0.45rem; border-radius: 4px; border: 1px solid #ccc; }
.grid { display: grid; grid-template-columns: repeat(auto-fit, minmax(180px, 1fr)); gap: 1rem; }
.metric { background: #10503c; border-radius: 10px; padding: 0.9rem; }
.metric .value { font-size: 1.8rem; font-weight: bold; }
.metric .label { font-size: 0.85rem; opacity: 0.8; }
table.data { width: 100%; border-collapse: collapse; }
table.data th, table.data td { text-align: left; padding: 0.35rem 0.5rem; border-bottom: 1px solid #1d6b52; }
.bar { background: #f4d35e; height: 0.8rem; border-radius: 3px; }
.status-healthy, .status-connected { color: #7bd389; }
.status-degraded { color: #f4d35e; }
.status-unhealthy, .status-disconnected { color: #ff7a7a; }
"#;

/// Escape text for HTML element and attribute content
pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Who the navigation bar is rendered for
#[derive(Debug, Clone, Copy, Default)]
pub struct Nav<'a> {
    pub username: Option<&'a str>,
    pub is_admin: bool,
}

fn layout(title: &str, nav: Nav<'_>, flash: Option<&str>, body: &str) -> String {
    let links = match nav.username {
        Some(username) => {
            let admin = if nav.is_admin {
                r#"<a href="/admin/dashboard">Admin</a>"#
            } else {
                ""
            };
            format!(
                r#"<span>Signed in as <strong>{}</strong></span><nav><a href="/">Table</a><a href="/dashboard">Dashboard</a>{}<a href="/logout">Log out</a></nav>"#,
                escape(username),
                admin
            )
        }
        None => r#"<nav><a href="/login">Log in</a><a href="/register">Register</a></nav>"#
            .to_string(),
    };
    let flash = flash
        .map(|m| format!(r#"<div class="flash">{}</div>"#, escape(m)))
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title} | Blackjack</title>
<style>{style}</style>
</head>
<body>
<header><strong>&#9824; Blackjack</strong>{links}</header>
<main>
{flash}
{body}
</main>
</body>
</html>"#,
        title = escape(title),
        style = STYLE,
        links = links,
        flash = flash,
        body = body,
    )
}

fn credentials_form(action: &str, submit: &str, username: &str) -> String {
    format!(
        r#"<form method="post" action="{action}" class="panel">
<p><label>Username<br><input name="username" value="{username}" required autocomplete="username"></label></p>
<p><label>Password<br><input name="password" type="password" required></label></p>
<p><button type="submit">{submit}</button></p>
</form>"#,
        action = action,
        username = escape(username),
        submit = submit,
    )
}

pub fn login_page(flash: Option<&str>, error: Option<&str>, username: &str) -> String {
    let error = error
        .map(|e| format!(r#"<div class="error">{}</div>"#, escape(e)))
        .unwrap_or_default();
    let body = format!(
        r#"<h1>Welcome to the Blackjack table</h1>
<p>Log in to take a seat and play against the dealer.</p>
{error}
{form}
<p>New here? <a href="/register">Create an account</a>.</p>"#,
        error = error,
        form = credentials_form("/login", "Log in", username),
    );
    layout("Log in", Nav::default(), flash, &body)
}

pub fn register_page(flash: Option<&str>) -> String {
    let body = format!(
        r#"<h1>Create a Blackjack account</h1>
<p>Usernames are 3-32 letters, digits, <code>_</code>, <code>-</code> or <code>.</code>; passwords at least 6 characters.</p>
{form}
<p>Already registered? <a href="/login">Log in</a>.</p>"#,
        form = credentials_form("/register", "Register", ""),
    );
    layout("Register", Nav::default(), flash, &body)
}

fn render_cards(cards: &[Card], hidden: usize) -> String {
    let mut out = String::from(r#"<div class="cards">"#);
    for card in cards {
        let class = if card.suit().is_red() { "card red" } else { "card" };
        let _ = write!(out, r#"<div class="{}" title="{}">{}</div>"#, class, card.code(), card);
    }
    for _ in 0..hidden {
        out.push_str(r#"<div class="card hidden" title="hidden"></div>"#);
    }
    out.push_str("</div>");
    out
}

/// Data for the table page
pub struct TablePage<'a> {
    pub nav: Nav<'a>,
    pub flash: Option<&'a str>,
    pub table: &'a Table,
    pub stats: &'a UserStatistics,
    pub session_time: String,
    pub max_bet: i64,
}

pub fn table_page(page: &TablePage<'_>) -> String {
    let game = &page.table.game;
    let finished = game.is_finished();
    let hidden = game.dealer_cards().len() - game.visible_dealer_cards().len();
    let dealer_total = if finished {
        game.dealer_total().to_string()
    } else {
        format!("{} + ?", game.visible_dealer_total())
    };
    let disabled = if finished { " disabled" } else { "" };

    let body = format!(
        r#"<h1>Blackjack Table</h1>
<div class="panel">
<p><strong>{message}</strong></p>
<h3>Dealer's Hand ({dealer_total})</h3>
{dealer_cards}
<h3>Your Hand ({player_total})</h3>
{player_cards}
<div class="actions">
<form method="post" action="/hit"><button type="submit"{disabled}>Hit</button></form>
<form method="post" action="/stand"><button type="submit"{disabled}>Stand</button></form>
<form method="post" action="/new">
<input type="number" name="bet" min="1" max="{max_bet}" value="{bet}" aria-label="Bet">
<button type="submit">New Game</button>
</form>
</div>
<p>Hand #{hand_number} &middot; Bet {bet} chips</p>
</div>
<div class="grid">
<div class="metric"><div class="value">{wins}</div><div class="label">Wins</div></div>
<div class="metric"><div class="value">{losses}</div><div class="label">Losses</div></div>
<div class="metric"><div class="value">{pushes}</div><div class="label">Pushes</div></div>
<div class="metric"><div class="value">{net:+}</div><div class="label">Net chips</div></div>
<div class="metric"><div class="value">{session_time}</div><div class="label">Session time</div></div>
</div>"#,
        message = escape(game.message()),
        dealer_total = dealer_total,
        dealer_cards = render_cards(game.visible_dealer_cards(), hidden),
        player_total = game.player_total(),
        player_cards = render_cards(game.player_cards(), 0),
        disabled = disabled,
        max_bet = page.max_bet,
        bet = page.table.bet,
        hand_number = page.table.hand_number,
        wins = page.stats.wins,
        losses = page.stats.losses,
        pushes = page.stats.pushes,
        net = page.stats.net_winnings,
        session_time = page.session_time,
    );
    layout("Table", page.nav, page.flash, &body)
}

fn metric(value: impl std::fmt::Display, label: &str) -> String {
    format!(
        r#"<div class="metric"><div class="value">{}</div><div class="label">{}</div></div>"#,
        value, label
    )
}

/// Headline tiles shared by both dashboards
fn overview_tiles(snapshot: &DashboardSnapshot) -> String {
    let o = &snapshot.overview;
    let health = &snapshot.system_health;
    let status = health.database_status.as_str();
    let health_tile = format!(
        r#"<div class="metric"><div class="value status-{status}">{label}</div><div class="label">System Health (database {status})</div></div>"#,
        status = status,
        label = if health.is_connected() { "OK" } else { "Degraded" },
    );

    format!(
        r#"<div class="grid">{}{}{}{}{}{}</div>"#,
        metric(o.total_users, "Total Users"),
        metric(o.games_today, "Games Today"),
        metric(o.active_users_24h, "Active Users (24h)"),
        metric(o.new_users_7d, "New Users (7d)"),
        metric(o.total_games, "Total Games"),
        health_tile,
    )
}

fn system_health_panel(snapshot: &DashboardSnapshot) -> String {
    let health = &snapshot.system_health;
    let error = health
        .error
        .as_deref()
        .map(|_| r#"<p class="status-unhealthy">Metrics are temporarily unavailable; showing a degraded view.</p>"#)
        .unwrap_or_default();
    format!(
        r#"<div class="panel"><h2>System Health</h2>{error}
<table class="data">
<tr><th>Database</th><td class="status-{status}">{status}</td></tr>
<tr><th>Records</th><td>{users} users &middot; {games} games &middot; {actions} actions</td></tr>
<tr><th>Avg games per user</th><td>{avg:.2}</td></tr>
<tr><th>Overall player win rate</th><td>{win_rate:.1}%</td></tr>
</table></div>"#,
        error = error,
        status = health.database_status.as_str(),
        users = health.total_records.users,
        games = health.total_records.games,
        actions = health.total_records.actions,
        avg = health.avg_games_per_user,
        win_rate = health.overall_win_rate,
    )
}

fn bar(value: i64, max: i64) -> String {
    let width = if max > 0 { value * 100 / max } else { 0 };
    format!(r#"<div class="bar" style="width:{}%"></div>"#, width)
}

/// Data for the player dashboard
pub struct PlayerDashboardPage<'a> {
    pub nav: Nav<'a>,
    pub flash: Option<&'a str>,
    pub stats: &'a UserStatistics,
    pub recent_games: &'a [HandRecord],
    pub history: &'a [DailyGames],
    pub recent_actions: &'a [ActionRecord],
    pub snapshot: &'a DashboardSnapshot,
}

pub fn player_dashboard(page: &PlayerDashboardPage<'_>) -> String {
    let stats = page.stats;

    let mut games = String::new();
    for hand in page.recent_games {
        let _ = write!(
            games,
            "<tr><td>{}</td><td>#{}</td><td>{}</td><td>{:+}</td><td>{}</td><td>{}</td></tr>",
            hand.timestamp.format("%Y-%m-%d %H:%M"),
            hand.hand_number,
            hand.result.as_str(),
            hand.winnings,
            escape(&hand.player_hand),
            escape(&hand.dealer_hand),
        );
    }
    if games.is_empty() {
        games.push_str(r#"<tr><td colspan="6">No hands played yet.</td></tr>"#);
    }

    let max_day = page.history.iter().map(|d| d.games).max().unwrap_or(0);
    let mut history = String::new();
    for day in page.history {
        let _ = write!(
            history,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            day.date,
            day.games,
            day.wins,
            bar(day.games, max_day),
        );
    }

    let mut actions = String::new();
    for action in page.recent_actions {
        let _ = write!(
            actions,
            "<tr><td>{}</td><td>{}</td></tr>",
            action.created_at.format("%Y-%m-%d %H:%M:%S"),
            escape(&action.action),
        );
    }

    let body = format!(
        r#"<h1>Dashboard</h1>
<h2>Your Statistics</h2>
<div class="grid">{total}{wins}{losses}{pushes}{rate}{net}</div>
<div class="panel"><h2>Recent Games</h2>
<table class="data"><tr><th>When</th><th>Hand</th><th>Result</th><th>Chips</th><th>You</th><th>Dealer</th></tr>{games}</table></div>
<div class="panel"><h2>Games per Day</h2>
<table class="data"><tr><th>Date</th><th>Games</th><th>Wins</th><th></th></tr>{history}</table></div>
<div class="panel"><h2>Recent Activity</h2>
<table class="data"><tr><th>When</th><th>Action</th></tr>{actions}</table></div>
<h2>Table Overview</h2>
{overview}
{health}"#,
        total = metric(stats.total_games, "Games Played"),
        wins = metric(stats.wins, "Wins"),
        losses = metric(stats.losses, "Losses"),
        pushes = metric(stats.pushes, "Pushes"),
        rate = metric(format!("{:.1}%", stats.win_rate), "Win Rate"),
        net = metric(format!("{:+}", stats.net_winnings), "Net Chips"),
        games = games,
        history = history,
        actions = actions,
        overview = overview_tiles(page.snapshot),
        health = system_health_panel(page.snapshot),
    );
    layout("Dashboard", page.nav, page.flash, &body)
}

pub fn admin_dashboard(report: &AdminReport, nav: Nav<'_>) -> String {
    let snapshot = &report.snapshot;
    let o = &snapshot.overview;

    let max_daily = snapshot
        .daily_activity
        .iter()
        .map(|d| d.games)
        .max()
        .unwrap_or(0);
    let mut daily = String::new();
    for day in &snapshot.daily_activity {
        let _ = write!(
            daily,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            day.date,
            day.games,
            day.logins,
            day.new_users,
            bar(day.games, max_daily),
        );
    }

    let max_hourly = snapshot
        .hourly_activity
        .iter()
        .map(|h| h.games)
        .max()
        .unwrap_or(0);
    let mut hourly = String::new();
    for hour in &snapshot.hourly_activity {
        let _ = write!(
            hourly,
            "<tr><td>{:02}:00</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            hour.hour,
            hour.games,
            hour.logins,
            bar(hour.games, max_hourly),
        );
    }

    let max_action = snapshot
        .action_distribution
        .values()
        .copied()
        .max()
        .unwrap_or(0);
    let mut distribution = String::new();
    for (action, count) in &snapshot.action_distribution {
        let _ = write!(
            distribution,
            "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape(action),
            count,
            bar(*count, max_action),
        );
    }

    let mut active = String::new();
    for (rank, user) in snapshot.most_active_users.iter().enumerate() {
        let _ = write!(
            active,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{:.1}%</td></tr>",
            rank + 1,
            escape(&user.username),
            user.games,
            user.wins,
            user.win_rate,
        );
    }

    let mut issues = String::new();
    for issue in &report.critical_issues {
        let _ = write!(
            issues,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            issue.severity,
            escape(&issue.title),
            escape(&issue.description),
            escape(&issue.fix),
            issue.time,
        );
    }
    if issues.is_empty() {
        issues.push_str(r#"<tr><td colspan="5">No open issues.</td></tr>"#);
    }

    let mut components = String::new();
    for component in &report.health_summary.components {
        let _ = write!(
            components,
            r#"<tr><td>{}</td><td class="status-{}">{}</td><td>{}</td></tr>"#,
            escape(&component.name),
            escape(&component.status),
            escape(&component.status),
            escape(component.error.as_deref().unwrap_or("")),
        );
    }

    let security = &report.security;
    let score = &report.security_score;
    let perf = &snapshot.performance;
    let infra = &report.infrastructure;
    let summary = &report.health_summary;

    let body = format!(
        r#"<h1>Operations Dashboard</h1>
<p>Generated {generated} UTC &middot; <span class="status-{overall}">{overall}</span>: {message} (health score {health_score}/100)</p>
{tiles}
<div class="grid">{logins_today}{logins_7d}{games_7d}{games_30d}{new_today}{new_30d}{actions_total}{active_7d}</div>
{health}
<div class="panel"><h2>Component Status</h2>
<table class="data"><tr><th>Component</th><th>Status</th><th>Error</th></tr>{components}</table>
<p>{db_type} &middot; {environment} &middot; v{version}</p></div>
<div class="panel"><h2>Performance (last hour)</h2>
<table class="data">
<tr><th>Games</th><td>{games_hour}</td></tr>
<tr><th>Actions</th><td>{actions_hour}</td></tr>
<tr><th>Active users</th><td>{active_hour}</td></tr>
<tr><th>Actions per active user</th><td>{activity_rate:.2}</td></tr>
</table></div>
<div class="panel"><h2>Security</h2>
<p>Score {score}/{max_score} ({percentage:.0}%) &middot; Grade <strong>{grade}</strong></p>
<table class="data">
<tr><th>Logins (24h / 7d)</th><td>{logins_24h} / {sec_logins_7d}</td></tr>
<tr><th>Failed logins (24h)</th><td>{failed}</td></tr>
<tr><th>Session secret configured</th><td>{secret}</td></tr>
<tr><th>HTTPS enforced</th><td>{https}</td></tr>
<tr><th>Password hashing</th><td>{hashing}</td></tr>
</table></div>
<div class="panel"><h2>Critical Issues</h2>
<table class="data"><tr><th>Severity</th><th>Issue</th><th>Details</th><th>Fix</th><th>Effort</th></tr>{issues}</table></div>
<div class="panel"><h2>Daily Activity (30 days)</h2>
<table class="data"><tr><th>Date</th><th>Games</th><th>Logins</th><th>New users</th><th></th></tr>{daily}</table></div>
<div class="panel"><h2>Activity by Hour (7 days, UTC)</h2>
<table class="data"><tr><th>Hour</th><th>Games</th><th>Logins</th><th></th></tr>{hourly}</table></div>
<div class="panel"><h2>Action Distribution</h2>
<table class="data"><tr><th>Action</th><th>Count</th><th></th></tr>{distribution}</table></div>
<div class="panel"><h2>Most Active Players</h2>
<table class="data"><tr><th>#</th><th>Player</th><th>Games</th><th>Wins</th><th>Win rate</th></tr>{active}</table></div>"#,
        generated = snapshot.generated_at.format("%Y-%m-%d %H:%M:%S"),
        overall = escape(&summary.overall_status),
        message = escape(&summary.overall_message),
        health_score = summary.health_score,
        tiles = overview_tiles(snapshot),
        logins_today = metric(o.logins_today, "Logins Today"),
        logins_7d = metric(o.logins_7d, "Logins (7d)"),
        games_7d = metric(o.games_7d, "Games (7d)"),
        games_30d = metric(o.games_30d, "Games (30d)"),
        new_today = metric(o.new_users_today, "New Users Today"),
        new_30d = metric(o.new_users_30d, "New Users (30d)"),
        actions_total = metric(o.total_actions, "Total Actions"),
        active_7d = metric(o.active_users_7d, "Active Users (7d)"),
        health = system_health_panel(snapshot),
        components = components,
        db_type = infra.database_type,
        environment = escape(&infra.environment),
        version = escape(&infra.version),
        games_hour = perf.games_last_hour,
        actions_hour = perf.actions_last_hour,
        active_hour = perf.active_users_last_hour,
        activity_rate = perf.activity_rate,
        score = score.score,
        max_score = score.max_score,
        percentage = score.percentage,
        grade = score.grade,
        logins_24h = security.logins_24h,
        sec_logins_7d = security.logins_7d,
        failed = security.failed_logins_24h,
        secret = yes_no(security.secret_key_secure),
        https = yes_no(security.https_enforced),
        hashing = security.password_hashing,
        issues = issues,
        daily = daily,
        hourly = hourly,
        distribution = distribution,
        active = active,
    );
    layout("Operations", nav, None, &body)
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

pub fn error_page(status: StatusCode, message: &str) -> String {
    let body = format!(
        r#"<h1>{} {}</h1><div class="panel"><p>{}</p><p><a href="/">Back to the table</a></p></div>"#,
        status.as_u16(),
        escape(status.canonical_reason().unwrap_or("Error")),
        escape(message),
    );
    layout("Error", Nav::default(), None, &body)
}

/// Body for redirect responses, for clients that do not follow `Location`
pub fn redirect_page(location: &str) -> String {
    format!(
        r#"<!DOCTYPE html><html><head><title>Blackjack</title></head><body><p>Redirecting to <a href="{0}">{0}</a>.</p></body></html>"#,
        escape(location)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(
            escape(r#"<script>alert("x & 'y'")</script>"#),
            "&lt;script&gt;alert(&quot;x &amp; &#x27;y&#x27;&quot;)&lt;/script&gt;"
        );
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn test_login_page_escapes_username() {
        let html = login_page(None, Some("Invalid username or password."), "<b>eve</b>");
        assert!(html.contains("Blackjack"));
        assert!(html.contains("Invalid username or password."));
        assert!(html.contains("&lt;b&gt;eve&lt;/b&gt;"));
        assert!(!html.contains("<b>eve</b>"));
    }

    #[test]
    fn test_dashboard_tiles_degraded() {
        let snapshot = DashboardSnapshot::degraded(chrono::Utc::now(), "boom".to_string());
        let html = overview_tiles(&snapshot);
        assert!(html.contains("Total Users"));
        assert!(html.contains("Games Today"));
        assert!(html.contains("System Health"));
        assert!(html.contains("Degraded"));
    }

    #[test]
    fn test_bar_width() {
        assert!(bar(5, 10).contains("width:50%"));
        assert!(bar(0, 0).contains("width:0%"));
    }

    #[test]
    fn test_error_page_hides_nothing_unescaped() {
        let html = error_page(StatusCode::NOT_FOUND, "No such page <here>");
        assert!(html.contains("404 Not Found"));
        assert!(html.contains("No such page &lt;here&gt;"));
    }
}
