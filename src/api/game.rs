/// The Blackjack table: deal, hit, stand
///
/// The hand in progress travels in the encrypted `bj_table` cookie. Every
/// action is written to the action log, and a hand is written to the hand
/// history exactly once, on the request that finishes it.
use super::redirect_to;
use crate::{
    activity::{Turn, UserStatistics},
    auth::SessionUser,
    context::AppContext,
    db::models::ActionKind,
    error::AppResult,
    game::{GameError, Outcome, Table},
    session,
    timeframe::format_seconds_hhmmss,
    views::{self, Nav, TablePage},
};
use axum::{
    extract::State,
    response::{Html, IntoResponse, Response},
    routing::get,
    Form, Router,
};
use axum_extra::extract::cookie::PrivateCookieJar;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

const HAND_OVER: &str = "This hand is over. Start a new game.";

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/", get(table))
        .route("/hit", get(hit).post(hit))
        .route("/stand", get(stand).post(stand))
        .route("/new", get(new_game).post(new_game))
}

#[derive(Debug, Deserialize)]
pub struct BetForm {
    bet: Option<String>,
}

/// Requested bet, clamped to the table limits
fn bet_amount(requested: Option<&str>, fallback: i64, max_bet: i64) -> i64 {
    requested
        .and_then(|raw| raw.trim().parse::<i64>().ok())
        .unwrap_or(fallback)
        .clamp(1, max_bet)
}

/// Deal a hand, continuing `table` when there is one
fn deal(table: Option<Table>, user_id: i64, bet: i64) -> Result<Table, GameError> {
    let mut rng = rand::thread_rng();
    match table {
        Some(mut table) => {
            table.next_hand(bet, &mut rng)?;
            Ok(table)
        }
        None => Table::open(user_id, bet, &mut rng),
    }
}

async fn table(
    State(ctx): State<AppContext>,
    user: SessionUser,
    jar: PrivateCookieJar,
) -> AppResult<Response> {
    let secure = ctx.config.authentication.cookie_secure;
    let user_id = user.user.id;

    let (jar, flash) = session::take_flash(jar);
    let (jar, table) = match session::read_table(&jar, user_id) {
        Some(table) => (jar, table),
        None => {
            let table = deal(None, user_id, ctx.config.table.default_bet)?;
            (session::store_table(jar, &table, secure), table)
        }
    };

    let stats = match ctx.hand_history.user_statistics(user_id).await {
        Ok(stats) => stats,
        Err(e) => {
            warn!(user_id, error = %e, "player statistics unavailable");
            UserStatistics::default()
        }
    };

    let page = TablePage {
        nav: Nav {
            username: Some(&user.user.username),
            is_admin: user.is_admin,
        },
        flash: flash.as_deref(),
        table: &table,
        stats: &stats,
        session_time: format_seconds_hhmmss(user.session.elapsed_seconds(Utc::now())),
        max_bet: ctx.config.table.max_bet,
    };

    Ok((jar, Html(views::table_page(&page))).into_response())
}

/// Write a hit or stand, and the hand it finished, in one transaction
///
/// Returns `false` when the hand was already settled by an earlier request,
/// in which case nothing was written.
async fn record_turn(
    ctx: &AppContext,
    table: &Table,
    action: ActionKind,
    details: serde_json::Value,
    outcome: Option<Outcome>,
) -> AppResult<bool> {
    let hand = outcome.map(|outcome| table.settled_hand(outcome));
    let turn = ctx
        .hand_history
        .record_turn(table.user_id, action, details, hand.as_ref())
        .await?;

    Ok(!matches!(turn, Turn::AlreadySettled))
}

/// The table after a turn: the new state, or a note that the hand is over
async fn after_turn(
    ctx: &AppContext,
    jar: PrivateCookieJar,
    table: &Table,
    action: ActionKind,
    recorded: bool,
) -> AppResult<PrivateCookieJar> {
    let secure = ctx.config.authentication.cookie_secure;
    if recorded {
        return Ok(session::store_table(jar, table, secure));
    }
    hand_over(ctx, table, action).await?;
    Ok(session::set_flash(jar, HAND_OVER, secure))
}

async fn hit(
    State(ctx): State<AppContext>,
    user: SessionUser,
    jar: PrivateCookieJar,
) -> AppResult<Response> {
    let secure = ctx.config.authentication.cookie_secure;
    let user_id = user.user.id;

    let Some(mut table) = session::read_table(&jar, user_id) else {
        return Ok(redirect_to("/"));
    };

    let jar = match table.game.hit() {
        Ok(outcome) => {
            let card = table.game.player_cards().last().map(|c| c.code());
            let details = json!({
                "game_id": table.game_id,
                "hand_number": table.hand_number,
                "card": card,
                "player_total": table.game.player_total(),
                "bust": outcome.is_some(),
            });
            let recorded = record_turn(&ctx, &table, ActionKind::Hit, details, outcome).await?;
            after_turn(&ctx, jar, &table, ActionKind::Hit, recorded).await?
        }
        Err(GameError::HandComplete) => {
            hand_over(&ctx, &table, ActionKind::Hit).await?;
            session::set_flash(jar, HAND_OVER, secure)
        }
        Err(e) => return Err(e.into()),
    };

    Ok((jar, redirect_to("/")).into_response())
}

async fn stand(
    State(ctx): State<AppContext>,
    user: SessionUser,
    jar: PrivateCookieJar,
) -> AppResult<Response> {
    let secure = ctx.config.authentication.cookie_secure;
    let user_id = user.user.id;

    let Some(mut table) = session::read_table(&jar, user_id) else {
        return Ok(redirect_to("/"));
    };

    let jar = match table.game.stand() {
        Ok(outcome) => {
            let details = json!({
                "game_id": table.game_id,
                "hand_number": table.hand_number,
                "player_total": table.game.player_total(),
                "dealer_total": table.game.dealer_total(),
                "result": outcome.result().as_str(),
            });
            let recorded =
                record_turn(&ctx, &table, ActionKind::Stand, details, Some(outcome)).await?;
            after_turn(&ctx, jar, &table, ActionKind::Stand, recorded).await?
        }
        Err(GameError::HandComplete) => {
            hand_over(&ctx, &table, ActionKind::Stand).await?;
            session::set_flash(jar, HAND_OVER, secure)
        }
        Err(e) => return Err(e.into()),
    };

    Ok((jar, redirect_to("/")).into_response())
}

/// Log an action against a hand that already finished; nothing is recorded twice
async fn hand_over(ctx: &AppContext, table: &Table, action: ActionKind) -> AppResult<()> {
    let details = json!({
        "game_id": table.game_id,
        "hand_number": table.hand_number,
        "hand_complete": true,
    });
    ctx.action_log.log(table.user_id, action, Some(details)).await?;
    Ok(())
}

async fn new_game(
    State(ctx): State<AppContext>,
    user: SessionUser,
    jar: PrivateCookieJar,
    form: Option<Form<BetForm>>,
) -> AppResult<Response> {
    let secure = ctx.config.authentication.cookie_secure;
    let user_id = user.user.id;

    let previous = session::read_table(&jar, user_id);
    let abandoned = previous.as_ref().is_some_and(|t| !t.game.is_finished());
    let fallback = previous
        .as_ref()
        .map_or(ctx.config.table.default_bet, |t| t.bet);
    let bet = bet_amount(
        form.as_ref().and_then(|Form(f)| f.bet.as_deref()),
        fallback,
        ctx.config.table.max_bet,
    );

    let table = deal(previous, user_id, bet)?;

    let details = json!({
        "game_id": table.game_id,
        "hand_number": table.hand_number,
        "bet": bet,
        "abandoned_previous": abandoned,
    });
    ctx.action_log.log(user_id, ActionKind::NewGame, Some(details)).await?;

    let jar = session::store_table(jar, &table, secure);
    Ok((jar, redirect_to("/")).into_response())
}
