/// Cookie-backed session state
///
/// Three private (encrypted and authenticated) cookies carry everything the
/// server needs between requests, so no game state lives in process memory:
/// - `bj_session`: who is signed in and since when
/// - `bj_table`: the hand in progress
/// - `bj_flash`: a one-shot message for the next page
use crate::{db::models::User, game::Table};
use axum_extra::extract::cookie::{Cookie, PrivateCookieJar, SameSite};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

pub const SESSION_COOKIE: &str = "bj_session";
pub const TABLE_COOKIE: &str = "bj_table";
pub const FLASH_COOKIE: &str = "bj_flash";

/// Signed-in user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    pub user_id: i64,
    pub username: String,
    pub started_at: DateTime<Utc>,
}

impl SessionData {
    pub fn new(user: &User, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            started_at: now,
        }
    }

    /// Seconds since login, never negative
    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> i64 {
        (now - self.started_at).num_seconds().max(0)
    }
}

fn build_cookie(name: &'static str, value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

fn read_json<T: DeserializeOwned>(jar: &PrivateCookieJar, name: &str) -> Option<T> {
    let cookie = jar.get(name)?;
    match serde_json::from_str(cookie.value()) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!(cookie = name, error = %e, "ignoring unreadable cookie");
            None
        }
    }
}

fn write_json<T: Serialize>(
    jar: PrivateCookieJar,
    name: &'static str,
    value: &T,
    secure: bool,
) -> PrivateCookieJar {
    match serde_json::to_string(value) {
        Ok(json) => jar.add(build_cookie(name, json, secure)),
        Err(e) => {
            tracing::error!(cookie = name, error = %e, "failed to serialize cookie");
            jar
        }
    }
}

/// Removal form of a cookie, matching the path it was set with
fn removal(name: &'static str) -> Cookie<'static> {
    Cookie::build(name).path("/").build()
}

pub fn read_session(jar: &PrivateCookieJar) -> Option<SessionData> {
    read_json(jar, SESSION_COOKIE)
}

pub fn start_session(jar: PrivateCookieJar, session: &SessionData, secure: bool) -> PrivateCookieJar {
    write_json(jar.remove(removal(TABLE_COOKIE)), SESSION_COOKIE, session, secure)
}

/// Drop the session and any table in progress
pub fn end_session(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.remove(removal(SESSION_COOKIE))
        .remove(removal(TABLE_COOKIE))
}

/// `Set-Cookie` value that clears the session, for responses built without a jar
pub fn removal_cookie() -> Cookie<'static> {
    let mut cookie = removal(SESSION_COOKIE);
    cookie.make_removal();
    cookie
}

/// The table in progress, if it belongs to `user_id`
pub fn read_table(jar: &PrivateCookieJar, user_id: i64) -> Option<Table> {
    read_json::<Table>(jar, TABLE_COOKIE).filter(|table| table.user_id == user_id)
}

pub fn store_table(jar: PrivateCookieJar, table: &Table, secure: bool) -> PrivateCookieJar {
    write_json(jar, TABLE_COOKIE, table, secure)
}

pub fn set_flash(jar: PrivateCookieJar, message: &str, secure: bool) -> PrivateCookieJar {
    jar.add(build_cookie(FLASH_COOKIE, message.to_string(), secure))
}

/// Read and clear the flash message
pub fn take_flash(jar: PrivateCookieJar) -> (PrivateCookieJar, Option<String>) {
    match jar.get(FLASH_COOKIE) {
        Some(cookie) => {
            let message = cookie.value().to_string();
            (jar.remove(removal(FLASH_COOKIE)), Some(message))
        }
        None => (jar, None),
    }
}
