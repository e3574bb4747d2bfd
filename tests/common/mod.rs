//! Shared harness: a fresh SQLite database per test and a cookie-keeping client
#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use blackjack_table::{server::build_router, AppContext, ServerConfig};
use std::collections::HashMap;
use tempfile::TempDir;
use tower::ServiceExt; // for `oneshot`

pub const PASSWORD: &str = "hunter22";

pub struct TestApp {
    pub ctx: AppContext,
    router: Router,
    cookies: HashMap<String, String>,
    _dir: TempDir,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub location: Option<String>,
    pub body: String,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    pub async fn with_config(adjust: impl FnOnce(&mut ServerConfig)) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ServerConfig::default();
        config.storage.database_url =
            format!("sqlite://{}?mode=rwc", dir.path().join("blackjack.db").display());
        config.rate_limit.enabled = false;
        adjust(&mut config);

        let ctx = AppContext::new(config).await.unwrap();
        let router = build_router(ctx.clone());

        Self {
            ctx,
            router,
            cookies: HashMap::new(),
            _dir: dir,
        }
    }

    pub async fn get(&mut self, path: &str) -> TestResponse {
        let request = self.request("GET", path).body(Body::empty()).unwrap();
        self.send(request).await
    }

    pub async fn post(&mut self, path: &str, fields: &[(&str, &str)]) -> TestResponse {
        let request = self
            .request("POST", path)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form_encode(fields)))
            .unwrap();
        self.send(request).await
    }

    pub async fn register(&mut self, username: &str) -> TestResponse {
        self.post("/register", &[("username", username), ("password", PASSWORD)])
            .await
    }

    pub async fn login(&mut self, username: &str) -> TestResponse {
        self.post("/login", &[("username", username), ("password", PASSWORD)])
            .await
    }

    /// Register and sign in, returning the new user's id
    pub async fn sign_up(&mut self, username: &str) -> i64 {
        let response = self.register(username).await;
        assert_eq!(response.status, StatusCode::FOUND);
        let response = self.login(username).await;
        assert_eq!(response.location.as_deref(), Some("/"));

        self.ctx
            .account_manager
            .find_by_username(username)
            .await
            .unwrap()
            .unwrap()
            .id
    }

    pub fn clear_cookies(&mut self) {
        self.cookies.clear();
    }

    /// The cookies the browser holds right now
    pub fn save_cookies(&self) -> HashMap<String, String> {
        self.cookies.clone()
    }

    /// Send earlier cookies again, as a replaying client would
    pub fn restore_cookies(&mut self, cookies: &HashMap<String, String>) {
        self.cookies = cookies.clone();
    }

    pub fn has_cookie(&self, name: &str) -> bool {
        self.cookies.contains_key(name)
    }

    fn request(&self, method: &str, path: &str) -> axum::http::request::Builder {
        let mut builder = Request::builder().method(method).uri(path);
        if !self.cookies.is_empty() {
            let cookie = self
                .cookies
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect::<Vec<_>>()
                .join("; ");
            builder = builder.header(header::COOKIE, cookie);
        }
        builder
    }

    async fn send(&mut self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();

        for value in response.headers().get_all(header::SET_COOKIE) {
            let raw = value.to_str().unwrap();
            let pair = raw.split(';').next().unwrap();
            let (name, value) = pair.split_once('=').unwrap();
            let removed = value.is_empty() || raw.contains("Max-Age=0");
            if removed {
                self.cookies.remove(name.trim());
            } else {
                self.cookies
                    .insert(name.trim().to_string(), value.trim().to_string());
            }
        }

        let status = response.status();
        let location = response
            .headers()
            .get(header::LOCATION)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        TestResponse {
            status,
            location,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }
}

fn form_encode(fields: &[(&str, &str)]) -> String {
    fields
        .iter()
        .map(|(k, v)| format!("{}={}", encode(k), encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

fn encode(raw: &str) -> String {
    let mut out = String::new();
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            b' ' => out.push('+'),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}
