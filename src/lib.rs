/// Blackjack table
///
/// A web Blackjack game with player accounts, a persistent hand history, an
/// append-only action log and an operational dashboard built on top of them.

pub mod account;
pub mod activity;
pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod dashboard;
pub mod db;
pub mod error;
pub mod game;
pub mod metrics;
pub mod rate_limit;
pub mod server;
pub mod session;
pub mod timeframe;
pub mod views;

pub use config::ServerConfig;
pub use context::AppContext;
pub use error::{AppError, AppResult};
