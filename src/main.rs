/// Blackjack table server
use anyhow::{Context, Result};
use blackjack_table::{config::LoggingConfig, server, AppContext, ServerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = ServerConfig::from_env().context("failed to load configuration")?;

    // Initialize logging
    init_tracing(&config.logging);

    // Print banner
    print_banner();

    // Create application context
    let ctx = AppContext::new(config)
        .await
        .context("failed to initialize application context")?;

    // Start server
    server::serve(ctx).await.context("server error")?;

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("blackjack_table={},tower_http=info", logging.level).into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format.eq_ignore_ascii_case("json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn print_banner() {
    println!(
        r#"
    ____  __           __   _            __
   / __ )/ /___ ______/ /__(_)___ ______/ /__
  / __  / / __ `/ ___/ //_/ / __ `/ ___/ //_/
 / /_/ / / /_/ / /__/ ,< / / /_/ / /__/ ,<
/_____/_/\__,_/\___/_/|_/_/ /\__,_/\___/_/|_|
                       /___/
        Blackjack Table v{}
        "#,
        env!("CARGO_PKG_VERSION")
    );
}
