use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use dotenvy::dotenv;
use tokio::net::TcpListener;
use tracing::{info, warn};

mod config;
mod db;
mod error;
mod handlers;
mod payments;
mod routes;
mod state;
mod telegram;
#[cfg(test)]
mod testing;
mod utils;

use config::Config;
use db::database::Database;
use routes::create_routes;
use state::AppState;
use telegram::client::TelegramBotClient;
use utils::http::build_http_client;
use utils::logging::init_logging;

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for ctrl-c: {err}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let config = Config::load()?;
    let _guards = init_logging(&config.log_level);

    if !config.has_bot_token() {
        warn!("TELEGRAM_BOT_TOKEN is not set; screenshot relay will answer with a configuration error");
    }

    let db = Database::init(&config.database_url)
        .await
        .with_context(|| format!("Failed to open database at {}", config.database_url))?;

    let http_client = build_http_client(Duration::from_secs(config.bot_request_timeout_secs))
        .context("Failed to build HTTP client")?;
    let bot = TelegramBotClient::new(http_client, &config.telegram_api_url, &config.bot_token)
        .with_context(|| format!("Invalid Telegram API URL {}", config.telegram_api_url))?;

    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(config, db, Arc::new(bot));
    let app = create_routes(state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {bind_addr}"))?;
    info!("Top-up payment bot listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}
