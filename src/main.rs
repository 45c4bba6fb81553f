mod config;
mod dispatch;
mod error;
mod format;
mod market;
mod markup;
mod platform;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use teloxide::Bot;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, UpdateMode};
use crate::dispatch::CommandDispatcher;
use crate::market::Providers;
use crate::platform::telegram::{self, TelegramSender};
use crate::platform::webhook;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,marketbot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded successfully");
    info!("  Mode: {}", config.telegram.mode);
    info!("  Webhook path: {}", config.server.webhook_path);
    if let Some(public_url) = &config.server.public_url {
        info!("  Public URL: {}", public_url);
    }
    info!("  CoinGecko: {}", config.providers.coingecko_base_url);
    info!(
        "  Pulse provider: {}",
        config
            .providers
            .pulse_base_url
            .as_deref()
            .unwrap_or("(sample listings)")
    );

    let http = market::http_client(&config.providers.user_agent)?;
    let market = Arc::new(Providers::new(http.clone(), &config.providers)?);
    let sender = Arc::new(TelegramSender::new(
        http,
        &config.telegram.api_base_url,
        &config.telegram.bot_token,
    ));
    let dispatcher = Arc::new(CommandDispatcher::new(market, sender));

    info!("Bot is starting...");
    match config.telegram.mode {
        UpdateMode::Webhook => webhook::serve(&config.server, dispatcher).await?,
        UpdateMode::Polling => {
            let api_url = reqwest::Url::parse(&config.telegram.api_base_url)
                .context("Invalid telegram.api_base_url")?;
            let bot = Bot::new(&config.telegram.bot_token).set_api_url(api_url);
            telegram::run_polling(bot, dispatcher).await;
        }
    }

    Ok(())
}
