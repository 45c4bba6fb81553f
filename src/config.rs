use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

/// How updates reach the bot.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum UpdateMode {
    #[default]
    Webhook,
    Polling,
}

impl std::fmt::Display for UpdateMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpdateMode::Webhook => write!(f, "webhook"),
            UpdateMode::Polling => write!(f, "polling"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    #[serde(default = "default_telegram_api")]
    pub api_base_url: String,
    #[serde(default)]
    pub mode: UpdateMode,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_webhook_path")]
    pub webhook_path: String,
    /// Public base URL the platform should call, used by the setup binary.
    #[serde(default)]
    pub public_url: Option<String>,
    /// Expected value of the `X-Telegram-Bot-Api-Secret-Token` header.
    #[serde(default)]
    pub secret_token: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProvidersConfig {
    #[serde(default = "default_coingecko_base_url")]
    pub coingecko_base_url: String,
    /// Pulse listings API. When unset every section shows its sample listing.
    #[serde(default)]
    pub pulse_base_url: Option<String>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_telegram_api() -> String {
    "https://api.telegram.org".to_string()
}

fn default_bind_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_webhook_path() -> String {
    "/webhook".to_string()
}

fn default_coingecko_base_url() -> String {
    "https://api.coingecko.com/api/v3".to_string()
}

fn default_user_agent() -> String {
    concat!("marketbot/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            webhook_path: default_webhook_path(),
            public_url: None,
            secret_token: None,
        }
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            coingecko_base_url: default_coingecko_base_url(),
            pulse_base_url: None,
            user_agent: default_user_agent(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(content).context("Failed to parse config file")?;

        if config.telegram.bot_token.trim().is_empty() {
            bail!("telegram.bot_token must not be empty");
        }
        if !config.server.webhook_path.starts_with('/') {
            bail!(
                "server.webhook_path must start with '/', got '{}'",
                config.server.webhook_path
            );
        }

        // Treat blank optional strings as unset.
        for value in [
            &mut config.server.public_url,
            &mut config.server.secret_token,
            &mut config.providers.pulse_base_url,
        ] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                *value = None;
            }
        }

        Ok(config)
    }
}
