//! marketbot setup helper.
//!
//! Without flags: reads `config.toml` and registers
//! `<public_url><webhook_path>` as the bot's webhook, then prints what the
//! platform reports back.
//!
//! With `--delete`: removes the registered webhook.
//!
//! With `--cli`: runs an interactive terminal wizard that writes a fresh
//! `config.toml`.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use teloxide::prelude::*;

// ── Raw TOML parse structs (all fields optional so partial configs load) ──

#[derive(Deserialize, Default)]
struct RawConfig {
    telegram: Option<RawTelegram>,
    server: Option<RawServer>,
}

#[derive(Deserialize, Default)]
struct RawTelegram {
    bot_token: Option<String>,
    api_base_url: Option<String>,
}

#[derive(Deserialize, Default)]
struct RawServer {
    webhook_path: Option<String>,
    public_url: Option<String>,
    secret_token: Option<String>,
}

/// What the webhook registration needs, resolved from a loose config.
#[derive(Debug, PartialEq)]
struct WebhookTarget {
    bot_token: String,
    api_base_url: Option<String>,
    url: String,
    secret_token: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn resolve_target(content: &str) -> Result<WebhookTarget> {
    let raw: RawConfig = toml::from_str(content).context("Failed to parse config file")?;
    let telegram = raw.telegram.unwrap_or_default();
    let server = raw.server.unwrap_or_default();

    let Some(bot_token) = non_empty(telegram.bot_token) else {
        bail!("[telegram] bot_token is not set");
    };
    let Some(public_url) = non_empty(server.public_url) else {
        bail!("[server] public_url is not set; the platform needs a public HTTPS address");
    };
    let path = non_empty(server.webhook_path).unwrap_or_else(|| "/webhook".to_string());

    Ok(WebhookTarget {
        bot_token,
        api_base_url: non_empty(telegram.api_base_url),
        url: format!("{}{}", public_url.trim_end_matches('/'), path),
        secret_token: non_empty(server.secret_token),
    })
}

fn bot_for(bot_token: &str, api_base_url: Option<&str>) -> Result<Bot> {
    let bot = Bot::new(bot_token);
    match api_base_url {
        Some(api) => {
            let url = reqwest::Url::parse(api)
                .with_context(|| format!("Invalid api_base_url: {api}"))?;
            Ok(bot.set_api_url(url))
        }
        None => Ok(bot),
    }
}

async fn register_webhook(config_path: &Path) -> Result<()> {
    let content = std::fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read {}", config_path.display()))?;
    let target = resolve_target(&content)?;
    let bot = bot_for(&target.bot_token, target.api_base_url.as_deref())?;

    let url = reqwest::Url::parse(&target.url)
        .with_context(|| format!("Invalid webhook URL: {}", target.url))?;

    let mut request = bot.set_webhook(url);
    if let Some(secret) = &target.secret_token {
        request = request.secret_token(secret.clone());
    }
    request.await.context("Failed to register webhook")?;
    println!("✓  Webhook registered: {}", target.url);

    let info = bot
        .get_webhook_info()
        .await
        .context("Failed to read webhook info")?;
    println!("   Platform reports url: {:?}", info.url);
    println!("   Pending updates: {}", info.pending_update_count);
    if let Some(err) = &info.last_error_message {
        println!("   Last delivery error: {err}");
    }
    Ok(())
}

async fn delete_webhook(config_path: &Path) -> Result<()> {
    let content = std::fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read {}", config_path.display()))?;
    let raw: RawConfig = toml::from_str(&content).context("Failed to parse config file")?;
    let telegram = raw.telegram.unwrap_or_default();
    let Some(bot_token) = non_empty(telegram.bot_token) else {
        bail!("[telegram] bot_token is not set");
    };

    let api_base_url = non_empty(telegram.api_base_url);
    let bot = bot_for(&bot_token, api_base_url.as_deref())?;
    bot.delete_webhook()
        .await
        .context("Failed to delete webhook")?;
    println!("✓  Webhook removed");
    Ok(())
}

// ── Config formatting ──────────────────────────────────────────────────────────

struct ConfigParams<'a> {
    tg_token: &'a str,
    mode: &'a str,
    bind_address: &'a str,
    public_url: &'a str,
    secret_token: &'a str,
    pulse_base_url: &'a str,
}

fn optional_line(key: &str, value: &str, example: &str) -> String {
    if value.is_empty() {
        format!("# {key} = \"{example}\"")
    } else {
        format!("{key} = \"{value}\"")
    }
}

/// Produces a valid config.toml string. Extracted so it can be unit-tested.
fn format_config(p: &ConfigParams<'_>) -> String {
    let tg_token = p.tg_token;
    let mode = p.mode;
    let bind_address = p.bind_address;
    let public_url_line = optional_line("public_url", p.public_url, "https://bot.example.com");
    let secret_line = optional_line("secret_token", p.secret_token, "change-me");
    let pulse_line = optional_line(
        "pulse_base_url",
        p.pulse_base_url,
        "https://pulse.example.com/api",
    );

    format!(
        r#"[telegram]
bot_token = "{tg_token}"
mode = "{mode}"

[server]
bind_address = "{bind_address}"
webhook_path = "/webhook"
{public_url_line}
{secret_line}

[providers]
coingecko_base_url = "https://api.coingecko.com/api/v3"
{pulse_line}
"#
    )
}

// ── CLI mode ───────────────────────────────────────────────────────────────────

fn run_cli(project_root: &Path) -> Result<()> {
    use std::io::{self, Write};

    println!("=== marketbot CLI Setup ===\n");

    let read_line = |prompt: &str| -> Result<String> {
        print!("{prompt}");
        io::stdout().flush()?;
        let mut buf = String::new();
        io::stdin().read_line(&mut buf)?;
        Ok(buf.trim().to_owned())
    };

    let or_default = |s: String, default: &str| {
        if s.is_empty() {
            default.to_owned()
        } else {
            s
        }
    };

    let tg_token = read_line("Telegram bot token: ")?;
    let mode = or_default(read_line("Update mode, webhook or polling [webhook]: ")?, "webhook");
    if mode != "webhook" && mode != "polling" {
        bail!("Unknown mode '{mode}'");
    }
    let bind_address = or_default(read_line("Bind address [0.0.0.0:8080]: ")?, "0.0.0.0:8080");
    let public_url = read_line("Public HTTPS URL (optional, needed for webhook): ")?;
    let secret_token = read_line("Webhook secret token (optional): ")?;
    let pulse_base_url = read_line("Pulse listings API URL (optional): ")?;

    let config = format_config(&ConfigParams {
        tg_token: &tg_token,
        mode: &mode,
        bind_address: &bind_address,
        public_url: &public_url,
        secret_token: &secret_token,
        pulse_base_url: &pulse_base_url,
    });

    let config_path = project_root.join("config.toml");
    std::fs::write(&config_path, &config)
        .with_context(|| format!("Could not write {}", config_path.display()))?;

    println!("\n✓  config.toml saved to {}", config_path.display());
    if mode == "webhook" {
        println!("   Register the webhook with:  cargo run --bin setup");
    }
    println!("   Run the bot with:  cargo run");
    Ok(())
}

// ── Entry point ────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    // Resolve project root: prefer MARKETBOT_ROOT env, fall back to cwd.
    let project_root =
        PathBuf::from(std::env::var("MARKETBOT_ROOT").unwrap_or_else(|_| ".".to_string()));

    if args.iter().any(|a| a == "--cli") {
        return run_cli(&project_root);
    }

    let config_path = project_root.join("config.toml");
    if args.iter().any(|a| a == "--delete") {
        return delete_webhook(&config_path).await;
    }

    register_webhook(&config_path).await
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn params<'a>(public_url: &'a str, secret_token: &'a str) -> ConfigParams<'a> {
        ConfigParams {
            tg_token: "123:abc",
            mode: "webhook",
            bind_address: "0.0.0.0:8080",
            public_url,
            secret_token,
            pulse_base_url: "",
        }
    }

    #[test]
    fn test_telegram_section_present() {
        let out = format_config(&params("", ""));
        assert!(out.contains("[telegram]"));
        assert!(out.contains(r#"bot_token = "123:abc""#));
        assert!(out.contains(r#"mode = "webhook""#));
    }

    #[test]
    fn test_optional_values_commented_when_empty() {
        let out = format_config(&params("", ""));
        assert!(out.contains("# public_url ="));
        assert!(out.contains("# secret_token ="));
        assert!(out.contains("# pulse_base_url ="));
    }

    #[test]
    fn test_optional_values_written_when_set() {
        let out = format_config(&params("https://bot.example.com", "s3cret"));
        assert!(out.contains(r#"public_url = "https://bot.example.com""#));
        assert!(out.contains(r#"secret_token = "s3cret""#));
        assert!(!out.contains("# public_url"));
    }

    #[test]
    fn test_generated_config_resolves_target() {
        let out = format_config(&params("https://bot.example.com/", "s3cret"));
        let target = resolve_target(&out).unwrap();
        assert_eq!(
            target,
            WebhookTarget {
                bot_token: "123:abc".to_string(),
                api_base_url: None,
                url: "https://bot.example.com/webhook".to_string(),
                secret_token: Some("s3cret".to_string()),
            }
        );
    }

    #[test]
    fn test_target_requires_public_url() {
        let out = format_config(&params("", ""));
        let err = resolve_target(&out).unwrap_err();
        assert!(err.to_string().contains("public_url"));
    }

    #[test]
    fn test_target_requires_token() {
        let err = resolve_target("[server]\npublic_url = \"https://x\"\n").unwrap_err();
        assert!(err.to_string().contains("bot_token"));
    }
}
