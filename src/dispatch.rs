use std::sync::Arc;

use tracing::{debug, error, info};

use crate::error::{DeliveryError, UpstreamError};
use crate::format;
use crate::market::{MarketData, PulseSection};
use crate::platform::{InboundMessage, OutboundReply, ReplySender};

/// A chat command recognised from message text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Top10,
    Trending,
    Pulse,
    Global,
    /// `/price <coin>`; holds the first word after the prefix as typed.
    Price(String),
    Unrecognized,
}

const PRICE_PREFIX: &str = "/price ";

impl Command {
    /// Case-insensitive match on the trimmed text. Anything else is
    /// [`Command::Unrecognized`].
    pub fn parse(text: &str) -> Self {
        let text = text.trim();

        match text.to_lowercase().as_str() {
            "/start" | "/help" => return Command::Help,
            "/top10" => return Command::Top10,
            "/trending" => return Command::Trending,
            "/pulse" => return Command::Pulse,
            "/global" => return Command::Global,
            _ => {}
        }

        let has_price_prefix = text
            .get(..PRICE_PREFIX.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(PRICE_PREFIX));
        if has_price_prefix {
            if let Some(coin) = text[PRICE_PREFIX.len()..].split_whitespace().next() {
                return Command::Price(coin.to_string());
            }
        }

        Command::Unrecognized
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Help => "help",
            Command::Top10 => "top10",
            Command::Trending => "trending",
            Command::Pulse => "pulse",
            Command::Global => "global",
            Command::Price(_) => "price",
            Command::Unrecognized => "unrecognized",
        }
    }
}

/// What happened to an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Replied,
    Ignored,
}

/// Turns inbound messages into replies: parse, fetch, format, send.
pub struct CommandDispatcher {
    market: Arc<dyn MarketData>,
    sender: Arc<dyn ReplySender>,
}

impl CommandDispatcher {
    pub fn new(market: Arc<dyn MarketData>, sender: Arc<dyn ReplySender>) -> Self {
        Self { market, sender }
    }

    /// Handle one message. Upstream failures become an apology reply; only a
    /// rejected delivery is reported back.
    pub async fn handle(&self, message: &InboundMessage) -> Result<Dispatch, DeliveryError> {
        let command = Command::parse(&message.text);
        let Some(markup_text) = self.render(&command).await else {
            debug!("Ignoring message in chat {}: {:?}", message.chat_id.0, message.text);
            return Ok(Dispatch::Ignored);
        };

        info!("Replying to /{} in chat {}", command.name(), message.chat_id.0);

        self.sender
            .send(&OutboundReply {
                chat_id: message.chat_id,
                markup_text,
            })
            .await?;

        Ok(Dispatch::Replied)
    }

    /// Webhook boundary: handle and log, never fail.
    pub async fn dispatch(&self, message: &InboundMessage) {
        if let Err(e) = self.handle(message).await {
            error!("Failed to deliver reply to chat {}: {}", message.chat_id.0, e);
        }
    }

    async fn render(&self, command: &Command) -> Option<String> {
        let text = match command {
            Command::Help => format::help(),
            Command::Global => recover(
                self.market.global_stats().await.map(|s| format::global_stats(&s)),
                "global market data",
            ),
            Command::Top10 => recover(
                self.market.top10().await.map(|rows| format::top10(&rows)),
                "top 10 data",
            ),
            Command::Trending => recover(
                self.market.trending().await.map(|items| format::trending(&items)),
                "trending coins",
            ),
            Command::Price(coin) => recover(
                self.market.search_price(coin).await.map(|detail| match detail {
                    Some(detail) => format::coin_detail(&detail),
                    None => format::coin_not_found(coin),
                }),
                "price data",
            ),
            Command::Pulse => self.pulse().await,
            Command::Unrecognized => return None,
        };
        Some(text)
    }

    async fn pulse(&self) -> String {
        let [first, second, third] = PulseSection::ALL;
        let (a, b, c) = tokio::join!(
            self.market.pulse_section(first),
            self.market.pulse_section(second),
            self.market.pulse_section(third),
        );

        format::pulse(&[(first, a), (second, b), (third, c)])
    }
}

fn recover(result: Result<String, UpstreamError>, what: &str) -> String {
    result.unwrap_or_else(|e| {
        error!("Failed to fetch {}: {}", what, e);
        format::failure(what)
    })
}
