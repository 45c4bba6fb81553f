use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use teloxide::prelude::*;
use teloxide::types::{ChatId, ParseMode};
use tracing::{debug, info, warn};

use crate::dispatch::CommandDispatcher;
use crate::error::DeliveryError;
use crate::platform::{InboundMessage, OutboundReply, ReplySender};

/// Telegram rejects messages over 4096 chars; keep some headroom.
const MAX_MESSAGE_LEN: usize = 4000;

/// Split long MarkdownV2 text at line breaks. A line that is longer than
/// `max_len` on its own is cut at a char boundary, never right after a `\`.
fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();

    for line in text.split_inclusive('\n') {
        if !current.is_empty() && current.len() + line.len() > max_len {
            chunks.push(std::mem::take(&mut current));
        }

        let mut rest = line;
        while rest.len() > max_len {
            let mut end = max_len;
            while end > 0 && !rest.is_char_boundary(end) {
                end -= 1;
            }
            while end > 1 && rest[..end].ends_with('\\') {
                end -= 1;
            }
            chunks.push(rest[..end].to_string());
            rest = &rest[end..];
        }
        current.push_str(rest);
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    chat_id: ChatId,
    text: &'a str,
    parse_mode: ParseMode,
}

/// Sends replies through the Bot API `sendMessage` method.
pub struct TelegramSender {
    client: reqwest::Client,
    endpoint: String,
}

impl TelegramSender {
    pub fn new(client: reqwest::Client, api_base_url: &str, bot_token: &str) -> Self {
        Self {
            client,
            endpoint: format!(
                "{}/bot{}/sendMessage",
                api_base_url.trim_end_matches('/'),
                bot_token
            ),
        }
    }
}

#[async_trait]
impl ReplySender for TelegramSender {
    async fn send(&self, reply: &OutboundReply) -> Result<(), DeliveryError> {
        for chunk in split_message(&reply.markup_text, MAX_MESSAGE_LEN) {
            let request = SendMessageRequest {
                chat_id: reply.chat_id,
                text: &chunk,
                parse_mode: ParseMode::MarkdownV2,
            };

            // The endpoint carries the bot token; keep it out of error messages.
            let response = self
                .client
                .post(&self.endpoint)
                .json(&request)
                .send()
                .await
                .map_err(|e| DeliveryError::Transport(e.without_url()))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(DeliveryError::Rejected { status, body });
            }
        }

        debug!("Delivered reply to chat {}", reply.chat_id.0);
        Ok(())
    }
}

/// Run the bot with long polling instead of a webhook.
pub async fn run_polling(bot: Bot, dispatcher: Arc<CommandDispatcher>) {
    info!("Starting Telegram long polling...");

    let handler = Update::filter_message().endpoint(handle_message);

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![dispatcher])
        .default_handler(|upd| async move {
            warn!("Unhandled update: {:?}", upd.id);
        })
        .error_handler(LoggingErrorHandler::with_custom_text("telegram"))
        .build()
        .dispatch()
        .await;
}

async fn handle_message(msg: Message, dispatcher: Arc<CommandDispatcher>) -> ResponseResult<()> {
    let text = match msg.text() {
        Some(t) => t.to_string(),
        None => return Ok(()),
    };

    let inbound = InboundMessage {
        chat_id: msg.chat.id,
        text,
    };
    dispatcher.dispatch(&inbound).await;

    Ok(())
}
