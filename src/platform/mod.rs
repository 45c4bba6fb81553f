pub mod telegram;
pub mod webhook;

use async_trait::async_trait;
use teloxide::types::ChatId;

use crate::error::DeliveryError;

/// A text message received from the chat platform.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub chat_id: ChatId,
    pub text: String,
}

/// A MarkdownV2 reply ready to be delivered.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundReply {
    pub chat_id: ChatId,
    pub markup_text: String,
}

/// Delivers replies to the chat platform.
#[async_trait]
pub trait ReplySender: Send + Sync {
    async fn send(&self, reply: &OutboundReply) -> Result<(), DeliveryError>;
}
