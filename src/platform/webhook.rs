use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use teloxide::types::ChatId;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::dispatch::CommandDispatcher;
use crate::error::MalformedUpdate;
use crate::platform::InboundMessage;

const SECRET_TOKEN_HEADER: &str = "x-telegram-bot-api-secret-token";

// Only the fields the bot reads; everything else in the update is ignored.

#[derive(Deserialize)]
struct RawUpdate {
    message: Option<RawMessage>,
}

#[derive(Deserialize)]
struct RawMessage {
    chat: Option<RawChat>,
    text: Option<String>,
}

#[derive(Deserialize)]
struct RawChat {
    id: Option<ChatId>,
}

/// Extract `message.chat.id` and `message.text` from a webhook body.
pub fn parse_update(body: &[u8]) -> Result<InboundMessage, MalformedUpdate> {
    let update: RawUpdate = serde_json::from_slice(body)
        .map_err(|e| MalformedUpdate::InvalidJson(e.to_string()))?;

    let message = update.message.ok_or(MalformedUpdate::MissingMessage)?;
    let chat_id = message
        .chat
        .and_then(|chat| chat.id)
        .ok_or(MalformedUpdate::MissingChatId)?;
    let text = message.text.ok_or(MalformedUpdate::MissingText)?;

    Ok(InboundMessage { chat_id, text })
}

#[derive(Clone)]
struct WebhookState {
    dispatcher: Arc<CommandDispatcher>,
    secret_token: Option<String>,
}

async fn health() -> &'static str {
    "ok"
}

/// Acknowledge immediately; the reply is produced in the background.
async fn receive_update(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    if let Some(expected) = &state.secret_token {
        let provided = headers
            .get(SECRET_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok());
        if provided != Some(expected.as_str()) {
            warn!("Rejecting webhook call with missing or wrong secret token");
            return StatusCode::UNAUTHORIZED;
        }
    }

    match parse_update(&body) {
        Ok(inbound) => {
            let dispatcher = state.dispatcher.clone();
            tokio::spawn(async move {
                dispatcher.dispatch(&inbound).await;
            });
        }
        Err(e) => debug!("Dropping update: {}", e),
    }

    StatusCode::OK
}

fn router(webhook_path: &str, state: WebhookState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(webhook_path, post(receive_update))
        .with_state(state)
}

/// Serve the webhook endpoint until Ctrl-C.
pub async fn serve(config: &ServerConfig, dispatcher: Arc<CommandDispatcher>) -> Result<()> {
    let state = WebhookState {
        dispatcher,
        secret_token: config.secret_token.clone(),
    };
    let app = router(&config.webhook_path, state);

    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_address))?;

    info!(
        "Webhook listening on {}{}",
        config.bind_address, config.webhook_path
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down webhook server");
        })
        .await
        .context("Server error")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::testing::{FakeMarket, RecordingSender};
    use std::time::Duration;

    fn state(sender: Arc<RecordingSender>, secret_token: Option<&str>) -> WebhookState {
        WebhookState {
            dispatcher: Arc::new(CommandDispatcher::new(
                Arc::new(FakeMarket::default()),
                sender,
            )),
            secret_token: secret_token.map(str::to_string),
        }
    }

    async fn wait_for_replies(sender: &RecordingSender, count: usize) {
        for _ in 0..100 {
            if sender.replies().len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    #[test]
    fn test_parse_full_update() {
        let body = br#"{
            "update_id": 1,
            "message": {
                "message_id": 7,
                "date": 1700000000,
                "chat": {"id": 123456, "type": "private"},
                "from": {"id": 1, "is_bot": false, "first_name": "A"},
                "text": "/top10"
            }
        }"#;
        let inbound = parse_update(body).unwrap();
        assert_eq!(inbound.chat_id, ChatId(123456));
        assert_eq!(inbound.text, "/top10");
    }

    #[test]
    fn test_parse_missing_pieces() {
        assert_eq!(
            parse_update(br#"{"update_id": 1}"#),
            Err(MalformedUpdate::MissingMessage)
        );
        assert_eq!(
            parse_update(br#"{"message": {"text": "/help"}}"#),
            Err(MalformedUpdate::MissingChatId)
        );
        assert_eq!(
            parse_update(br#"{"message": {"chat": {"id": 5}, "photo": []}}"#),
            Err(MalformedUpdate::MissingText)
        );
        assert!(matches!(
            parse_update(b"not json"),
            Err(MalformedUpdate::InvalidJson(_))
        ));
    }

    #[tokio::test]
    async fn test_message_without_text_sends_nothing() {
        let sender = Arc::new(RecordingSender::default());
        let status = receive_update(
            State(state(sender.clone(), None)),
            HeaderMap::new(),
            Bytes::from_static(br#"{"message": {"chat": {"id": 5}}}"#),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(sender.replies().is_empty());
    }

    #[tokio::test]
    async fn test_valid_update_is_acknowledged_and_dispatched() {
        let sender = Arc::new(RecordingSender::default());
        let status = receive_update(
            State(state(sender.clone(), None)),
            HeaderMap::new(),
            Bytes::from_static(br#"{"message": {"chat": {"id": 5}, "text": "/help"}}"#),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        wait_for_replies(&sender, 1).await;
        let replies = sender.replies();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].chat_id, ChatId(5));
    }

    #[tokio::test]
    async fn test_delivery_failure_still_acknowledged() {
        let sender = Arc::new(RecordingSender {
            reject: true,
            ..Default::default()
        });
        let status = receive_update(
            State(state(sender.clone(), None)),
            HeaderMap::new(),
            Bytes::from_static(br#"{"message": {"chat": {"id": 5}, "text": "/start"}}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_secret_token_checked() {
        let sender = Arc::new(RecordingSender::default());
        let body = br#"{"message": {"chat": {"id": 5}, "text": "/help"}}"#;

        let status = receive_update(
            State(state(sender.clone(), Some("s3cret"))),
            HeaderMap::new(),
            Bytes::from_static(body),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let mut headers = HeaderMap::new();
        headers.insert(SECRET_TOKEN_HEADER, "s3cret".parse().unwrap());
        let status = receive_update(
            State(state(sender.clone(), Some("s3cret"))),
            headers,
            Bytes::from_static(body),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        wait_for_replies(&sender, 1).await;
        assert_eq!(sender.replies().len(), 1);
    }
}
