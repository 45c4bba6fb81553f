use thiserror::Error;

/// Failure talking to a market-data provider.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned {status}: {body}")]
    Status {
        endpoint: String,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("failed to decode response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },
}

/// The chat platform did not accept an outbound message.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("platform rejected message ({status}): {body}")]
    Rejected {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("failed to reach platform: {0}")]
    Transport(#[from] reqwest::Error),
}

/// An inbound update that cannot be turned into a command.
#[derive(Debug, Error, PartialEq)]
pub enum MalformedUpdate {
    #[error("update body is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("update has no message")]
    MissingMessage,

    #[error("message has no chat id")]
    MissingChatId,

    #[error("message has no text")]
    MissingText,
}
