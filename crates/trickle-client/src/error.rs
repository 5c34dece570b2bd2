//! Client error types.

use std::time::Duration;

/// Error type for transport operations
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Invalid gateway endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Connect attempt timed out after {0:?}")]
    ConnectTimeout(Duration),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Connection is not open")]
    NotConnected,
}

/// Result type for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

/// Error type for the public client handle
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Gateway endpoint rejected: {0}")]
    Endpoint(#[from] TransportError),

    #[error("Client task is gone")]
    Closed,
}

/// Result type for client handle operations
pub type ClientResult<T> = Result<T, ClientError>;
