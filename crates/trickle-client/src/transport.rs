//! WebSocket transport.
//!
//! Owns the raw socket: dialing with a bearer token, sending text frames,
//! and pulling text frames off the wire. Everything protocol-shaped lives
//! in `trickle-protocol`; everything stateful lives in the controller.

use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use url::Url;

use crate::error::{TransportError, TransportResult};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Parse and validate a gateway endpoint.
///
/// Only `ws://` and `wss://` schemes are accepted.
pub fn parse_endpoint(endpoint: &str) -> TransportResult<Url> {
    let url =
        Url::parse(endpoint).map_err(|e| TransportError::InvalidEndpoint(e.to_string()))?;
    match url.scheme() {
        "ws" | "wss" => Ok(url),
        other => Err(TransportError::InvalidEndpoint(format!(
            "unsupported scheme: {other}"
        ))),
    }
}

/// Build the connection URL with the bearer token query parameter.
///
/// The gateway expects `authToken=Bearer <token>` with the separator encoded
/// as `%20`, so the query is assembled by hand rather than through a
/// serializer that would emit `+` for spaces.
#[must_use]
pub fn gateway_url(endpoint: &Url, token: &str) -> Url {
    let mut url = endpoint.clone();
    url.set_query(Some(&format!(
        "authToken=Bearer%20{}",
        urlencoding::encode(token)
    )));
    url
}

/// Send half of one live WebSocket connection
pub struct Transport {
    sink: SplitSink<WsStream, Message>,
}

/// Receive half of one live WebSocket connection
pub struct TransportReader {
    stream: SplitStream<WsStream>,
}

impl Transport {
    /// Open a connection to the gateway, bounded by `timeout`.
    pub async fn connect(
        url: &Url,
        timeout: Duration,
    ) -> TransportResult<(Self, TransportReader)> {
        let (ws, _response) = tokio::time::timeout(timeout, connect_async(url.as_str()))
            .await
            .map_err(|_| TransportError::ConnectTimeout(timeout))??;
        let (sink, stream) = ws.split();
        Ok((Self { sink }, TransportReader { stream }))
    }

    /// Send one text frame.
    pub async fn send(&mut self, text: String) -> TransportResult<()> {
        self.sink.send(Message::Text(text)).await.map_err(|e| match e {
            WsError::ConnectionClosed | WsError::AlreadyClosed => TransportError::NotConnected,
            other => TransportError::WebSocket(other),
        })
    }

    /// Close the connection without waiting for the server's reply.
    pub async fn close(mut self) {
        if let Err(e) = self.sink.close().await {
            tracing::debug!(error = %e, "WebSocket close failed");
        }
    }
}

impl TransportReader {
    /// Pull the next text frame off the wire.
    ///
    /// Control frames are handled here and never surface. Returns `None`
    /// once the server has closed the connection or the stream is exhausted.
    pub async fn next_text(&mut self) -> Option<TransportResult<String>> {
        while let Some(item) = self.stream.next().await {
            match item {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                Ok(Message::Binary(payload)) => {
                    tracing::debug!(bytes = payload.len(), "Ignoring binary frame");
                }
                Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => {}
                Ok(Message::Close(frame)) => {
                    tracing::debug!(frame = ?frame, "Server closed the connection");
                    return None;
                }
                Err(e) => return Some(Err(TransportError::WebSocket(e))),
            }
        }
        None
    }
}
