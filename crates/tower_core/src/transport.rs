//! The seam between the session engine and the wire.
//!
//! The engine only ever talks to a [`Transport`]; the production
//! implementation is a websocket carrying one JSON-encoded event per text
//! frame.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use shared::protocol::{ClientAction, TowerEvent};
use thiserror::Error;
use tokio::{net::TcpStream, sync::Mutex};
use tokio_tungstenite::{
    connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to connect to '{url}': {source}")]
    Connect {
        url: String,
        #[source]
        source: tokio_tungstenite::tungstenite::Error,
    },
    #[error("transport is closed")]
    Closed,
    #[error("failed to encode outbound frame: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("websocket send failed: {0}")]
    Send(#[source] tokio_tungstenite::tungstenite::Error),
}

/// A named-event duplex channel to the tower service.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends one action. Implementations must serialize concurrent sends.
    async fn emit(&self, action: ClientAction) -> Result<(), TransportError>;

    /// The next decodable inbound event, or `None` once the channel has
    /// closed. Frames that fail to decode are logged and skipped, never
    /// returned as errors.
    async fn next_event(&self) -> Option<TowerEvent>;

    fn is_connected(&self) -> bool;

    async fn close(&self);
}

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsSource = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

pub struct WebSocketTransport {
    writer: Mutex<WsSink>,
    reader: Mutex<WsSource>,
    connected: AtomicBool,
}

impl WebSocketTransport {
    /// Dials the given `ws://`/`wss://` URL.
    pub async fn connect(url: &str) -> Result<Self, TransportError> {
        let (stream, _) = connect_async(url)
            .await
            .map_err(|source| TransportError::Connect {
                url: url.to_string(),
                source,
            })?;
        debug!(url, "websocket connected");
        let (writer, reader) = stream.split();
        Ok(Self {
            writer: Mutex::new(writer),
            reader: Mutex::new(reader),
            connected: AtomicBool::new(true),
        })
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn emit(&self, action: ClientAction) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::Closed);
        }
        let text = serde_json::to_string(&action).map_err(TransportError::Encode)?;
        let mut writer = self.writer.lock().await;
        writer.send(Message::Text(text)).await.map_err(|err| {
            self.connected.store(false, Ordering::SeqCst);
            TransportError::Send(err)
        })
    }

    async fn next_event(&self) -> Option<TowerEvent> {
        let mut reader = self.reader.lock().await;
        loop {
            match reader.next().await {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<TowerEvent>(&text) {
                    Ok(event) => return Some(event),
                    Err(err) => warn!(%err, "dropping undecodable frame"),
                },
                Some(Ok(Message::Close(_))) | None => {
                    self.connected.store(false, Ordering::SeqCst);
                    return None;
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    warn!(%err, "websocket receive failed");
                    self.connected.store(false, Ordering::SeqCst);
                    return None;
                }
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn close(&self) {
        self.connected.store(false, Ordering::SeqCst);
        let mut writer = self.writer.lock().await;
        let _ = writer.send(Message::Close(None)).await;
        let _ = writer.close().await;
    }
}

/// Rewrites an http(s) server URL into its websocket equivalent.
pub(crate) fn websocket_url(server_url: &str) -> Option<String> {
    if server_url.starts_with("ws://") || server_url.starts_with("wss://") {
        Some(server_url.to_string())
    } else if let Some(rest) = server_url.strip_prefix("https://") {
        Some(format!("wss://{rest}"))
    } else {
        server_url
            .strip_prefix("http://")
            .map(|rest| format!("ws://{rest}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn websocket_url_rewrites_schemes() {
        assert_eq!(
            websocket_url("https://sockets.example.com").as_deref(),
            Some("wss://sockets.example.com")
        );
        assert_eq!(
            websocket_url("http://127.0.0.1:9000").as_deref(),
            Some("ws://127.0.0.1:9000")
        );
        assert_eq!(
            websocket_url("ws://127.0.0.1:9000").as_deref(),
            Some("ws://127.0.0.1:9000")
        );
        assert_eq!(websocket_url("sockets.example.com"), None);
    }
}
