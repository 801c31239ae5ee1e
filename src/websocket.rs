//! Thin websocket client over tokio-tungstenite.
//!
//! The subscription layer drives this directly; it carries no reconnection
//! logic and no protocol awareness beyond framing.

use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use url::Url;

use crate::error::{CodexError, CodexResult};
use crate::KEEP_ALIVE_INTERVAL;

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Websocket message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WsMessage {
    /// Text message.
    Text(String),
    /// Binary message.
    Binary(Vec<u8>),
    /// Ping message.
    Ping(Vec<u8>),
    /// Pong message.
    Pong(Vec<u8>),
    /// Close message.
    Close(Option<WsCloseFrame>),
}

impl WsMessage {
    /// Create a text message.
    #[must_use]
    pub fn text(data: impl Into<String>) -> Self {
        Self::Text(data.into())
    }

    /// Check if this is a close message.
    #[must_use]
    pub const fn is_close(&self) -> bool {
        matches!(self, Self::Close(_))
    }

    /// Get text data if this is a text message.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Parse text or binary payload as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        match self {
            Self::Text(s) => serde_json::from_str(s),
            Self::Binary(b) => serde_json::from_slice(b),
            _ => Err(serde::de::Error::custom("not a data message")),
        }
    }
}

impl From<Message> for WsMessage {
    fn from(msg: Message) -> Self {
        match msg {
            Message::Text(s) => Self::Text(s.to_string()),
            Message::Binary(b) => Self::Binary(b.to_vec()),
            Message::Ping(b) => Self::Ping(b.to_vec()),
            Message::Pong(b) => Self::Pong(b.to_vec()),
            Message::Close(frame) => Self::Close(frame.map(|f| WsCloseFrame {
                code: f.code.into(),
                reason: f.reason.to_string(),
            })),
            Message::Frame(_) => Self::Binary(vec![]),
        }
    }
}

impl From<WsMessage> for Message {
    fn from(msg: WsMessage) -> Self {
        match msg {
            WsMessage::Text(s) => Self::Text(s.into()),
            WsMessage::Binary(b) => Self::Binary(b.into()),
            WsMessage::Ping(b) => Self::Ping(b.into()),
            WsMessage::Pong(b) => Self::Pong(b.into()),
            WsMessage::Close(frame) => {
                use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
                use tokio_tungstenite::tungstenite::protocol::CloseFrame;
                Self::Close(frame.map(|f| CloseFrame {
                    code: CloseCode::from(f.code),
                    reason: f.reason.into(),
                }))
            }
        }
    }
}

/// Websocket close frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WsCloseFrame {
    /// Close code.
    pub code: u16,
    /// Close reason.
    pub reason: String,
}

impl WsCloseFrame {
    /// Create a new close frame.
    #[must_use]
    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    /// Normal closure.
    #[must_use]
    pub fn normal() -> Self {
        Self::new(1000, "Normal closure")
    }
}

/// Websocket configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WsConfig {
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Keep-alive ping interval.
    pub ping_interval: Duration,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            ping_interval: KEEP_ALIVE_INTERVAL,
        }
    }
}

/// Websocket client.
#[derive(Debug, Clone)]
pub struct WsClient {
    url: String,
    config: WsConfig,
}

impl WsClient {
    /// Create a new websocket client.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            config: WsConfig::default(),
        }
    }

    /// Create with configuration.
    #[must_use]
    pub fn with_config(url: impl Into<String>, config: WsConfig) -> Self {
        Self {
            url: url.into(),
            config,
        }
    }

    /// Connect to the websocket server.
    pub async fn connect(&self) -> CodexResult<WsConnection> {
        let url = Url::parse(&self.url).map_err(|err| CodexError::Protocol {
            message: format!("invalid websocket url {:?}: {err}", self.url),
        })?;

        let connect_result =
            tokio::time::timeout(self.config.connect_timeout, connect_async(url.as_str())).await;

        let Ok(ws_result) = connect_result else {
            return Err(CodexError::Protocol {
                message: format!(
                    "websocket connect timed out after {:?}",
                    self.config.connect_timeout
                ),
            });
        };

        let (stream, _response) = ws_result.map_err(|err| CodexError::Protocol {
            message: format!("websocket connect failed: {err}"),
        })?;

        Ok(WsConnection {
            inner: stream,
            closed: false,
        })
    }

    /// Get the URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &WsConfig {
        &self.config
    }
}

/// Active websocket connection.
pub struct WsConnection {
    inner: WsStream,
    closed: bool,
}

impl WsConnection {
    /// Send a message.
    pub async fn send(&mut self, message: WsMessage) -> CodexResult<()> {
        if self.closed {
            return Err(CodexError::Protocol {
                message: "websocket connection is closed".into(),
            });
        }

        self.inner
            .send(message.into())
            .await
            .map_err(|err| CodexError::Protocol {
                message: format!("websocket send failed: {err}"),
            })
    }

    /// Serialize a value to JSON and send it as a text message.
    pub async fn send_json<T: serde::Serialize + Sync>(&mut self, data: &T) -> CodexResult<()> {
        let json = serde_json::to_string(data)?;
        self.send(WsMessage::text(json)).await
    }

    /// Receive the next message.
    pub async fn recv(&mut self) -> CodexResult<Option<WsMessage>> {
        if self.closed {
            return Ok(None);
        }

        match self.inner.next().await {
            Some(Ok(msg)) => {
                let ws_msg: WsMessage = msg.into();
                if ws_msg.is_close() {
                    self.closed = true;
                }
                Ok(Some(ws_msg))
            }
            Some(Err(err)) => Err(CodexError::Protocol {
                message: format!("websocket receive failed: {err}"),
            }),
            None => {
                self.closed = true;
                Ok(None)
            }
        }
    }

    /// Check if the connection is closed.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// Split into independently usable write and read halves.
    #[must_use]
    pub fn split(self) -> (WsWriter, WsReader) {
        let (write, read) = self.inner.split();
        (WsWriter { inner: write }, WsReader { inner: read })
    }
}

/// Write half of a split connection.
pub struct WsWriter {
    inner: SplitSink<WsStream, Message>,
}

impl WsWriter {
    /// Send a message.
    pub async fn send(&mut self, message: WsMessage) -> CodexResult<()> {
        self.inner
            .send(message.into())
            .await
            .map_err(|err| CodexError::Protocol {
                message: format!("websocket send failed: {err}"),
            })
    }

    /// Serialize a value to JSON and send it as a text message.
    pub async fn send_json<T: serde::Serialize + Sync>(&mut self, data: &T) -> CodexResult<()> {
        let json = serde_json::to_string(data)?;
        self.send(WsMessage::text(json)).await
    }

    /// Send a close frame and flush the sink.
    pub async fn close(&mut self) -> CodexResult<()> {
        self.inner.close().await.map_err(|err| CodexError::Protocol {
            message: format!("websocket close failed: {err}"),
        })
    }
}

/// Read half of a split connection.
pub struct WsReader {
    inner: SplitStream<WsStream>,
}

impl WsReader {
    /// Receive the next message; `None` once the stream ends.
    pub async fn recv(&mut self) -> CodexResult<Option<WsMessage>> {
        match self.inner.next().await {
            Some(Ok(msg)) => Ok(Some(msg.into())),
            Some(Err(err)) => Err(CodexError::Protocol {
                message: format!("websocket receive failed: {err}"),
            }),
            None => Ok(None),
        }
    }
}
