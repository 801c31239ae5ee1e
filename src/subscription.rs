//! GraphQL over websocket subscriptions (graphql-transport-ws).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tokio::time::{interval_at, Instant};
use tracing::debug;

use crate::error::{CodexError, CodexResult, GraphqlError};
use crate::operation::GraphqlResponse;
use crate::websocket::{WsClient, WsConfig, WsMessage, WsReader, WsWriter};

/// graphql-transport-ws frame.
#[derive(Debug, Serialize, Deserialize)]
struct TransportWsMessage {
    #[serde(rename = "type")]
    message_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    payload: Option<serde_json::Value>,
}

impl TransportWsMessage {
    fn new(message_type: &str, id: Option<String>, payload: Option<serde_json::Value>) -> Self {
        Self {
            message_type: message_type.to_string(),
            id,
            payload,
        }
    }
}

/// Receives subscription events.
///
/// One of `error` or `complete` is the terminal callback for
/// server-initiated shutdown; neither fires when the caller cancels via
/// [`SubscriptionHandle::unsubscribe`].
pub trait SubscriptionSink<T>: Send + 'static {
    /// A `next` payload arrived.
    fn next(&mut self, response: GraphqlResponse<T>);
    /// The subscription failed; no further events follow.
    fn error(&mut self, error: CodexError);
    /// The server completed the subscription; no further events follow.
    fn complete(&mut self);
}

/// Subscription client configuration.
#[derive(Debug, Clone)]
pub struct SubscriptionConfig {
    /// Websocket configuration.
    pub ws: WsConfig,
    /// Initial payload for `connection_init` (connection params).
    pub init_payload: Option<serde_json::Value>,
    /// Time to wait for `connection_ack`.
    pub ack_timeout: Duration,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            ws: WsConfig::default(),
            init_payload: None,
            ack_timeout: Duration::from_secs(10),
        }
    }
}

/// Cleanup capability for an active subscription.
///
/// `unsubscribe` is idempotent; calls after the first are no-ops. Dropping
/// the handle does NOT cancel the subscription.
#[derive(Debug, Clone)]
pub struct SubscriptionHandle {
    cancel: Arc<Mutex<Option<oneshot::Sender<()>>>>,
    active: Arc<AtomicBool>,
}

impl SubscriptionHandle {
    fn new(cancel: oneshot::Sender<()>) -> Self {
        Self {
            cancel: Arc::new(Mutex::new(Some(cancel))),
            active: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Terminate the subscription and release the underlying stream.
    pub fn unsubscribe(&self) {
        if let Ok(mut guard) = self.cancel.lock() {
            if let Some(tx) = guard.take() {
                let _ = tx.send(());
            }
        }
    }

    /// Whether events are still being delivered.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

/// GraphQL subscription client.
///
/// Each `subscribe` call dials its own websocket connection, performs the
/// graphql-transport-ws handshake, and spawns a delivery task that feeds
/// the caller's sink until the server completes, an error arrives, or the
/// subscription is cancelled.
#[derive(Debug)]
pub struct SubscriptionClient {
    url: String,
    config: SubscriptionConfig,
    active: Arc<Mutex<HashMap<u64, SubscriptionHandle>>>,
    next_id: AtomicU64,
}

impl SubscriptionClient {
    /// Create a new subscription client.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_config(url, SubscriptionConfig::default())
    }

    /// Create with configuration.
    #[must_use]
    pub fn with_config(url: impl Into<String>, config: SubscriptionConfig) -> Self {
        Self {
            url: url.into(),
            config,
            active: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
        }
    }

    /// Subscribe to a GraphQL operation.
    ///
    /// Connects, handshakes, and forwards `{query, variables}`; events are
    /// delivered to `sink` from a background task. The returned handle
    /// cancels the subscription.
    pub async fn subscribe<T, S>(
        &self,
        query: impl Into<String>,
        variables: serde_json::Value,
        sink: S,
    ) -> CodexResult<SubscriptionHandle>
    where
        T: DeserializeOwned + Send + 'static,
        S: SubscriptionSink<T>,
    {
        let client = WsClient::with_config(self.url.clone(), self.config.ws.clone());
        let mut connection = client.connect().await?;

        let init = TransportWsMessage::new("connection_init", None, self.config.init_payload.clone());
        connection.send_json(&init).await?;

        let ack = tokio::time::timeout(self.config.ack_timeout, connection.recv()).await;
        match ack {
            Ok(Ok(Some(message))) => {
                let ack_msg: TransportWsMessage = decode_frame(&message)?;
                if ack_msg.message_type != "connection_ack" {
                    return Err(CodexError::Protocol {
                        message: format!("expected connection_ack, got {}", ack_msg.message_type),
                    });
                }
            }
            Ok(Ok(None)) => {
                return Err(CodexError::Protocol {
                    message: "connection closed before ack".to_string(),
                });
            }
            Ok(Err(err)) => return Err(err),
            Err(_) => {
                return Err(CodexError::Protocol {
                    message: "connection_ack timeout".to_string(),
                });
            }
        }

        let key = self.next_id.fetch_add(1, Ordering::Relaxed);
        let id = key.to_string();
        let query: String = query.into();
        let payload = serde_json::json!({
            "query": query,
            "variables": variables,
        });
        let subscribe = TransportWsMessage::new("subscribe", Some(id.clone()), Some(payload));
        connection.send_json(&subscribe).await?;

        let (cancel_tx, cancel_rx) = oneshot::channel();
        let handle = SubscriptionHandle::new(cancel_tx);
        if let Ok(mut guard) = self.active.lock() {
            guard.insert(key, handle.clone());
        }

        let registry = Arc::clone(&self.active);
        let active = Arc::clone(&handle.active);
        let ping_interval = self.config.ws.ping_interval;
        let (writer, reader) = connection.split();
        tokio::spawn(async move {
            run_subscription(writer, reader, id, sink, cancel_rx, ping_interval).await;
            active.store(false, Ordering::SeqCst);
            if let Ok(mut guard) = registry.lock() {
                guard.remove(&key);
            }
        });

        Ok(handle)
    }

    /// Cancel every active subscription. Safe to call repeatedly.
    pub fn dispose(&self) {
        let handles: Vec<SubscriptionHandle> = match self.active.lock() {
            Ok(guard) => guard.values().cloned().collect(),
            Err(_) => return,
        };
        debug!(count = handles.len(), "disposing active subscriptions");
        for handle in handles {
            handle.unsubscribe();
        }
    }

    /// Get the URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

async fn run_subscription<T, S>(
    mut writer: WsWriter,
    mut reader: WsReader,
    id: String,
    mut sink: S,
    mut cancel_rx: oneshot::Receiver<()>,
    ping_interval: Duration,
) where
    T: DeserializeOwned + Send + 'static,
    S: SubscriptionSink<T>,
{
    let mut ping = interval_at(Instant::now() + ping_interval, ping_interval);

    loop {
        tokio::select! {
            _ = &mut cancel_rx => {
                let complete = TransportWsMessage::new("complete", Some(id.clone()), None);
                let _ = writer.send_json(&complete).await;
                let _ = writer.close().await;
                break;
            }
            _ = ping.tick() => {
                let frame = TransportWsMessage::new("ping", None, None);
                if writer.send_json(&frame).await.is_err() {
                    sink.error(CodexError::Protocol {
                        message: "connection lost during keep-alive".to_string(),
                    });
                    break;
                }
            }
            message = reader.recv() => {
                match message {
                    Ok(Some(WsMessage::Ping(payload))) => {
                        let _ = writer.send(WsMessage::Pong(payload)).await;
                    }
                    Ok(Some(WsMessage::Pong(_))) => {}
                    Ok(Some(WsMessage::Close(_))) | Ok(None) => {
                        sink.error(CodexError::Protocol {
                            message: "connection closed before complete".to_string(),
                        });
                        break;
                    }
                    Ok(Some(message)) => {
                        if route_frame::<T, S>(&message, &mut writer, &mut sink).await {
                            break;
                        }
                    }
                    Err(err) => {
                        sink.error(err);
                        break;
                    }
                }
            }
        }
    }
}

/// Route a data frame to the sink. Returns `true` when the subscription is
/// finished.
async fn route_frame<T, S>(message: &WsMessage, writer: &mut WsWriter, sink: &mut S) -> bool
where
    T: DeserializeOwned + Send + 'static,
    S: SubscriptionSink<T>,
{
    let frame: TransportWsMessage = match decode_frame(message) {
        Ok(frame) => frame,
        Err(err) => {
            sink.error(err);
            return true;
        }
    };

    match frame.message_type.as_str() {
        "next" => {
            let Some(payload) = frame.payload else {
                return false;
            };
            match serde_json::from_value::<GraphqlResponse<T>>(payload) {
                Ok(response) => {
                    sink.next(response);
                    false
                }
                Err(err) => {
                    sink.error(CodexError::Json(err.to_string()));
                    true
                }
            }
        }
        "error" => {
            let errors = frame
                .payload
                .and_then(|value| {
                    if value.is_array() {
                        serde_json::from_value::<Vec<GraphqlError>>(value).ok()
                    } else {
                        serde_json::from_value::<GraphqlError>(value)
                            .ok()
                            .map(|err| vec![err])
                    }
                })
                .unwrap_or_default();
            sink.error(CodexError::GraphqlErrors { errors });
            true
        }
        "complete" => {
            sink.complete();
            true
        }
        "ping" => {
            let pong = TransportWsMessage::new("pong", frame.id, frame.payload);
            let _ = writer.send_json(&pong).await;
            false
        }
        "pong" => false,
        other => {
            sink.error(CodexError::Protocol {
                message: format!("unexpected websocket message: {other}"),
            });
            true
        }
    }
}

fn decode_frame(message: &WsMessage) -> CodexResult<TransportWsMessage> {
    match message {
        WsMessage::Text(_) | WsMessage::Binary(_) => message
            .json()
            .map_err(|err| CodexError::Json(err.to_string())),
        WsMessage::Ping(_) | WsMessage::Pong(_) => Err(CodexError::Protocol {
            message: "unexpected websocket ping/pong".to_string(),
        }),
        WsMessage::Close(_) => Err(CodexError::Protocol {
            message: "websocket closed".to_string(),
        }),
    }
}
