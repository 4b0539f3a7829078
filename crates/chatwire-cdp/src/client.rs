//! CDP (Chrome DevTools Protocol) WebSocket client.
//!
//! Speaks the JSON-RPC dialect DevTools uses over its per-target WebSocket:
//! commands carry an auto-incrementing `id` and are correlated back to the
//! caller. Messages without an `id` are unsolicited events; nothing here
//! subscribes to a domain, so they are logged at trace level and dropped
//! rather than queued.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{oneshot, Mutex};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::error::CdpError;

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsSource = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Reply to a single command.
#[derive(Debug, Clone)]
pub struct Reply {
    pub id: u64,
    pub result: Option<Value>,
    pub error: Option<ReplyError>,
}

/// Error object inside a reply.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ReplyError {
    pub code: i64,
    pub message: String,
}

/// Unsolicited event from the browser.
#[derive(Debug, Clone)]
pub struct Event {
    pub method: String,
    pub params: Value,
}

/// A classified incoming DevTools message.
#[derive(Debug, Clone)]
pub enum Incoming {
    Reply(Reply),
    Event(Event),
}

/// Classify one incoming JSON message. Returns `None` for frames that are
/// neither a reply (`id`) nor an event (`method`).
pub fn classify_message(json: &Value) -> Option<Incoming> {
    if let Some(id) = json.get("id").and_then(Value::as_u64) {
        return Some(Incoming::Reply(Reply {
            id,
            result: json.get("result").cloned(),
            error: json
                .get("error")
                .and_then(|e| serde_json::from_value(e.clone()).ok()),
        }));
    }
    let method = json.get("method")?.as_str()?.to_string();
    Some(Incoming::Event(Event {
        method,
        params: json.get("params").cloned().unwrap_or(Value::Null),
    }))
}

/// Serialize an outgoing command frame.
pub fn command_frame(id: u64, method: &str, params: &Value) -> String {
    serde_json::json!({ "id": id, "method": method, "params": params }).to_string()
}

/// WebSocket client for one DevTools page target.
///
/// A background task owns the read half and routes replies to pending
/// callers; the write half is shared behind a mutex.
pub struct CdpClient {
    seq: AtomicU64,
    sink: Arc<Mutex<WsSink>>,
    pending: Arc<Mutex<HashMap<u64, oneshot::Sender<Reply>>>>,
    _router: tokio::task::JoinHandle<()>,
}

impl CdpClient {
    /// Connect to a page target WebSocket
    /// (`ws://127.0.0.1:{port}/devtools/page/{target}`).
    pub async fn connect(ws_url: &str) -> Result<Self, CdpError> {
        let (stream, _) = tokio_tungstenite::connect_async(ws_url)
            .await
            .map_err(|e| CdpError::Connect {
                url: ws_url.to_string(),
                reason: e.to_string(),
            })?;
        tracing::debug!(url = ws_url, "DevTools WebSocket connected");

        let (sink, source) = stream.split();
        let pending: Arc<Mutex<HashMap<u64, oneshot::Sender<Reply>>>> =
            Arc::new(Mutex::new(HashMap::new()));

        let router = tokio::spawn(Self::route(source, Arc::clone(&pending)));

        Ok(Self {
            seq: AtomicU64::new(1),
            sink: Arc::new(Mutex::new(sink)),
            pending,
            _router: router,
        })
    }

    /// Send a command and wait for its reply with the default timeout.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value, CdpError> {
        self.call_with_timeout(method, params, DEFAULT_COMMAND_TIMEOUT)
            .await
    }

    /// Send a command and wait for its reply.
    pub async fn call_with_timeout(
        &self,
        method: &str,
        params: Value,
        timeout: Duration,
    ) -> Result<Value, CdpError> {
        let id = self.seq.fetch_add(1, Ordering::SeqCst);
        let frame = command_frame(id, method, &params);
        tracing::trace!(id, method, "CDP call");

        // Register before sending so a fast reply cannot race the insert.
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        self.sink
            .lock()
            .await
            .send(Message::Text(frame.into()))
            .await
            .map_err(|e| CdpError::Protocol(format!("WebSocket send failed: {e}")))?;

        let reply = tokio::time::timeout(timeout, rx)
            .await
            .map_err(|_| CdpError::CommandTimeout {
                method: method.to_string(),
                waited: timeout,
            })?
            .map_err(|_| CdpError::Protocol("reply channel closed".into()))?;

        if let Some(err) = reply.error {
            return Err(CdpError::Devtools {
                code: err.code,
                message: err.message,
            });
        }
        Ok(reply.result.unwrap_or(Value::Null))
    }

    async fn route(
        mut source: WsSource,
        pending: Arc<Mutex<HashMap<u64, oneshot::Sender<Reply>>>>,
    ) {
        while let Some(frame) = source.next().await {
            let text = match frame {
                Ok(Message::Text(t)) => t.to_string(),
                Ok(Message::Close(_)) => {
                    tracing::debug!("DevTools WebSocket closed by browser");
                    break;
                }
                Ok(_) => continue,
                Err(e) => {
                    tracing::warn!(error = %e, "DevTools WebSocket read failed");
                    break;
                }
            };

            let json: Value = match serde_json::from_str(&text) {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!(error = %e, "unparseable DevTools frame");
                    continue;
                }
            };

            match classify_message(&json) {
                Some(Incoming::Reply(reply)) => {
                    if let Some(tx) = pending.lock().await.remove(&reply.id) {
                        let _ = tx.send(reply);
                    }
                }
                Some(Incoming::Event(event)) => {
                    tracing::trace!(method = %event.method, "browser event dropped");
                }
                None => {}
            }
        }

        // Fail any callers still waiting once the connection is gone.
        for (id, tx) in pending.lock().await.drain() {
            let _ = tx.send(Reply {
                id,
                result: None,
                error: Some(ReplyError {
                    code: -1,
                    message: "WebSocket connection closed".into(),
                }),
            });
        }
    }
}
