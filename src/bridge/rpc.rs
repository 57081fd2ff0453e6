//! JSON-RPC plumbing for the driver process
//!
//! Requests and responses are newline-delimited JSON over the child's
//! stdin/stdout. Messages from the server without an `id` are notifications
//! and are forwarded on a separate channel.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use super::BridgeError;

/// JSON-RPC request
#[derive(Debug, Serialize)]
pub struct RpcRequest {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: String,
    pub params: Value,
}

/// JSON-RPC error
#[derive(Debug, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
}

/// Any message read from the server
#[derive(Debug, Deserialize)]
struct RpcIncoming {
    id: Option<u64>,
    method: Option<String>,
    #[serde(default)]
    params: Value,
    result: Option<Value>,
    error: Option<RpcError>,
}

/// Server-initiated message, e.g. `page.dialog`
#[derive(Debug, Clone, PartialEq)]
pub struct RpcNotification {
    pub method: String,
    pub params: Value,
}

pub type ResponseSender = oneshot::Sender<Result<Value, BridgeError>>;

pub type RequestSender = mpsc::Sender<(RpcRequest, ResponseSender)>;

pub type NotificationSender = mpsc::UnboundedSender<RpcNotification>;

static REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Create a new RPC request with auto-incremented ID
pub fn new_request(method: &str, params: Value) -> RpcRequest {
    RpcRequest {
        jsonrpc: "2.0",
        id: REQUEST_ID.fetch_add(1, Ordering::SeqCst),
        method: method.to_string(),
        params,
    }
}

/// Send an RPC request and wait for response
pub async fn send_request(
    request_tx: &RequestSender,
    method: &str,
    params: Value,
) -> Result<Value, BridgeError> {
    let req = new_request(method, params);
    let (tx, rx) = oneshot::channel();

    request_tx
        .send((req, tx))
        .await
        .map_err(|_| BridgeError::Disconnected)?;

    rx.await.map_err(|_| BridgeError::Disconnected)?
}

/// Spawn the background task pumping requests out and responses back in.
///
/// When the server goes away every pending request resolves to
/// `BridgeError::Disconnected`.
pub fn spawn_communication_task<W, R>(
    mut request_rx: mpsc::Receiver<(RpcRequest, ResponseSender)>,
    writer: W,
    reader: R,
    notifications: NotificationSender,
) where
    W: AsyncWrite + Unpin + Send + 'static,
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut writer = writer;
        // `next_line` keeps partial input buffered across select wakeups.
        let mut lines = BufReader::new(reader).lines();
        let mut pending: HashMap<u64, ResponseSender> = HashMap::new();

        loop {
            tokio::select! {
                request = request_rx.recv() => {
                    match request {
                        Some((req, response_tx)) => {
                            let json = match serde_json::to_string(&req) {
                                Ok(json) => json + "\n",
                                Err(e) => {
                                    let _ = response_tx.send(Err(e.into()));
                                    continue;
                                }
                            };
                            debug!("-> {} #{}", req.method, req.id);
                            if writer.write_all(json.as_bytes()).await.is_err()
                                || writer.flush().await.is_err()
                            {
                                let _ = response_tx.send(Err(BridgeError::Disconnected));
                                break;
                            }
                            pending.insert(req.id, response_tx);
                        }
                        None => break,
                    }
                }

                result = lines.next_line() => {
                    match result {
                        Ok(Some(line)) => dispatch(&line, &mut pending, &notifications),
                        Ok(None) | Err(_) => break,
                    }
                }
            }
        }

        for (_, tx) in pending.drain() {
            let _ = tx.send(Err(BridgeError::Disconnected));
        }
    });
}

fn dispatch(
    line: &str,
    pending: &mut HashMap<u64, ResponseSender>,
    notifications: &NotificationSender,
) {
    let message = match serde_json::from_str::<RpcIncoming>(line) {
        Ok(message) => message,
        Err(e) => {
            warn!("Ignoring unparseable driver output: {}", e);
            return;
        }
    };

    match (message.id, message.method) {
        (Some(id), _) => {
            if let Some(tx) = pending.remove(&id) {
                let result = match message.error {
                    Some(err) => Err(BridgeError::ServerError(format!(
                        "[{}] {}",
                        err.code, err.message
                    ))),
                    None => Ok(message.result.unwrap_or(Value::Null)),
                };
                let _ = tx.send(result);
            }
        }
        (None, Some(method)) => {
            debug!("<- notification {}", method);
            let _ = notifications.send(RpcNotification {
                method,
                params: message.params,
            });
        }
        (None, None) => warn!("Driver message has neither id nor method"),
    }
}
