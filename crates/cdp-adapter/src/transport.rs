use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::error::{AdapterError, AdapterErrorKind};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type PendingTx = oneshot::Sender<Result<Value, AdapterError>>;

/// Sends one DevTools command to the attached page and returns its `result`.
#[async_trait]
pub trait CdpTransport: Send + Sync {
    async fn send_command(&self, method: &str, params: Value) -> Result<Value, AdapterError>;
}

struct CdpCommand {
    method: String,
    params: Value,
    response_tx: PendingTx,
}

/// Websocket connection to one page target.
pub struct WsTransport {
    cmd_tx: mpsc::Sender<CdpCommand>,
    timeout: Duration,
    handler: JoinHandle<()>,
}

impl WsTransport {
    pub async fn connect(ws_url: &str, timeout: Duration) -> Result<Self, AdapterError> {
        let (ws, _) = connect_async(ws_url).await.map_err(|err| {
            AdapterError::new(AdapterErrorKind::CdpIo).with_hint(format!("connect {ws_url}: {err}"))
        })?;
        info!(%ws_url, "DevTools session attached");

        let (cmd_tx, cmd_rx) = mpsc::channel::<CdpCommand>(64);
        let handler = tokio::spawn(handler_loop(ws, cmd_rx));
        Ok(Self {
            cmd_tx,
            timeout,
            handler,
        })
    }
}

impl Drop for WsTransport {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

#[async_trait]
impl CdpTransport for WsTransport {
    async fn send_command(&self, method: &str, params: Value) -> Result<Value, AdapterError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(CdpCommand {
                method: method.to_string(),
                params,
                response_tx: tx,
            })
            .await
            .map_err(|_| AdapterError::new(AdapterErrorKind::CdpIo).with_hint("session closed"))?;

        tokio::time::timeout(self.timeout, rx)
            .await
            .map_err(|_| {
                AdapterError::new(AdapterErrorKind::Timeout)
                    .with_hint(format!("{method} after {}ms", self.timeout.as_millis()))
            })?
            .map_err(|_| AdapterError::new(AdapterErrorKind::CdpIo).with_hint("response dropped"))?
    }
}

/// Routes commands out and responses back by id. Protocol events are ignored.
async fn handler_loop(ws: WsStream, mut cmd_rx: mpsc::Receiver<CdpCommand>) {
    let (mut ws_tx, mut ws_rx) = ws.split();
    let mut pending: HashMap<u64, PendingTx> = HashMap::new();
    let mut next_id: u64 = 1;

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                let Some(cmd) = cmd else { break };
                let id = next_id;
                next_id += 1;
                let frame = json!({
                    "id": id,
                    "method": cmd.method,
                    "params": cmd.params,
                });
                pending.insert(id, cmd.response_tx);
                if let Err(err) = ws_tx.send(Message::Text(frame.to_string().into())).await {
                    warn!(%err, "DevTools write failed");
                    break;
                }
            }
            msg = ws_rx.next() => {
                let Some(Ok(msg)) = msg else { break };
                let Message::Text(text) = msg else { continue };
                let Ok(value) = serde_json::from_str::<Value>(text.as_str()) else {
                    continue;
                };
                let Some(id) = value.get("id").and_then(Value::as_u64) else {
                    continue;
                };
                if let Some(tx) = pending.remove(&id) {
                    let _ = tx.send(response_result(value));
                }
            }
        }
    }

    debug!(pending = pending.len(), "DevTools session closed");
    for (_, tx) in pending.drain() {
        let _ = tx.send(Err(
            AdapterError::new(AdapterErrorKind::CdpIo).with_hint("session closed")
        ));
    }
}

fn response_result(mut response: Value) -> Result<Value, AdapterError> {
    if let Some(error) = response.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("CDP error");
        return Err(AdapterError::new(AdapterErrorKind::CdpIo).with_hint(message));
    }
    Ok(response
        .get_mut("result")
        .map(Value::take)
        .unwrap_or(Value::Null))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_errors_carry_message() {
        let err = response_result(json!({"id": 1, "error": {"code": -32000, "message": "No node"}}))
            .unwrap_err();
        assert_eq!(err.kind, AdapterErrorKind::CdpIo);
        assert_eq!(err.hint.as_deref(), Some("No node"));
    }

    #[test]
    fn result_is_unwrapped() {
        let value = response_result(json!({"id": 2, "result": {"data": "abc"}})).unwrap();
        assert_eq!(value["data"], "abc");
        assert!(response_result(json!({"id": 3})).unwrap().is_null());
    }
}
