use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use cartpilot_core_types::ToolCallResult;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::{
    config::ChannelConfig,
    envelope::{Envelope, OutboundFrame, TurnMessage},
    errors::ChannelError,
    handlers::{HandlerId, HandlerRegistry},
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Liveness of the channel as seen by callers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConnectionState {
    pub connected: bool,
    pub last_error: Option<String>,
}

struct Link {
    outbound: mpsc::UnboundedSender<Message>,
    task: JoinHandle<()>,
}

/// Persistent connection to the assistant.
///
/// Delivery is at most once per attempt: nothing queued before a disconnect is
/// replayed after reconnecting.
pub struct ChannelClient {
    config: ChannelConfig,
    handlers: Arc<HandlerRegistry>,
    state: Arc<watch::Sender<ConnectionState>>,
    link: Mutex<Option<Link>>,
    /// Bumped on every connect and disconnect so a finished socket task only
    /// reports on its own connection.
    generation: Arc<AtomicU64>,
    connecting: tokio::sync::Mutex<()>,
}

impl ChannelClient {
    pub fn new(config: ChannelConfig) -> Self {
        let (state, _) = watch::channel(ConnectionState::default());
        Self {
            config,
            handlers: Arc::new(HandlerRegistry::new()),
            state: Arc::new(state),
            link: Mutex::new(None),
            generation: Arc::new(AtomicU64::new(0)),
            connecting: tokio::sync::Mutex::new(()),
        }
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    pub fn state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.state.borrow().connected
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub fn handlers(&self) -> &Arc<HandlerRegistry> {
        &self.handlers
    }

    pub fn on_event<F>(&self, event: &str, handler: F) -> HandlerId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.handlers.on(event, handler)
    }

    pub fn off(&self, event: &str, id: HandlerId) -> bool {
        self.handlers.off(event, id)
    }

    /// Open the websocket. Does nothing if already connected.
    pub async fn connect(&self) -> Result<(), ChannelError> {
        let _connecting = self.connecting.lock().await;
        if self.is_connected() {
            return Ok(());
        }

        let url = self.config.ws_url.clone();
        info!(target: "channel", %url, "Connecting");
        let attempt = tokio::time::timeout(self.config.connect_timeout(), connect_async(url.as_str()));
        let ws = match attempt.await {
            Ok(Ok((ws, _response))) => ws,
            Ok(Err(err)) => {
                let err = ChannelError::Connect {
                    url,
                    reason: err.to_string(),
                };
                self.record_failure(&err);
                return Err(err);
            }
            Err(_) => {
                let err = ChannelError::ConnectTimeout {
                    url,
                    timeout_ms: self.config.connect_timeout_ms,
                };
                self.record_failure(&err);
                return Err(err);
            }
        };

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_socket(
            ws,
            outbound_rx,
            Arc::clone(&self.handlers),
            Arc::clone(&self.state),
            generation,
            Arc::clone(&self.generation),
        ));

        if let Some(stale) = self.link.lock().replace(Link { outbound, task }) {
            stale.task.abort();
        }
        self.state.send_replace(ConnectionState {
            connected: true,
            last_error: None,
        });
        info!(target: "channel", "Connected");
        Ok(())
    }

    /// Close the websocket and wait for the socket task to finish.
    pub async fn disconnect(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let link = self.link.lock().take();
        if let Some(link) = link {
            let _ = link.outbound.send(Message::Close(None));
            drop(link.outbound);
            if let Err(err) = link.task.await {
                debug!(target: "channel", %err, "Socket task ended abnormally");
            }
            info!(target: "channel", "Disconnected");
        }
        self.state.send_replace(ConnectionState::default());
    }

    fn record_failure(&self, err: &ChannelError) {
        warn!(target: "channel", %err, "Channel unavailable");
        self.state.send_replace(ConnectionState {
            connected: false,
            last_error: Some(err.to_string()),
        });
    }

    fn send_message(&self, message: Message) -> Result<(), ChannelError> {
        if !self.is_connected() {
            return Err(ChannelError::NotConnected);
        }
        let link = self.link.lock();
        let link = link.as_ref().ok_or(ChannelError::NotConnected)?;
        link.outbound
            .send(message)
            .map_err(|_| ChannelError::Transport("socket writer closed".to_string()))
    }

    /// Emit a user turn. Returns whether the transport accepted it, not
    /// whether the assistant processed it.
    pub fn send_turn(&self, turn: &TurnMessage) -> bool {
        let frame = match turn.encode(self.config.binary_frames) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(target: "channel", %err, "Could not encode turn");
                return false;
            }
        };
        let message = match frame {
            OutboundFrame::Text(text) => Message::Text(text.into()),
            OutboundFrame::Binary(bytes) => Message::Binary(bytes.into()),
        };
        match self.send_message(message) {
            Ok(()) => {
                debug!(
                    target: "channel",
                    thread_id = %turn.thread_id,
                    has_image = turn.image.is_some(),
                    "Turn sent"
                );
                true
            }
            Err(err) => {
                warn!(target: "channel", %err, "Turn not sent");
                false
            }
        }
    }

    pub fn send_event(&self, event: &str, data: Value) -> Result<(), ChannelError> {
        let text = Envelope::new(event, data).to_text()?;
        self.send_message(Message::Text(text.into()))?;
        debug!(target: "channel", event, "Event sent");
        Ok(())
    }

    pub fn send_tool_result(&self, result: &ToolCallResult) -> Result<(), ChannelError> {
        let data = serde_json::to_value(result.to_wire())?;
        self.send_event(&self.config.tool_result_event, data)
    }
}

impl Drop for ChannelClient {
    fn drop(&mut self) {
        if let Some(link) = self.link.get_mut().take() {
            link.task.abort();
        }
    }
}

fn dispatch_frame(handlers: &HandlerRegistry, envelope: Envelope) {
    debug!(target: "channel", event = %envelope.event, "Event received");
    handlers.dispatch(&envelope.event, &envelope.data);
}

async fn run_socket(
    ws: WsStream,
    mut outbound: mpsc::UnboundedReceiver<Message>,
    handlers: Arc<HandlerRegistry>,
    state: Arc<watch::Sender<ConnectionState>>,
    generation: u64,
    current: Arc<AtomicU64>,
) {
    let (mut sink, mut stream) = ws.split();

    let last_error = loop {
        tokio::select! {
            message = outbound.recv() => match message {
                Some(message) => {
                    let closing = matches!(message, Message::Close(_));
                    if let Err(err) = sink.send(message).await {
                        break Some(err.to_string());
                    }
                    if closing {
                        break None;
                    }
                }
                None => {
                    let _ = sink.send(Message::Close(None)).await;
                    break None;
                }
            },
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => match Envelope::from_text(text.as_str()) {
                    Ok(envelope) => dispatch_frame(&handlers, envelope),
                    Err(err) => warn!(target: "channel", %err, "Dropping malformed frame"),
                },
                Some(Ok(Message::Binary(bytes))) => match Envelope::from_binary(&bytes) {
                    Ok((envelope, _payload)) => dispatch_frame(&handlers, envelope),
                    Err(err) => warn!(target: "channel", %err, "Dropping malformed binary frame"),
                },
                Some(Ok(Message::Close(_))) => break Some("connection closed by server".to_string()),
                Some(Ok(_)) => {}
                Some(Err(err)) => break Some(err.to_string()),
                None => break Some("connection closed".to_string()),
            },
        }
    };

    if current.load(Ordering::SeqCst) == generation {
        if let Some(err) = &last_error {
            warn!(target: "channel", %err, "Channel lost");
        }
        state.send_replace(ConnectionState {
            connected: false,
            last_error,
        });
    }
}
