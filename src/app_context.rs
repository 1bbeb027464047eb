//! Wiring of one chat: page driver, executor, reconciler, channel and session.

use std::sync::Arc;
use std::time::Duration;

use action_flow::DefaultActionExecutor;
use action_primitives::PageDom;
use agent_core::{
    ReconcileError, Reconciler, ReconcilerInput, ResultSink, StreamEvent, INBOUND_EVENT_NAMES,
};
use async_trait::async_trait;
use cartpilot_core_types::{ThreadId, ToolCallResult};
use channel_client::{Backend, ChannelClient, HandlerId};
use perceiver_visual::{ScreenCapture, ScreenshotService};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use transcript_store::TranscriptStore;

use crate::config::AppConfig;
use crate::session::{ChatSession, CurrentThread};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Emits tool results as channel events.
pub struct ChannelResultSink {
    channel: Arc<ChannelClient>,
}

impl ChannelResultSink {
    pub fn new(channel: Arc<ChannelClient>) -> Self {
        Self { channel }
    }
}

#[async_trait]
impl ResultSink for ChannelResultSink {
    async fn send_result(&self, result: &ToolCallResult) -> Result<(), ReconcileError> {
        self.channel
            .send_tool_result(result)
            .map_err(|err| ReconcileError::delivery(err.to_string()))
    }
}

/// Decode inbound envelopes into reconciler input. Events for a thread other
/// than the current one are dropped here; every other event is queued, since a
/// lost tool call would leave the assistant waiting for its result.
pub fn bridge_events(
    channel: &ChannelClient,
    current: CurrentThread,
    inputs: mpsc::UnboundedSender<ReconcilerInput>,
) -> Vec<(&'static str, HandlerId)> {
    INBOUND_EVENT_NAMES
        .iter()
        .map(|&name| {
            let current = current.clone();
            let inputs = inputs.clone();
            let id = channel.on_event(name, move |data| {
                let event = match StreamEvent::decode(name, data.clone()) {
                    Ok(Some(event)) => event,
                    Ok(None) => return,
                    Err(err) => {
                        warn!(target: "channel", %err, "Dropping malformed event");
                        return;
                    }
                };
                if let Some(thread_id) = event.thread_id() {
                    if !current.accepts(thread_id) {
                        debug!(target: "channel", %thread_id, event = name, "Event for another thread");
                        return;
                    }
                }
                if inputs.send(ReconcilerInput::Event(event)).is_err() {
                    warn!(target: "channel", event = name, "Reconciler stopped; event dropped");
                }
            });
            (name, id)
        })
        .collect()
}

/// A running chat.
pub struct AppContext {
    config: Arc<AppConfig>,
    channel: Arc<ChannelClient>,
    session: Arc<ChatSession>,
    transcript: Arc<TranscriptStore>,
    typing: watch::Receiver<bool>,
    preview: watch::Receiver<String>,
    handlers: Vec<(&'static str, HandlerId)>,
    reconciler: JoinHandle<()>,
}

impl AppContext {
    /// Build every component and start the reconciler. The channel is not
    /// connected yet.
    pub fn assemble(
        config: AppConfig,
        dom: Arc<dyn PageDom>,
        capture: Arc<dyn ScreenCapture>,
        backend: Arc<dyn Backend>,
    ) -> Self {
        let config = Arc::new(config);
        let transcript = Arc::new(TranscriptStore::with_assistant_window(
            config.reconciler.assistant_window(),
        ));

        let screenshots = Arc::new(ScreenshotService::new(
            capture,
            config.browser.capture.clone(),
        ));
        let executor = Arc::new(DefaultActionExecutor::new(
            dom,
            screenshots,
            config.locators.clone(),
            config.executor.clone(),
        ));

        let channel = Arc::new(ChannelClient::new(config.channel.clone()));
        let sink = Arc::new(ChannelResultSink::new(Arc::clone(&channel)));
        let current = CurrentThread::new(ThreadId::new());

        let mut reconciler = Reconciler::new(
            executor,
            sink,
            Arc::clone(&transcript),
            config.reconciler.clone(),
        );
        reconciler.reset(current.get());
        let typing = reconciler.typing();
        let preview = reconciler.preview();

        let (inputs_tx, inputs_rx) = mpsc::unbounded_channel();
        let handlers = bridge_events(&channel, current.clone(), inputs_tx.clone());
        let session = Arc::new(
            ChatSession::new(
                Arc::clone(&transcript),
                channel.clone(),
                backend,
                current,
            )
            .with_reconciler(inputs_tx),
        );
        let reconciler = tokio::spawn(reconciler.run(inputs_rx));

        info!(thread_id = %session.thread_id(), "Chat assembled");
        Self {
            config,
            channel,
            session,
            transcript,
            typing,
            preview,
            handlers,
            reconciler,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn channel(&self) -> &Arc<ChannelClient> {
        &self.channel
    }

    pub fn session(&self) -> &Arc<ChatSession> {
        &self.session
    }

    pub fn transcript(&self) -> &Arc<TranscriptStore> {
        &self.transcript
    }

    /// Whether the assistant is producing a turn.
    pub fn typing(&self) -> watch::Receiver<bool> {
        self.typing.clone()
    }

    /// Latest partial text of the running turn.
    pub fn preview(&self) -> watch::Receiver<String> {
        self.preview.clone()
    }

    /// Close the channel and let executing tool calls finish.
    pub async fn shutdown(self) {
        for (name, id) in &self.handlers {
            self.channel.off(name, *id);
        }
        self.channel.disconnect().await;
        drop(self.session);

        let mut reconciler = self.reconciler;
        if tokio::time::timeout(SHUTDOWN_GRACE, &mut reconciler)
            .await
            .is_err()
        {
            warn!("Reconciler did not stop in time");
            reconciler.abort();
        }
        info!("Chat closed");
    }
}

#[cfg(test)]
mod tests {
    use channel_client::ChannelConfig;
    use serde_json::json;

    use super::*;

    #[test]
    fn bursts_of_tool_calls_all_reach_the_reconciler() {
        let channel = ChannelClient::new(ChannelConfig::default());
        let current = CurrentThread::new(ThreadId::from("thread-1"));
        let (inputs_tx, mut inputs_rx) = mpsc::unbounded_channel();
        let handlers = bridge_events(&channel, current, inputs_tx);
        assert_eq!(handlers.len(), INBOUND_EVENT_NAMES.len());

        for n in 0..1500 {
            let delivered = channel.handlers().dispatch(
                "browser_tool_call",
                &json!({
                    "thread_id": "thread-1",
                    "tool_id": format!("t{n}"),
                    "tool_name": "scroll_page",
                    "tool_args": {"direction": "down"},
                }),
            );
            assert_eq!(delivered, 1);
        }

        let mut tool_ids = Vec::new();
        while let Ok(input) = inputs_rx.try_recv() {
            match input {
                ReconcilerInput::Event(StreamEvent::ToolCall(request)) => {
                    tool_ids.push(request.tool_id.to_string())
                }
                other => panic!("unexpected input {other:?}"),
            }
        }
        assert_eq!(tool_ids.len(), 1500);
        assert_eq!(tool_ids.first().map(String::as_str), Some("t0"));
        assert_eq!(tool_ids.last().map(String::as_str), Some("t1499"));
    }

    #[test]
    fn calls_for_another_thread_are_not_queued() {
        let channel = ChannelClient::new(ChannelConfig::default());
        let current = CurrentThread::new(ThreadId::from("thread-1"));
        let (inputs_tx, mut inputs_rx) = mpsc::unbounded_channel();
        bridge_events(&channel, current, inputs_tx);

        channel.handlers().dispatch(
            "browser_tool_call",
            &json!({"thread_id": "thread-2", "tool_id": "t1", "tool_name": "scroll_page"}),
        );

        assert!(inputs_rx.try_recv().is_err());
    }
}
