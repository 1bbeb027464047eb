//! Turn state machine.
//!
//! One `Reconciler` owns the dedup ledger for a chat and mutates its transcript.
//! Tool calls run on spawned tasks that capture a snapshot of the turn they were
//! accepted in; their completions come back over a channel and are folded in by
//! the same loop that handles stream events, so no event ever waits on a tool.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use action_flow::ActionExecutor;
use async_trait::async_trait;
use cartpilot_core_types::{ThreadId, ToolCallRequest, ToolCallResult, ToolName};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};
use transcript_store::TranscriptStore;

use crate::{
    classify::{classify, FragmentClass},
    errors::ReconcileError,
    events::{Fragment, StreamEvent},
    inflight::{Admission, InFlightTable, DEFAULT_COMPLETED_CAPACITY},
    ledger::{DedupLedger, FragmentKey},
    messages,
};

/// Delivers tool results back to the assistant.
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn send_result(&self, result: &ToolCallResult) -> Result<(), ReconcileError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    Idle,
    Streaming,
    ToolPending,
    Completed,
    Errored,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    /// Identical assistant messages within this window are shown once
    pub assistant_window_ms: u64,
    /// Answered tool calls remembered for duplicate rejection
    pub completed_capacity: usize,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            assistant_window_ms: 10_000,
            completed_capacity: DEFAULT_COMPLETED_CAPACITY,
        }
    }
}

impl ReconcilerConfig {
    pub fn assistant_window(&self) -> Duration {
        Duration::from_millis(self.assistant_window_ms)
    }
}

/// Input to [`Reconciler::run`].
#[derive(Debug)]
pub enum ReconcilerInput {
    Event(StreamEvent),
    /// Switch to another thread: abandon display state and start clean.
    Reset { thread_id: ThreadId },
}

/// A finished tool call, reported by its task.
#[derive(Debug, Clone)]
pub struct Completion {
    /// Turn the call was accepted in
    pub turn: u64,
    pub request: ToolCallRequest,
    pub result: ToolCallResult,
    pub delivered: bool,
}

pub struct Reconciler {
    executor: Arc<dyn ActionExecutor>,
    sink: Arc<dyn ResultSink>,
    transcript: Arc<TranscriptStore>,
    ledger: DedupLedger,
    in_flight: Arc<InFlightTable>,
    state: TurnState,
    turn: u64,
    thread_id: Option<ThreadId>,
    /// Spawned calls whose completion has not been folded in yet
    outstanding: usize,
    typing: watch::Sender<bool>,
    preview: watch::Sender<String>,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
}

impl Reconciler {
    pub fn new(
        executor: Arc<dyn ActionExecutor>,
        sink: Arc<dyn ResultSink>,
        transcript: Arc<TranscriptStore>,
        config: ReconcilerConfig,
    ) -> Self {
        let (typing, _) = watch::channel(false);
        let (preview, _) = watch::channel(String::new());
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            executor,
            sink,
            transcript,
            ledger: DedupLedger::new(),
            in_flight: Arc::new(InFlightTable::with_capacity(config.completed_capacity)),
            state: TurnState::Idle,
            turn: 0,
            thread_id: None,
            outstanding: 0,
            typing,
            preview,
            completions_tx,
            completions_rx,
        }
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn turn(&self) -> u64 {
        self.turn
    }

    pub fn thread_id(&self) -> Option<&ThreadId> {
        self.thread_id.as_ref()
    }

    pub fn ledger(&self) -> &DedupLedger {
        &self.ledger
    }

    pub fn in_flight(&self) -> Arc<InFlightTable> {
        Arc::clone(&self.in_flight)
    }

    pub fn transcript(&self) -> &Arc<TranscriptStore> {
        &self.transcript
    }

    /// Whether the assistant is currently producing a turn.
    pub fn typing(&self) -> watch::Receiver<bool> {
        self.typing.subscribe()
    }

    /// Live text of the partial answer being written.
    pub fn preview(&self) -> watch::Receiver<String> {
        self.preview.subscribe()
    }

    fn clear_live_state(&self, typing: bool) {
        self.typing.send_replace(typing);
        self.preview.send_replace(String::new());
    }

    /// Abandon display state and follow `thread_id` from now on. Calls still
    /// executing finish and deliver their results.
    pub fn reset(&mut self, thread_id: ThreadId) {
        info!(target: "reconciler", %thread_id, "Reset");
        self.ledger.clear();
        self.clear_live_state(false);
        self.turn += 1;
        self.thread_id = Some(thread_id);
        self.state = TurnState::Idle;
    }

    pub async fn handle(&mut self, event: StreamEvent) {
        debug!(target: "reconciler", kind = event.kind().as_str(), state = ?self.state, "Event");
        match event {
            StreamEvent::LifecycleStart { thread_id } => self.on_start(thread_id),
            StreamEvent::Fragment(fragment) => self.on_fragment(fragment),
            StreamEvent::ToolResultEcho(fragment) => self.on_tool_status(&fragment),
            StreamEvent::ToolCall(request) => self.on_tool_call(request),
            StreamEvent::LifecycleComplete { final_content, .. } => {
                self.on_complete(final_content)
            }
            StreamEvent::Error { message, .. } => self.on_error(&message),
        }
    }

    fn on_start(&mut self, thread_id: ThreadId) {
        self.turn += 1;
        self.ledger.clear();
        let discarded = self.transcript.discard_residual();
        self.clear_live_state(true);
        info!(target: "reconciler", %thread_id, turn = self.turn, discarded, "Turn started");
        self.thread_id = Some(thread_id);
        self.state = TurnState::Streaming;
    }

    fn on_fragment(&mut self, fragment: Fragment) {
        if self.state == TurnState::Errored {
            debug!(target: "reconciler", "Fragment after error ignored");
            return;
        }
        if matches!(self.state, TurnState::Idle | TurnState::Completed) {
            self.state = TurnState::Streaming;
        }

        match classify(&fragment) {
            FragmentClass::ToolStatus => self.on_tool_status(&fragment),
            FragmentClass::AssistantMessage => {
                let key = FragmentKey::of(&fragment);
                let key_string = key.as_key_string();
                if !self.ledger.accept_fragment(key) {
                    debug!(target: "reconciler", "Duplicate message dropped");
                    return;
                }
                self.transcript.append_assistant(
                    &fragment.content,
                    fragment.origin_node.clone(),
                    Some(key_string),
                );
                self.preview.send_replace(String::new());
            }
            FragmentClass::Partial => {
                if self.ledger.accept_fragment(FragmentKey::of(&fragment)) {
                    self.preview.send_replace(fragment.content);
                }
            }
        }
    }

    fn on_tool_status(&mut self, fragment: &Fragment) {
        if !self.ledger.accept_tool_status(&fragment.content) {
            debug!(target: "reconciler", "Duplicate tool status dropped");
            return;
        }
        self.transcript
            .append_tool_status(&fragment.content, fragment.origin_node.clone());
    }

    fn on_tool_call(&mut self, request: ToolCallRequest) {
        if !self
            .ledger
            .accept_tool_call(&request.thread_id, &request.tool_id)
        {
            debug!(target: "reconciler", tool_id = %request.tool_id, "Retransmitted tool call dropped");
            return;
        }

        match self.in_flight.try_begin(&request) {
            Admission::Accepted => {}
            admission => {
                debug!(target: "reconciler", tool_id = %request.tool_id, ?admission, "Tool call already handled");
                return;
            }
        }

        info!(
            target: "reconciler",
            thread_id = %request.thread_id,
            tool_id = %request.tool_id,
            tool_name = %request.tool_name,
            "Tool call accepted"
        );
        self.transcript
            .record_tool_progress(&request.tool_name, &messages::executing(&request.tool_name));
        self.state = TurnState::ToolPending;
        self.spawn_execution(request);
    }

    fn spawn_execution(&mut self, request: ToolCallRequest) {
        self.outstanding += 1;
        let executor = Arc::clone(&self.executor);
        let sink = Arc::clone(&self.sink);
        let in_flight = Arc::clone(&self.in_flight);
        let completions = self.completions_tx.clone();
        let turn = self.turn;

        tokio::spawn(async move {
            let result = match AssertUnwindSafe(executor.execute(&request))
                .catch_unwind()
                .await
            {
                Ok(result) => result,
                Err(_) => {
                    error!(target: "reconciler", tool_id = %request.tool_id, "Executor panicked");
                    ToolCallResult::failure(&request, "Browser action crashed unexpectedly")
                }
            };

            let delivered = match sink.send_result(&result).await {
                Ok(()) => true,
                Err(err) => {
                    warn!(target: "reconciler", tool_id = %request.tool_id, %err, "Tool result not delivered");
                    false
                }
            };
            let elapsed = in_flight.complete(&request.thread_id, &request.tool_id);
            debug!(
                target: "reconciler",
                tool_id = %request.tool_id,
                success = result.success,
                elapsed_ms = elapsed.map(|d| d.as_millis() as u64),
                "Tool call finished"
            );

            let _ = completions.send(Completion {
                turn,
                request,
                result,
                delivered,
            });
        });
    }

    /// Fold a finished tool call into the transcript and turn state.
    pub fn handle_completion(&mut self, completion: Completion) {
        let Completion {
            turn,
            request,
            result,
            delivered,
        } = completion;
        self.outstanding = self.outstanding.saturating_sub(1);
        let tool = request.tool_name.as_str();
        let is_capture = request.tool().ok() == Some(ToolName::ScreenCapture);

        match (result.success, is_capture) {
            (true, true) => {
                self.transcript
                    .record_tool_progress(tool, &messages::completed(tool));
                self.transcript
                    .append_tool_entry(messages::SCREENSHOT_SENT, result.evidence.clone());
            }
            (true, false) => {
                self.transcript
                    .record_tool_progress(tool, &messages::completed(tool));
            }
            (false, true) => {
                self.transcript
                    .record_tool_progress(tool, messages::SCREENSHOT_FAILED);
            }
            (false, false) => {
                let error = result.error.as_deref().unwrap_or("unknown error");
                self.transcript
                    .record_tool_progress(tool, &messages::failed(tool, error));
            }
        }
        if !delivered {
            self.transcript.append_error(&messages::undelivered(tool));
        }

        if turn != self.turn {
            info!(target: "reconciler", tool_id = %request.tool_id, turn, "Late tool result from earlier turn");
            return;
        }
        if self.state == TurnState::ToolPending && self.outstanding == 0 {
            self.state = TurnState::Streaming;
        }
    }

    fn on_complete(&mut self, final_content: Option<String>) {
        self.clear_live_state(false);
        let finalized = self.transcript.finalize_streaming();
        info!(
            target: "reconciler",
            turn = self.turn,
            finalized,
            has_final_content = final_content.is_some(),
            "Turn completed"
        );
        self.state = TurnState::Completed;
    }

    fn on_error(&mut self, message: &str) {
        warn!(target: "reconciler", %message, "Assistant reported error");
        self.clear_live_state(false);
        self.transcript.append_error(message);
        self.state = TurnState::Errored;
    }

    /// Wait for the next tool completion and fold it in.
    pub async fn next_completion(&mut self) -> Option<Completion> {
        let completion = self.completions_rx.recv().await?;
        self.handle_completion(completion.clone());
        Some(completion)
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// Fold in completions until nothing is executing.
    pub async fn drain(&mut self) {
        while self.outstanding > 0 {
            if self.next_completion().await.is_none() {
                break;
            }
        }
    }

    /// Process inputs until the sender side closes, then wait for executing calls.
    pub async fn run(mut self, mut inputs: mpsc::UnboundedReceiver<ReconcilerInput>) {
        loop {
            tokio::select! {
                input = inputs.recv() => match input {
                    Some(ReconcilerInput::Event(event)) => self.handle(event).await,
                    Some(ReconcilerInput::Reset { thread_id }) => self.reset(thread_id),
                    None => break,
                },
                Some(completion) = self.completions_rx.recv() => {
                    self.handle_completion(completion);
                }
            }
        }
        self.drain().await;
        debug!(target: "reconciler", "Reconciler stopped");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;
    use serde_json::json;

    use super::*;

    struct CountingExecutor {
        calls: AtomicUsize,
        succeed: bool,
    }

    #[async_trait]
    impl ActionExecutor for CountingExecutor {
        async fn execute(&self, request: &ToolCallRequest) -> ToolCallResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.succeed {
                ToolCallResult::success(request)
            } else {
                ToolCallResult::failure(request, "element missing")
            }
        }
    }

    struct PanickingExecutor;

    #[async_trait]
    impl ActionExecutor for PanickingExecutor {
        async fn execute(&self, _request: &ToolCallRequest) -> ToolCallResult {
            panic!("driver exploded");
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        sent: Mutex<Vec<ToolCallResult>>,
    }

    #[async_trait]
    impl ResultSink for RecordingSink {
        async fn send_result(&self, result: &ToolCallResult) -> Result<(), ReconcileError> {
            self.sent.lock().push(result.clone());
            Ok(())
        }
    }

    fn reconciler(executor: Arc<dyn ActionExecutor>) -> (Reconciler, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let reconciler = Reconciler::new(
            executor,
            sink.clone(),
            Arc::new(TranscriptStore::new()),
            ReconcilerConfig::default(),
        );
        (reconciler, sink)
    }

    fn counting(succeed: bool) -> Arc<CountingExecutor> {
        Arc::new(CountingExecutor {
            calls: AtomicUsize::new(0),
            succeed,
        })
    }

    fn event(name: &str, data: serde_json::Value) -> StreamEvent {
        StreamEvent::decode(name, data).unwrap().unwrap()
    }

    #[tokio::test]
    async fn start_sets_streaming_and_typing() {
        let (mut reconciler, _) = reconciler(counting(true));
        let typing = reconciler.typing();

        reconciler
            .handle(event("stream_start", json!({"thread_id": "a"})))
            .await;

        assert_eq!(reconciler.state(), TurnState::Streaming);
        assert!(*typing.borrow());
        assert!(reconciler.ledger().is_empty());
    }

    #[tokio::test]
    async fn failed_call_writes_failure_line() {
        let (mut reconciler, sink) = reconciler(counting(false));
        reconciler
            .handle(event("stream_start", json!({"thread_id": "a"})))
            .await;
        reconciler
            .handle(event(
                "tool_call",
                json!({"thread_id": "a", "tool_id": "t1", "tool_name": "click_element", "tool_args": {"target": "x"}}),
            ))
            .await;
        assert_eq!(reconciler.state(), TurnState::ToolPending);

        reconciler.drain().await;

        assert_eq!(reconciler.state(), TurnState::Streaming);
        let sent = sink.sent.lock().clone();
        assert_eq!(sent.len(), 1);
        assert!(!sent[0].success);
        let entries = reconciler.transcript().snapshot();
        assert_eq!(entries.len(), 1);
        assert_eq!(
            entries[0].content,
            "🔧 Executing click_element\n❌ click_element failed: element missing"
        );
    }

    struct OfflineSink;

    #[async_trait]
    impl ResultSink for OfflineSink {
        async fn send_result(&self, _result: &ToolCallResult) -> Result<(), ReconcileError> {
            Err(ReconcileError::delivery("channel closed"))
        }
    }

    #[tokio::test]
    async fn undelivered_result_is_shown_as_error() {
        let mut reconciler = Reconciler::new(
            counting(true),
            Arc::new(OfflineSink),
            Arc::new(TranscriptStore::new()),
            ReconcilerConfig::default(),
        );
        reconciler
            .handle(event(
                "tool_call",
                json!({"thread_id": "a", "tool_id": "t1", "tool_name": "navigate_to_cart"}),
            ))
            .await;

        reconciler.drain().await;

        let last = reconciler.transcript().snapshot().pop().unwrap();
        assert!(last.is_error);
        assert!(last.content.contains("navigate_to_cart result could not be sent"));
    }

    #[tokio::test]
    async fn panicking_executor_still_yields_one_result() {
        let (mut reconciler, sink) = reconciler(Arc::new(PanickingExecutor));
        reconciler
            .handle(event(
                "tool_call",
                json!({"thread_id": "a", "tool_id": "t1", "tool_name": "checkout"}),
            ))
            .await;

        reconciler.drain().await;

        let sent = sink.sent.lock().clone();
        assert_eq!(sent.len(), 1);
        assert!(!sent[0].success);
        assert!(sent[0].error.is_some());
    }

    #[tokio::test]
    async fn partial_chunks_only_touch_preview() {
        let (mut reconciler, _) = reconciler(counting(true));
        let preview = reconciler.preview();
        reconciler
            .handle(event("stream_start", json!({"thread_id": "a"})))
            .await;

        reconciler
            .handle(event(
                "stream_update",
                json!({"thread_id": "a", "node": "agent", "type": "token", "content": "Looking for"}),
            ))
            .await;

        assert_eq!(*preview.borrow(), "Looking for");
        assert!(reconciler.transcript().is_empty());

        reconciler
            .handle(event("stream_complete", json!({"thread_id": "a"})))
            .await;
        assert_eq!(*preview.borrow(), "");
        assert_eq!(reconciler.state(), TurnState::Completed);
    }

    #[tokio::test]
    async fn reset_abandons_turn_state() {
        let (mut reconciler, _) = reconciler(counting(true));
        reconciler
            .handle(event("stream_start", json!({"thread_id": "a"})))
            .await;
        reconciler
            .handle(event(
                "stream_update",
                json!({"thread_id": "a", "node": "agent", "type": "message", "content": "Hi"}),
            ))
            .await;

        reconciler.reset("b".into());

        assert_eq!(reconciler.state(), TurnState::Idle);
        assert!(reconciler.ledger().is_empty());
        assert_eq!(reconciler.thread_id().map(|id| id.as_str()), Some("b"));
    }
}
