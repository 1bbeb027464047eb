//! Chat session: user turns in, transcript out.
//!
//! A turn goes over the channel when websocket mode is on and the channel is
//! up; the assistant's answer then arrives as stream events handled by the
//! reconciler. Otherwise the turn is posted to the one-shot backend and the
//! reply is written to the transcript directly.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use agent_core::ReconcilerInput;
use cartpilot_core_types::{ImagePayload, Role, ThreadId};
use channel_client::{Backend, ChannelClient, HistoryMessage, TurnMessage};
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::{info, warn};
use transcript_store::{TranscriptEntry, TranscriptError, TranscriptStore};

/// The part of the channel a session sends turns through.
pub trait TurnChannel: Send + Sync {
    fn is_connected(&self) -> bool;

    /// Whether the transport accepted the turn.
    fn send_turn(&self, turn: &TurnMessage) -> bool;
}

impl TurnChannel for ChannelClient {
    fn is_connected(&self) -> bool {
        ChannelClient::is_connected(self)
    }

    fn send_turn(&self, turn: &TurnMessage) -> bool {
        ChannelClient::send_turn(self, turn)
    }
}

/// Thread the session is showing. Shared with the event bridge so events of
/// other threads are dropped before they reach the reconciler.
#[derive(Clone, Debug)]
pub struct CurrentThread(Arc<RwLock<ThreadId>>);

impl CurrentThread {
    pub fn new(thread_id: ThreadId) -> Self {
        Self(Arc::new(RwLock::new(thread_id)))
    }

    pub fn get(&self) -> ThreadId {
        self.0.read().clone()
    }

    fn set(&self, thread_id: ThreadId) {
        *self.0.write() = thread_id;
    }

    /// Events without a thread id belong to whichever thread is current.
    pub fn accepts(&self, thread_id: &ThreadId) -> bool {
        thread_id.as_str().is_empty() || *self.0.read() == *thread_id
    }
}

/// How a turn left the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Sent over the channel; the answer streams back as events.
    Channel,
    /// Answered by the one-shot backend.
    Fallback,
    /// The backend failed; an error entry was written.
    Failed,
}

pub struct ChatSession {
    transcript: Arc<TranscriptStore>,
    channel: Arc<dyn TurnChannel>,
    backend: Arc<dyn Backend>,
    current: CurrentThread,
    reconciler: Option<mpsc::UnboundedSender<ReconcilerInput>>,
    websocket_mode: AtomicBool,
}

impl ChatSession {
    pub fn new(
        transcript: Arc<TranscriptStore>,
        channel: Arc<dyn TurnChannel>,
        backend: Arc<dyn Backend>,
        current: CurrentThread,
    ) -> Self {
        Self {
            transcript,
            channel,
            backend,
            current,
            reconciler: None,
            websocket_mode: AtomicBool::new(true),
        }
    }

    /// Route thread switches to the reconciler feeding this transcript.
    pub fn with_reconciler(mut self, inputs: mpsc::UnboundedSender<ReconcilerInput>) -> Self {
        self.reconciler = Some(inputs);
        self
    }

    pub fn thread_id(&self) -> ThreadId {
        self.current.get()
    }

    pub fn current_thread(&self) -> CurrentThread {
        self.current.clone()
    }

    pub fn transcript(&self) -> &Arc<TranscriptStore> {
        &self.transcript
    }

    pub fn websocket_mode(&self) -> bool {
        self.websocket_mode.load(Ordering::SeqCst)
    }

    pub fn set_websocket_mode(&self, enabled: bool) {
        self.websocket_mode.store(enabled, Ordering::SeqCst);
        info!(enabled, "Websocket mode changed");
    }

    /// Record the user's turn and send it. Fails only when there is nothing
    /// to send.
    pub async fn send_message(
        &self,
        text: &str,
        image: Option<ImagePayload>,
    ) -> Result<Delivery, TranscriptError> {
        let text = text.trim();
        self.transcript.push_user(text, image.clone())?;
        let thread_id = self.current.get();

        if self.websocket_mode() && self.channel.is_connected() {
            let turn = TurnMessage::new(text, thread_id.clone(), image.clone());
            if self.channel.send_turn(&turn) {
                return Ok(Delivery::Channel);
            }
            warn!(%thread_id, "Channel rejected the turn, using HTTP fallback");
        }

        match self
            .backend
            .send_turn(text, &thread_id, image.as_ref())
            .await
        {
            Ok(reply) => {
                self.transcript.append_reply(&reply);
                Ok(Delivery::Fallback)
            }
            Err(err) => {
                warn!(%thread_id, %err, "Fallback turn failed");
                self.transcript.append_error(&err.to_string());
                Ok(Delivery::Failed)
            }
        }
    }

    /// Start an empty thread with a fresh id.
    pub async fn new_chat(&self) -> ThreadId {
        let thread_id = ThreadId::new();
        self.current.set(thread_id.clone());
        self.transcript.clear();
        self.reset_reconciler(&thread_id);
        info!(%thread_id, "New chat");
        thread_id
    }

    /// Show `thread_id`, replacing the transcript with its stored history.
    /// Returns the number of entries loaded; a failed fetch leaves it empty.
    pub async fn switch_thread(&self, thread_id: ThreadId) -> usize {
        self.current.set(thread_id.clone());
        self.reset_reconciler(&thread_id);

        match self.backend.fetch_history(&thread_id).await {
            Ok(messages) => {
                let entries = history_entries(messages);
                let loaded = entries.len();
                self.transcript.replace_all(entries);
                info!(%thread_id, loaded, "Switched thread");
                loaded
            }
            Err(err) => {
                warn!(%thread_id, %err, "Failed to restore chat history");
                self.transcript.clear();
                0
            }
        }
    }

    fn reset_reconciler(&self, thread_id: &ThreadId) {
        let Some(inputs) = &self.reconciler else {
            return;
        };
        let reset = ReconcilerInput::Reset {
            thread_id: thread_id.clone(),
        };
        if inputs.send(reset).is_err() {
            warn!(%thread_id, "Reconciler stopped; reset dropped");
        }
    }
}

/// Convert stored history into finalized transcript entries.
pub fn history_entries(messages: Vec<HistoryMessage>) -> Vec<TranscriptEntry> {
    messages
        .into_iter()
        .map(|message| {
            let entry = match message.role {
                Role::User => TranscriptEntry::user(message.content, None),
                Role::Assistant => TranscriptEntry::assistant(message.content),
                Role::Tool => TranscriptEntry::tool(message.content),
            };
            entry.with_image(message.image)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_thread_ids_match_any_thread() {
        let current = CurrentThread::new(ThreadId::from("1"));
        assert!(current.accepts(&ThreadId::from("1")));
        assert!(current.accepts(&ThreadId::from("")));
        assert!(!current.accepts(&ThreadId::from("2")));
    }

    #[test]
    fn history_keeps_order_and_images() {
        let entries = history_entries(vec![
            HistoryMessage {
                role: Role::User,
                content: "find a mug".to_string(),
                image: Some(ImagePayload::from_base64("AAAA", "image/jpeg", "Chat Image")),
            },
            HistoryMessage {
                role: Role::Assistant,
                content: "Here are some mugs".to_string(),
                image: None,
            },
        ]);

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].role, Role::User);
        assert!(entries[0].image.is_some());
        assert_eq!(entries[1].content, "Here are some mugs");
        assert!(entries.iter().all(|entry| !entry.is_streaming));
    }
}
