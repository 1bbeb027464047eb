use std::sync::Arc;
use std::time::Duration;

use cartpilot_core_types::{ImagePayload, Role};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::debug;

use crate::{
    entry::{AppendOutcome, TranscriptEntry},
    errors::TranscriptError,
    status::{status_tool, Report, Reporter, StatusPhase, ToolLine},
};

/// Identical assistant messages closer together than this are one message.
pub const DEFAULT_ASSISTANT_WINDOW: Duration = Duration::from_secs(10);

struct Shared {
    entries: RwLock<Vec<TranscriptEntry>>,
    version: watch::Sender<u64>,
}

impl Shared {
    fn bump(&self) {
        self.version.send_modify(|version| *version += 1);
    }
}

/// Writable transcript. Shared by reference between the reconciler and the
/// chat session; presentation code gets a [`TranscriptView`].
pub struct TranscriptStore {
    shared: Arc<Shared>,
    assistant_window: chrono::Duration,
}

impl Default for TranscriptStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TranscriptStore {
    pub fn new() -> Self {
        Self::with_assistant_window(DEFAULT_ASSISTANT_WINDOW)
    }

    pub fn with_assistant_window(window: Duration) -> Self {
        let (version, _) = watch::channel(0);
        Self {
            shared: Arc::new(Shared {
                entries: RwLock::new(Vec::new()),
                version,
            }),
            assistant_window: chrono::Duration::from_std(window)
                .unwrap_or_else(|_| chrono::Duration::seconds(10)),
        }
    }

    pub fn view(&self) -> TranscriptView {
        TranscriptView {
            shared: Arc::clone(&self.shared),
        }
    }

    fn push(&self, entry: TranscriptEntry) -> usize {
        let index = {
            let mut entries = self.shared.entries.write();
            entries.push(entry);
            entries.len() - 1
        };
        self.shared.bump();
        index
    }

    pub fn push_user(
        &self,
        content: &str,
        image: Option<ImagePayload>,
    ) -> Result<usize, TranscriptError> {
        if content.trim().is_empty() && image.is_none() {
            return Err(TranscriptError::EmptyEntry(Role::User));
        }
        Ok(self.push(TranscriptEntry::user(content, image)))
    }

    /// Append a streaming assistant message unless the same content was added
    /// by the assistant within the duplicate window.
    pub fn append_assistant(
        &self,
        content: &str,
        origin_node: Option<String>,
        dedup_key: Option<String>,
    ) -> AppendOutcome {
        self.append_assistant_at(content, origin_node, dedup_key, Utc::now())
    }

    pub fn append_assistant_at(
        &self,
        content: &str,
        origin_node: Option<String>,
        dedup_key: Option<String>,
        now: DateTime<Utc>,
    ) -> AppendOutcome {
        let window = self.assistant_window;
        let outcome = {
            let mut entries = self.shared.entries.write();
            let recent = entries.iter().any(|entry| {
                entry.role == Role::Assistant
                    && entry.content == content
                    && {
                        let age = now - entry.timestamp;
                        age < window && -age < window
                    }
            });
            if recent {
                AppendOutcome::Duplicate
            } else {
                entries.push(
                    TranscriptEntry::streaming_assistant(content)
                        .with_origin(origin_node)
                        .with_dedup_key(dedup_key)
                        .at(now),
                );
                AppendOutcome::Appended(entries.len() - 1)
            }
        };
        if outcome.changed() {
            self.shared.bump();
        } else {
            debug!(content_len = content.len(), "Assistant message already shown");
        }
        outcome
    }

    /// Record a tool status line received from the assistant.
    ///
    /// A line naming a tool joins that tool's invocation: a `🔧` adopts a line
    /// the agent opened for it, and a `✅`/`❌` closes the open line. Lines
    /// naming no tool merge a completion into a directly preceding open line.
    /// Anything else is deduplicated on exact content and appended finalized.
    pub fn append_tool_status(&self, content: &str, origin_node: Option<String>) -> AppendOutcome {
        let tool = status_tool(content).map(str::to_string);
        self.tool_line(content, tool.as_deref(), Reporter::Assistant, origin_node)
    }

    /// Record a progress line the agent wrote while running `tool`. Never
    /// deduplicated: two calls of the same tool each get their own line.
    pub fn record_tool_progress(&self, tool: &str, content: &str) -> AppendOutcome {
        self.tool_line(content, Some(tool), Reporter::Local, None)
    }

    fn tool_line(
        &self,
        content: &str,
        tool: Option<&str>,
        reporter: Reporter,
        origin_node: Option<String>,
    ) -> AppendOutcome {
        let outcome = {
            let mut entries = self.shared.entries.write();
            match (tool, StatusPhase::of(content)) {
                (Some(tool), Some(phase)) => {
                    report_invocation(&mut entries, tool, reporter, phase, content, origin_node)
                }
                _ => untracked_line(&mut entries, content, reporter, origin_node),
            }
        };
        if outcome.changed() {
            self.shared.bump();
        }
        outcome
    }

    /// Append a finalized tool entry without dedup, e.g. a screenshot notice.
    pub fn append_tool_entry(&self, content: &str, image: Option<ImagePayload>) -> usize {
        self.push(TranscriptEntry::tool(content).with_image(image))
    }

    pub fn append_error(&self, message: &str) -> usize {
        self.push(TranscriptEntry::error(message))
    }

    /// Finalized assistant reply from a one-shot request.
    pub fn append_reply(&self, content: &str) -> usize {
        self.push(TranscriptEntry::assistant(content))
    }

    /// Clear the streaming flag on every entry. Returns how many changed.
    pub fn finalize_streaming(&self) -> usize {
        let finalized = {
            let mut entries = self.shared.entries.write();
            let mut count = 0;
            for entry in entries.iter_mut().filter(|entry| entry.is_streaming) {
                entry.is_streaming = false;
                count += 1;
            }
            count
        };
        if finalized > 0 {
            self.shared.bump();
        }
        finalized
    }

    /// Drop entries left streaming or errored by an abandoned turn.
    pub fn discard_residual(&self) -> usize {
        let removed = {
            let mut entries = self.shared.entries.write();
            let before = entries.len();
            entries.retain(|entry| !entry.is_streaming && !entry.is_error);
            before - entries.len()
        };
        if removed > 0 {
            debug!(removed, "Discarded residual entries");
            self.shared.bump();
        }
        removed
    }

    /// Replace the whole log, e.g. with a thread's history.
    pub fn replace_all(&self, entries: Vec<TranscriptEntry>) {
        *self.shared.entries.write() = entries;
        self.shared.bump();
    }

    pub fn clear(&self) {
        self.replace_all(Vec::new());
    }

    pub fn snapshot(&self) -> Vec<TranscriptEntry> {
        self.shared.entries.read().clone()
    }

    pub fn len(&self) -> usize {
        self.shared.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Entries after the latest user turn.
fn exchange_start(entries: &[TranscriptEntry]) -> usize {
    entries
        .iter()
        .rposition(|entry| entry.role == Role::User)
        .map_or(0, |index| index + 1)
}

fn report_invocation(
    entries: &mut Vec<TranscriptEntry>,
    tool: &str,
    reporter: Reporter,
    phase: StatusPhase,
    content: &str,
    origin_node: Option<String>,
) -> AppendOutcome {
    // Oldest invocation this reporter started and has not finished.
    let own = match phase {
        StatusPhase::Start => None,
        StatusPhase::Finish => entries.iter().position(|entry| {
            entry
                .line_for(tool)
                .is_some_and(|line| line.report(reporter) == Report::Started)
        }),
    };
    // Otherwise the oldest invocation of this exchange only the other side reported.
    let target = own.or_else(|| {
        let from = exchange_start(entries);
        entries[from..]
            .iter()
            .position(|entry| entry.line_for(tool).is_some_and(|line| line.awaits(reporter)))
            .map(|offset| from + offset)
    });

    if let Some(index) = target {
        let entry = &mut entries[index];
        if phase == StatusPhase::Finish && entry.is_open_tool_status() {
            entry.content = format!("{}\n{}", entry.content, content);
            entry.timestamp = Utc::now();
        }
        if let Some(line) = entry.tool_line.as_mut() {
            line.record(reporter, phase);
        }
        return AppendOutcome::Merged(index);
    }

    if reporter == Reporter::Assistant && is_known_tool_line(entries, content) {
        return AppendOutcome::Duplicate;
    }
    entries.push(
        TranscriptEntry::tool(content)
            .with_origin(origin_node)
            .with_tool_line(ToolLine::new(tool, reporter, phase)),
    );
    AppendOutcome::Appended(entries.len() - 1)
}

fn untracked_line(
    entries: &mut Vec<TranscriptEntry>,
    content: &str,
    reporter: Reporter,
    origin_node: Option<String>,
) -> AppendOutcome {
    let merge_into = entries
        .last()
        .filter(|last| {
            StatusPhase::of(content) == Some(StatusPhase::Finish)
                && last.tool_line.is_none()
                && last.is_open_tool_status()
        })
        .map(|_| entries.len() - 1);

    if let Some(index) = merge_into {
        let last = &mut entries[index];
        last.content = format!("{}\n{}", last.content, content);
        last.timestamp = Utc::now();
        return AppendOutcome::Merged(index);
    }
    if reporter == Reporter::Assistant && is_known_tool_line(entries, content) {
        return AppendOutcome::Duplicate;
    }
    entries.push(TranscriptEntry::tool(content).with_origin(origin_node));
    AppendOutcome::Appended(entries.len() - 1)
}

fn is_known_tool_line(entries: &[TranscriptEntry], content: &str) -> bool {
    entries
        .iter()
        .any(|entry| entry.is_tool_message && entry.content == content)
}

/// Read-only handle on a transcript.
#[derive(Clone)]
pub struct TranscriptView {
    shared: Arc<Shared>,
}

impl TranscriptView {
    pub fn snapshot(&self) -> Vec<TranscriptEntry> {
        self.shared.entries.read().clone()
    }

    pub fn len(&self) -> usize {
        self.shared.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn last(&self) -> Option<TranscriptEntry> {
        self.shared.entries.read().last().cloned()
    }

    /// Entries from `index` on.
    pub fn since(&self, index: usize) -> Vec<TranscriptEntry> {
        self.shared
            .entries
            .read()
            .iter()
            .skip(index)
            .cloned()
            .collect()
    }

    pub fn version(&self) -> u64 {
        *self.shared.version.borrow()
    }

    /// Receiver whose value is bumped on every change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.shared.version.subscribe()
    }
}
