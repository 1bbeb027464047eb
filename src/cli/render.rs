//! Plain-text rendering of transcript entries for the terminal.

use cartpilot_core_types::Role;
use transcript_store::TranscriptEntry;

pub fn render_entry(entry: &TranscriptEntry) -> String {
    let speaker = if entry.is_error {
        "error"
    } else {
        match entry.role {
            Role::User => "you",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    };
    let mut line = format!("{speaker}> {}", entry.content);
    if let Some(image) = &entry.image {
        if !entry.content.is_empty() {
            line.push(' ');
        }
        line.push_str(&format!("[image: {}]", image.file_name));
    }
    line
}

/// Same visible output. Streaming flags are ignored so finalizing a turn
/// does not reprint it.
fn looks_same(a: &TranscriptEntry, b: &TranscriptEntry) -> bool {
    a.role == b.role
        && a.content == b.content
        && a.is_error == b.is_error
        && a.image.is_some() == b.image.is_some()
}

/// Tracks what has been printed and yields only what changed since.
#[derive(Default)]
pub struct TranscriptPrinter {
    printed: Vec<TranscriptEntry>,
}

impl TranscriptPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines to print for the transition to `snapshot`.
    pub fn update(&mut self, snapshot: &[TranscriptEntry]) -> Vec<String> {
        let mut lines = Vec::new();
        if snapshot.len() < self.printed.len() {
            lines.push("-- transcript reloaded --".to_string());
            lines.extend(snapshot.iter().map(render_entry));
            self.printed = snapshot.to_vec();
            return lines;
        }

        let first_changed = self
            .printed
            .iter()
            .zip(snapshot)
            .position(|(old, new)| !looks_same(old, new))
            .unwrap_or(self.printed.len());

        for (index, entry) in snapshot.iter().enumerate().skip(first_changed) {
            let rendered = render_entry(entry);
            if index < self.printed.len() {
                lines.push(format!("(updated) {rendered}"));
            } else {
                lines.push(rendered);
            }
        }
        self.printed = snapshot.to_vec();
        lines
    }
}
