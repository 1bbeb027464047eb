//! Transcript Store
//!
//! Ordered log of conversation entries. The reconciler and the chat session append
//! and finalize entries; presentation code reads through a [`TranscriptView`] and
//! is woken through a version counter whenever the log changes.

pub mod entry;
pub mod errors;
pub mod status;
pub mod store;

pub use entry::{AppendOutcome, TranscriptEntry};
pub use errors::TranscriptError;
pub use status::{status_tool, Report, Reporter, StatusPhase, ToolLine};
pub use store::{TranscriptStore, TranscriptView, DEFAULT_ASSISTANT_WINDOW};
