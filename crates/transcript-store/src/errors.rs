use cartpilot_core_types::Role;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TranscriptError {
    #[error("{0} entry has neither content nor an image")]
    EmptyEntry(Role),
}
