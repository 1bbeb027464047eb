use std::fmt;

use action_primitives::ActionError;
use perceiver_visual::VisualError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// High-level error categories surfaced by the adapter.
#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdapterErrorKind {
    #[error("devtools discovery failed")]
    Discovery,
    #[error("cdp i/o failure")]
    CdpIo,
    #[error("command timed out")]
    Timeout,
    #[error("script evaluation failed")]
    Evaluation,
    #[error("target element not found")]
    TargetNotFound,
    #[error("internal error")]
    Internal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterError {
    pub kind: AdapterErrorKind,
    pub hint: Option<String>,
}

impl fmt::Display for AdapterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(hint) = &self.hint {
            write!(f, ": {}", hint)?;
        }
        Ok(())
    }
}

impl std::error::Error for AdapterError {}

impl AdapterError {
    pub fn new(kind: AdapterErrorKind) -> Self {
        Self { kind, hint: None }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<reqwest::Error> for AdapterError {
    fn from(err: reqwest::Error) -> Self {
        AdapterError::new(AdapterErrorKind::Discovery).with_hint(err.to_string())
    }
}

impl From<AdapterError> for ActionError {
    fn from(err: AdapterError) -> Self {
        match err.kind {
            AdapterErrorKind::TargetNotFound => {
                ActionError::ElementNotFound(err.hint.unwrap_or_else(|| "element".to_string()))
            }
            _ => ActionError::Dom(err.to_string()),
        }
    }
}

impl From<AdapterError> for VisualError {
    fn from(err: AdapterError) -> Self {
        VisualError::CaptureFailed(err.to_string())
    }
}
