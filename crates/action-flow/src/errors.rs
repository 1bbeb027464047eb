//! Tool execution error types

use action_locator::LocatorError;
use action_primitives::ActionError;
use perceiver_visual::VisualError;
use thiserror::Error;

/// Tool execution errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FlowError {
    /// Tool name is not one of the browser tools
    #[error("Unknown browser tool: {0}")]
    UnknownTool(String),

    /// Arguments missing or malformed
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// A required element could not be found
    #[error("{0}")]
    NotFound(String),

    /// Primitive failed on a located element
    #[error(transparent)]
    Action(#[from] ActionError),

    /// Screenshot could not be produced
    #[error("{0}")]
    Capture(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl FlowError {
    /// Not found, or found but not actionable
    pub fn is_locate_failure(&self) -> bool {
        match self {
            FlowError::NotFound(_) => true,
            FlowError::Action(err) => err.is_locate_failure(),
            _ => false,
        }
    }
}

impl From<LocatorError> for FlowError {
    fn from(err: LocatorError) -> Self {
        match err {
            LocatorError::NotFound(msg) => FlowError::NotFound(msg),
            other => FlowError::Action(other.into()),
        }
    }
}

impl From<VisualError> for FlowError {
    fn from(err: VisualError) -> Self {
        FlowError::Capture(err.to_string())
    }
}

impl From<serde_json::Error> for FlowError {
    fn from(err: serde_json::Error) -> Self {
        FlowError::InvalidArguments(err.to_string())
    }
}
