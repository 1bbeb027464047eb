//! Error types for locator system

use action_primitives::ActionError;
use thiserror::Error;

/// Locator error enumeration
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LocatorError {
    /// No strategy produced a visible match
    #[error("Element not found: {0}")]
    NotFound(String),

    /// The query carries nothing any strategy can use
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Page driver failed while querying
    #[error("DOM driver error: {0}")]
    Driver(String),
}

impl LocatorError {
    /// Get error severity (0=low, 1=medium, 2=high)
    pub fn severity(&self) -> u8 {
        match self {
            LocatorError::Driver(_) => 2,
            LocatorError::NotFound(_) => 1,
            LocatorError::InvalidQuery(_) => 0,
        }
    }
}

impl From<ActionError> for LocatorError {
    fn from(err: ActionError) -> Self {
        match err {
            ActionError::ElementNotFound(msg) => LocatorError::NotFound(msg),
            other => LocatorError::Driver(other.to_string()),
        }
    }
}

impl From<LocatorError> for ActionError {
    fn from(err: LocatorError) -> Self {
        match err {
            LocatorError::NotFound(msg) => ActionError::ElementNotFound(msg),
            LocatorError::InvalidQuery(msg) => ActionError::InvalidArgument(msg),
            LocatorError::Driver(msg) => ActionError::Dom(msg),
        }
    }
}
