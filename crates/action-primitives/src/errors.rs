//! Error types for action primitives

use thiserror::Error;

/// Errors raised while acting on the page
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ActionError {
    /// No element matched the requested target
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// Element was located but cannot be acted on (hidden, detached, obscured)
    #[error("Element not actionable: {0}")]
    NotActionable(String),

    /// Tool arguments are missing or malformed
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Scroll amount or direction is unusable
    #[error("Scroll target invalid: {0}")]
    ScrollTargetInvalid(String),

    /// Page driver communication failed
    #[error("DOM driver error: {0}")]
    Dom(String),

    /// Operation was interrupted by navigation or shutdown
    #[error("Operation interrupted: {0}")]
    Interrupted(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ActionError {
    /// Both "not found" and "found but not actionable" count as locate failures.
    pub fn is_locate_failure(&self) -> bool {
        matches!(
            self,
            ActionError::ElementNotFound(_) | ActionError::NotActionable(_)
        )
    }

    /// Get error severity level (0=low, 1=medium, 2=high, 3=critical)
    pub fn severity(&self) -> u8 {
        match self {
            ActionError::Internal(_) => 3,
            ActionError::Dom(_) | ActionError::Interrupted(_) => 2,
            ActionError::ElementNotFound(_) | ActionError::NotActionable(_) => 1,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locate_failures_are_grouped() {
        assert!(ActionError::ElementNotFound("cart".into()).is_locate_failure());
        assert!(ActionError::NotActionable("cart".into()).is_locate_failure());
        assert!(!ActionError::Dom("closed".into()).is_locate_failure());
    }

    #[test]
    fn messages_differ_between_kinds() {
        let missing = ActionError::ElementNotFound("x".into()).to_string();
        let blocked = ActionError::NotActionable("x".into()).to_string();
        assert_ne!(missing, blocked);
    }
}
