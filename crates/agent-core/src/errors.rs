use thiserror::Error;

/// Errors emitted by the reconciler crate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    /// An inbound event could not be decoded.
    #[error("malformed {event} event: {reason}")]
    Decode { event: String, reason: String },

    /// A tool result could not be delivered.
    #[error("failed to deliver tool result: {0}")]
    Delivery(String),
}

impl ReconcileError {
    pub fn decode(event: &str, reason: impl Into<String>) -> Self {
        Self::Decode {
            event: event.to_string(),
            reason: reason.into(),
        }
    }

    pub fn delivery(message: impl Into<String>) -> Self {
        Self::Delivery(message.into())
    }
}
