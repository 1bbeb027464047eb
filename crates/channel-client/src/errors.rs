use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("channel is not connected")]
    NotConnected,

    #[error("failed to connect to {url}: {reason}")]
    Connect { url: String, reason: String },

    #[error("connect to {url} timed out after {timeout_ms}ms")]
    ConnectTimeout { url: String, timeout_ms: u64 },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed frame: {0}")]
    Frame(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with an `error` body or a failure status.
    #[error("{0}")]
    Backend(String),

    #[error("invalid image: {0}")]
    Image(#[from] cartpilot_core_types::CoreError),
}

impl ChannelError {
    /// Whether the failure means "use the fallback transport".
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ChannelError::NotConnected
                | ChannelError::Connect { .. }
                | ChannelError::ConnectTimeout { .. }
                | ChannelError::Transport(_)
        )
    }
}
