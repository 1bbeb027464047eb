use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Websocket endpoint of the assistant
    pub ws_url: String,
    /// Base of the one-shot chat and history endpoints
    pub http_base_url: String,
    pub connect_timeout_ms: u64,
    /// Send user turns with images as binary frames
    pub binary_frames: bool,
    /// Event name tool results are emitted under
    pub tool_result_event: String,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            ws_url: "ws://127.0.0.1:5000/ws".to_string(),
            http_base_url: "http://127.0.0.1:5000".to_string(),
            connect_timeout_ms: 5_000,
            binary_frames: true,
            tool_result_event: "browser_tool_result".to_string(),
        }
    }
}

impl ChannelConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}
