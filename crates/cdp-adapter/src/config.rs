use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Where to find the browser and how long to wait on it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CdpConfig {
    /// Remote debugging endpoint, e.g. a Chrome started with
    /// `--remote-debugging-port=9222`
    pub devtools_url: String,
    /// Attach to the first page whose url contains this text
    pub page_url_filter: Option<String>,
    pub command_timeout_ms: u64,
}

impl Default for CdpConfig {
    fn default() -> Self {
        Self {
            devtools_url: "http://127.0.0.1:9222".to_string(),
            page_url_filter: None,
            command_timeout_ms: 30_000,
        }
    }
}

impl CdpConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }
}
