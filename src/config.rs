//! Configuration management module
//!
//! One YAML document with a section per component. Every section falls back to
//! its defaults, so an empty file and a missing file load the same configuration.

use action_flow::ExecutorConfig;
use action_locator::LocatorCatalog;
use agent_core::ReconcilerConfig;
use cdp_adapter::CdpConfig;
use channel_client::ChannelConfig;
use perceiver_visual::CapturePolicy;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{field}: invalid url {value:?}")]
    InvalidUrl { field: &'static str, value: String },

    #[error("{field}: expected one of {expected}, got {scheme:?}")]
    UnsupportedScheme {
        field: &'static str,
        expected: &'static str,
        scheme: String,
    },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("{field} must not be empty")]
    Empty { field: &'static str },
}

/// Full application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub channel: ChannelConfig,
    pub browser: BrowserConfig,
    pub executor: ExecutorConfig,
    pub reconciler: ReconcilerConfig,
    pub locators: LocatorCatalog,
}

/// Where the browser is and which of its pages may be captured.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    #[serde(flatten)]
    pub devtools: CdpConfig,
    #[serde(flatten)]
    pub capture: CapturePolicy,
}

impl AppConfig {
    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw)
    }

    /// Checks values serde accepts but the runtime cannot use.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_url("channel.ws_url", &self.channel.ws_url, &["ws", "wss"])?;
        check_url(
            "channel.http_base_url",
            &self.channel.http_base_url,
            &["http", "https"],
        )?;
        check_url(
            "browser.devtools_url",
            &self.browser.devtools.devtools_url,
            &["http", "https"],
        )?;

        if self.channel.connect_timeout_ms == 0 {
            return Err(ConfigError::Zero {
                field: "channel.connect_timeout_ms",
            });
        }
        if self.browser.devtools.command_timeout_ms == 0 {
            return Err(ConfigError::Zero {
                field: "browser.command_timeout_ms",
            });
        }
        if self.channel.tool_result_event.trim().is_empty() {
            return Err(ConfigError::Empty {
                field: "channel.tool_result_event",
            });
        }
        if self.executor.product_scan_limit == 0 {
            return Err(ConfigError::Zero {
                field: "executor.product_scan_limit",
            });
        }
        Ok(())
    }
}

fn check_url(field: &'static str, value: &str, schemes: &[&'static str]) -> Result<(), ConfigError> {
    let url = Url::parse(value).map_err(|_| ConfigError::InvalidUrl {
        field,
        value: value.to_string(),
    })?;
    if !schemes.contains(&url.scheme()) {
        return Err(ConfigError::UnsupportedScheme {
            field,
            expected: if schemes[0] == "ws" { "ws, wss" } else { "http, https" },
            scheme: url.scheme().to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(AppConfig::default().validate(), Ok(()));
    }

    #[test]
    fn browser_section_is_flat() {
        let config = AppConfig::from_yaml(
            "browser:\n  devtools_url: http://127.0.0.1:9333\n  restricted_prefixes: [\"edge://\"]\n",
        )
        .unwrap();
        assert_eq!(config.browser.devtools.devtools_url, "http://127.0.0.1:9333");
        assert!(config.browser.capture.is_restricted("edge://settings"));
        assert!(!config.browser.capture.is_restricted("chrome://settings"));
        assert_eq!(config.browser.capture.min_region_px, 10.0);
    }

    #[test]
    fn websocket_url_needs_ws_scheme() {
        let mut config = AppConfig::default();
        config.channel.ws_url = "http://127.0.0.1:5000/ws".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnsupportedScheme {
                field: "channel.ws_url",
                ..
            })
        ));
    }
}
