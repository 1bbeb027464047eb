//! One-shot HTTP backend: the degraded chat path and history fetch.
//!
//! A turn sent here gets a single synchronous reply and no tool calls.

use std::time::Duration;

use async_trait::async_trait;
use cartpilot_core_types::{ImagePayload, Role, ThreadId};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use crate::{config::ChannelConfig, errors::ChannelError};

/// File name given to images loaded from history.
pub const HISTORY_IMAGE_NAME: &str = "Chat Image";
const HISTORY_IMAGE_MIME: &str = "image/jpeg";
/// Reply text used when the backend answers without a `reply` string.
pub const NO_VALID_RESPONSE: &str = "No valid response.";

/// A message as stored by the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryMessage {
    pub role: Role,
    pub content: String,
    pub image: Option<ImagePayload>,
}

#[async_trait]
pub trait Backend: Send + Sync {
    /// Send one turn and wait for the reply text.
    async fn send_turn(
        &self,
        message: &str,
        thread_id: &ThreadId,
        image: Option<&ImagePayload>,
    ) -> Result<String, ChannelError>;

    /// Ordered history of a thread. Empty if the thread is unknown.
    async fn fetch_history(&self, thread_id: &ThreadId) -> Result<Vec<HistoryMessage>, ChannelError>;
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    reply: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct HistoryBody {
    #[serde(default)]
    messages: Vec<HistoryWire>,
}

#[derive(Deserialize)]
struct HistoryWire {
    role: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    image: Option<String>,
}

impl From<HistoryWire> for HistoryMessage {
    fn from(wire: HistoryWire) -> Self {
        let image = wire
            .image
            .filter(|body| !body.is_empty())
            .map(|body| match ImagePayload::from_data_uri(&body, HISTORY_IMAGE_NAME) {
                Ok(image) => image,
                Err(_) => ImagePayload::from_base64(&body, HISTORY_IMAGE_MIME, HISTORY_IMAGE_NAME),
            });
        Self {
            role: Role::from_history(&wire.role),
            content: wire.content,
            image,
        }
    }
}

pub struct HttpBackend {
    client: reqwest::Client,
    chat_url: Url,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ChannelError> {
        let base = Url::parse(base_url)?;
        let chat_url = base.join("chat")?;
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, chat_url })
    }

    pub fn from_config(config: &ChannelConfig) -> Result<Self, ChannelError> {
        let base = if config.http_base_url.ends_with('/') {
            config.http_base_url.clone()
        } else {
            format!("{}/", config.http_base_url)
        };
        Self::new(&base, Duration::from_secs(120))
    }

    pub fn chat_url(&self) -> &Url {
        &self.chat_url
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn send_turn(
        &self,
        message: &str,
        thread_id: &ThreadId,
        image: Option<&ImagePayload>,
    ) -> Result<String, ChannelError> {
        if message.trim().is_empty() && image.is_none() {
            return Err(ChannelError::Backend(
                "Please enter some text or upload an image.".to_string(),
            ));
        }

        let mut form = Form::new().text("thread_id", thread_id.to_string());
        if !message.trim().is_empty() {
            form = form.text("message", message.to_string());
        }
        if let Some(image) = image {
            let part = Part::bytes(image.decode()?)
                .file_name(image.file_name.clone())
                .mime_str(&image.mime_type)?;
            form = form.part("image", part);
        }

        info!(target: "channel", %thread_id, url = %self.chat_url, "Sending turn over HTTP");
        let response = self
            .client
            .post(self.chat_url.clone())
            .multipart(form)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ChannelError::Backend(format!("HTTP error! status: {status}")));
        }

        let body: ChatReply = response.json().await?;
        if let Some(error) = body.error {
            return Err(ChannelError::Backend(error));
        }
        Ok(body
            .reply
            .unwrap_or_else(|| NO_VALID_RESPONSE.to_string()))
    }

    async fn fetch_history(&self, thread_id: &ThreadId) -> Result<Vec<HistoryMessage>, ChannelError> {
        let mut url = self.chat_url.clone();
        url.query_pairs_mut().append_pair("thread_id", thread_id.as_str());

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ChannelError::Backend(format!("HTTP error! status: {status}")));
        }
        let body: HistoryBody = response.json().await?;
        debug!(target: "channel", %thread_id, messages = body.messages.len(), "History loaded");
        Ok(body.messages.into_iter().map(HistoryMessage::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_url_keeps_base_path() {
        let config = ChannelConfig {
            http_base_url: "http://127.0.0.1:5000/api".to_string(),
            ..ChannelConfig::default()
        };
        let backend = HttpBackend::from_config(&config).unwrap();
        assert_eq!(backend.chat_url().as_str(), "http://127.0.0.1:5000/api/chat");
    }

    #[test]
    fn history_images_are_jpeg_chat_images() {
        let wire = HistoryWire {
            role: "assistant".to_string(),
            content: "here".to_string(),
            image: Some("AAAA".to_string()),
        };
        let message = HistoryMessage::from(wire);
        let image = message.image.unwrap();
        assert_eq!(image.mime_type, "image/jpeg");
        assert_eq!(image.file_name, HISTORY_IMAGE_NAME);
        assert_eq!(image.data_uri, "data:image/jpeg;base64,AAAA");
    }

    #[test]
    fn history_roles_map_to_transcript_roles() {
        let wire = |role: &str| HistoryWire {
            role: role.to_string(),
            content: String::new(),
            image: None,
        };
        assert_eq!(HistoryMessage::from(wire("user")).role, Role::User);
        assert_eq!(HistoryMessage::from(wire("ai")).role, Role::Assistant);
        assert!(HistoryMessage::from(wire("user")).image.is_none());
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(matches!(
            HttpBackend::new("not a url", Duration::from_secs(1)),
            Err(ChannelError::InvalidUrl(_))
        ));
    }
}
