//! Wire framing.
//!
//! Text frames carry `{"event": name, "data": object}`. A user turn with an
//! image may instead be a binary frame: a 4-byte big-endian header length, the
//! JSON envelope, then the raw image bytes.

use cartpilot_core_types::{ImagePayload, ThreadId};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::errors::ChannelError;

/// Event name of an outbound user turn.
pub const CHAT_STREAM_EVENT: &str = "chat_stream";

const HEADER_LEN: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    pub fn to_text(&self) -> Result<String, ChannelError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_text(text: &str) -> Result<Self, ChannelError> {
        let envelope: Envelope = serde_json::from_str(text)?;
        if envelope.event.is_empty() {
            return Err(ChannelError::Frame("empty event name".to_string()));
        }
        Ok(envelope)
    }

    /// Binary frame with `payload` appended after the envelope.
    pub fn to_binary(&self, payload: &[u8]) -> Result<Vec<u8>, ChannelError> {
        let header = serde_json::to_vec(self)?;
        let header_len = u32::try_from(header.len())
            .map_err(|_| ChannelError::Frame("envelope too large".to_string()))?;
        let mut frame = Vec::with_capacity(HEADER_LEN + header.len() + payload.len());
        frame.extend_from_slice(&header_len.to_be_bytes());
        frame.extend_from_slice(&header);
        frame.extend_from_slice(payload);
        Ok(frame)
    }

    pub fn from_binary(frame: &[u8]) -> Result<(Self, Vec<u8>), ChannelError> {
        if frame.len() < HEADER_LEN {
            return Err(ChannelError::Frame("binary frame shorter than header".to_string()));
        }
        let (len_bytes, rest) = frame.split_at(HEADER_LEN);
        let mut raw = [0u8; HEADER_LEN];
        raw.copy_from_slice(len_bytes);
        let header_len = u32::from_be_bytes(raw) as usize;
        if rest.len() < header_len {
            return Err(ChannelError::Frame(format!(
                "header length {header_len} exceeds frame of {} bytes",
                rest.len()
            )));
        }
        let (header, payload) = rest.split_at(header_len);
        let envelope: Envelope = serde_json::from_slice(header)?;
        Ok((envelope, payload.to_vec()))
    }
}

/// One user turn for the assistant.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnMessage {
    pub message: String,
    pub thread_id: ThreadId,
    pub image: Option<ImagePayload>,
}

/// A frame ready for the socket.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundFrame {
    Text(String),
    Binary(Vec<u8>),
}

impl TurnMessage {
    pub fn new(message: impl Into<String>, thread_id: ThreadId, image: Option<ImagePayload>) -> Self {
        Self {
            message: message.into(),
            thread_id,
            image,
        }
    }

    pub fn encode(&self, binary_frames: bool) -> Result<OutboundFrame, ChannelError> {
        let mut data = json!({
            "message": self.message,
            "thread_id": self.thread_id.as_str(),
        });

        match &self.image {
            Some(image) if binary_frames => {
                data["image_mime"] = json!(image.mime_type);
                data["image_name"] = json!(image.file_name);
                let bytes = image.decode()?;
                let frame = Envelope::new(CHAT_STREAM_EVENT, data).to_binary(&bytes)?;
                Ok(OutboundFrame::Binary(frame))
            }
            Some(image) => {
                data["image_data"] = json!(image.data_uri);
                Ok(OutboundFrame::Text(
                    Envelope::new(CHAT_STREAM_EVENT, data).to_text()?,
                ))
            }
            None => Ok(OutboundFrame::Text(
                Envelope::new(CHAT_STREAM_EVENT, data).to_text()?,
            )),
        }
    }
}
