use base64::{engine::general_purpose::STANDARD as Base64, Engine as _};
use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Image attached to a user turn, a transcript entry or a tool result.
///
/// The full `data:` URI is kept for display; the wire form is the bare base64 body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePayload {
    pub data_uri: String,
    pub mime_type: String,
    pub file_name: String,
}

impl ImagePayload {
    pub fn from_bytes(bytes: &[u8], mime_type: &str, file_name: &str) -> Self {
        Self::from_base64(&Base64.encode(bytes), mime_type, file_name)
    }

    pub fn from_base64(body: &str, mime_type: &str, file_name: &str) -> Self {
        Self {
            data_uri: format!("data:{mime_type};base64,{body}"),
            mime_type: mime_type.to_string(),
            file_name: file_name.to_string(),
        }
    }

    pub fn png(bytes: &[u8], file_name: &str) -> Self {
        Self::from_bytes(bytes, "image/png", file_name)
    }

    /// Parses a `data:<mime>;base64,<body>` URI.
    pub fn from_data_uri(data_uri: &str, file_name: &str) -> Result<Self, CoreError> {
        let rest = data_uri
            .strip_prefix("data:")
            .ok_or_else(|| CoreError::InvalidImage("missing data: prefix".to_string()))?;
        let (meta, _) = rest
            .split_once(',')
            .ok_or_else(|| CoreError::InvalidImage("missing payload separator".to_string()))?;
        let mime_type = meta.strip_suffix(";base64").ok_or_else(|| {
            CoreError::InvalidImage(format!("unsupported data uri encoding: {meta}"))
        })?;
        Ok(Self {
            data_uri: data_uri.to_string(),
            mime_type: mime_type.to_string(),
            file_name: file_name.to_string(),
        })
    }

    /// Base64 body without the media-type prefix.
    pub fn base64_body(&self) -> &str {
        match self.data_uri.split_once(',') {
            Some((prefix, body)) if prefix.starts_with("data:") => body,
            _ => &self.data_uri,
        }
    }

    pub fn decode(&self) -> Result<Vec<u8>, CoreError> {
        Base64
            .decode(self.base64_body())
            .map_err(|err| CoreError::InvalidImage(err.to_string()))
    }

    pub fn is_empty(&self) -> bool {
        self.base64_body().is_empty()
    }
}
