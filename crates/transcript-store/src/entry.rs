use cartpilot_core_types::{ImagePayload, Role};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::status::ToolLine;

/// One line of the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptEntry {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImagePayload>,
    /// Still part of a running turn; cleared when the turn completes
    pub is_streaming: bool,
    pub is_tool_message: bool,
    pub is_error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_node: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dedup_key: Option<String>,
    /// Tool invocation a status line follows
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_line: Option<ToolLine>,
}

impl TranscriptEntry {
    fn base(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            image: None,
            is_streaming: false,
            is_tool_message: false,
            is_error: false,
            origin_node: None,
            timestamp: Utc::now(),
            dedup_key: None,
            tool_line: None,
        }
    }

    pub fn user(content: impl Into<String>, image: Option<ImagePayload>) -> Self {
        Self {
            image,
            ..Self::base(Role::User, content)
        }
    }

    /// Finalized assistant reply.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::base(Role::Assistant, content)
    }

    pub fn streaming_assistant(content: impl Into<String>) -> Self {
        Self {
            is_streaming: true,
            ..Self::base(Role::Assistant, content)
        }
    }

    /// Finalized tool status line.
    pub fn tool(content: impl Into<String>) -> Self {
        Self {
            is_tool_message: true,
            ..Self::base(Role::Tool, content)
        }
    }

    pub fn error(message: &str) -> Self {
        Self {
            is_error: true,
            ..Self::base(Role::Assistant, format!("Error: {message}"))
        }
    }

    pub fn with_image(mut self, image: Option<ImagePayload>) -> Self {
        self.image = image;
        self
    }

    pub fn with_origin(mut self, node: Option<String>) -> Self {
        self.origin_node = node;
        self
    }

    pub fn with_dedup_key(mut self, key: Option<String>) -> Self {
        self.dedup_key = key;
        self
    }

    pub fn with_tool_line(mut self, line: ToolLine) -> Self {
        self.tool_line = Some(line);
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// An in-progress tool line that a completion may merge into.
    pub fn is_open_tool_status(&self) -> bool {
        self.is_tool_message
            && self.content.contains('🔧')
            && !self.content.contains('✅')
            && !self.content.contains('❌')
    }

    /// The invocation this line follows, when it is one of `tool`'s.
    pub fn line_for(&self, tool: &str) -> Option<&ToolLine> {
        self.tool_line.as_ref().filter(|line| line.tool == tool)
    }
}

/// What an append did to the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// New entry at this index
    Appended(usize),
    /// Folded into the existing entry at this index
    Merged(usize),
    Duplicate,
}

impl AppendOutcome {
    pub fn changed(&self) -> bool {
        !matches!(self, AppendOutcome::Duplicate)
    }
}
