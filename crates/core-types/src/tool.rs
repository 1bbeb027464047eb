use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{CoreError, ImagePayload, ThreadId, ToolId};

/// Browser tools the assistant may call.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    AddToCart,
    ScrollPage,
    SetPriceRange,
    SearchPage,
    ClickElement,
    ScreenCapture,
    Checkout,
    NavigateToCart,
}

impl ToolName {
    pub const ALL: [ToolName; 8] = [
        ToolName::AddToCart,
        ToolName::ScrollPage,
        ToolName::SetPriceRange,
        ToolName::SearchPage,
        ToolName::ClickElement,
        ToolName::ScreenCapture,
        ToolName::Checkout,
        ToolName::NavigateToCart,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::AddToCart => "add_to_cart",
            ToolName::ScrollPage => "scroll_page",
            ToolName::SetPriceRange => "set_price_range",
            ToolName::SearchPage => "search_page",
            ToolName::ClickElement => "click_element",
            ToolName::ScreenCapture => "screen_capture",
            ToolName::Checkout => "checkout",
            ToolName::NavigateToCart => "navigate_to_cart",
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolName::ALL
            .into_iter()
            .find(|tool| tool.as_str() == s)
            .ok_or_else(|| CoreError::UnknownTool(s.to_string()))
    }
}

/// A structured request from the assistant to perform a browser-side action.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub thread_id: ThreadId,
    pub tool_id: ToolId,
    /// Raw name as sent by the assistant; unknown names still get a failed result.
    pub tool_name: String,
    #[serde(default)]
    pub args: Value,
}

impl ToolCallRequest {
    pub fn new(
        thread_id: impl Into<ThreadId>,
        tool_id: impl Into<ToolId>,
        tool_name: impl Into<String>,
        args: Value,
    ) -> Self {
        Self {
            thread_id: thread_id.into(),
            tool_id: tool_id.into(),
            tool_name: tool_name.into(),
            args,
        }
    }

    pub fn tool(&self) -> Result<ToolName, CoreError> {
        self.tool_name.parse()
    }
}

/// Outcome of exactly one accepted [`ToolCallRequest`].
#[derive(Clone, Debug, PartialEq)]
pub struct ToolCallResult {
    pub thread_id: ThreadId,
    pub tool_id: ToolId,
    pub tool_name: String,
    pub success: bool,
    pub evidence: Option<ImagePayload>,
    pub error: Option<String>,
}

impl ToolCallResult {
    pub fn success(request: &ToolCallRequest) -> Self {
        Self {
            thread_id: request.thread_id.clone(),
            tool_id: request.tool_id.clone(),
            tool_name: request.tool_name.clone(),
            success: true,
            evidence: None,
            error: None,
        }
    }

    pub fn failure(request: &ToolCallRequest, error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::success(request)
        }
    }

    pub fn with_evidence(mut self, evidence: Option<ImagePayload>) -> Self {
        self.evidence = evidence;
        self
    }

    pub fn to_wire(&self) -> ToolResultWire {
        ToolResultWire {
            thread_id: self.thread_id.0.clone(),
            tool_id: self.tool_id.0.clone(),
            tool_name: self.tool_name.clone(),
            success: self.success,
            screenshot_data: self
                .evidence
                .as_ref()
                .map(|image| image.base64_body().to_string()),
            error: self.error.clone(),
        }
    }
}

/// Outbound tool-result body. Screenshot evidence is bare base64.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResultWire {
    pub thread_id: String,
    pub tool_id: String,
    pub tool_name: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tool_names_parse_from_wire() {
        for tool in ToolName::ALL {
            assert_eq!(tool.as_str().parse::<ToolName>().unwrap(), tool);
        }
        assert_eq!(
            "fly_to_moon".parse::<ToolName>(),
            Err(CoreError::UnknownTool("fly_to_moon".into()))
        );
    }

    #[test]
    fn wire_result_strips_data_uri() {
        let request = ToolCallRequest::new("th", "t1", "scroll_page", json!({}));
        let result = ToolCallResult::success(&request)
            .with_evidence(Some(ImagePayload::png(&[9, 9], "evidence.png")));
        let wire = serde_json::to_value(result.to_wire()).unwrap();
        assert_eq!(wire["tool_id"], "t1");
        assert_eq!(wire["success"], true);
        assert_eq!(wire["screenshot_data"], "CQk=");
        assert!(wire.get("error").is_none());
    }

    #[test]
    fn failed_result_keeps_message() {
        let request = ToolCallRequest::new("th", "t2", "checkout", json!({}));
        let wire = ToolCallResult::failure(&request, "no button").to_wire();
        assert!(!wire.success);
        assert_eq!(wire.error.as_deref(), Some("no button"));
        assert!(wire.screenshot_data.is_none());
    }
}
