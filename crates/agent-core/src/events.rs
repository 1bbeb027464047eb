//! Inbound stream events, decoded once at the channel boundary.

use cartpilot_core_types::{ThreadId, ToolCallRequest};
use serde::Deserialize;
use serde_json::Value;

use crate::errors::ReconcileError;

/// Producer's tag on a fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FragmentKind {
    /// `tool_call` / `tool_status`: a tool progress line
    ToolStatus,
    /// `message`: a complete assistant message
    Message,
    /// Anything else: a transient chunk of the answer being written
    Partial,
}

impl FragmentKind {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "tool_call" | "tool_status" => FragmentKind::ToolStatus,
            "message" => FragmentKind::Message,
            _ => FragmentKind::Partial,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub thread_id: ThreadId,
    pub origin_node: Option<String>,
    pub kind: FragmentKind,
    /// Tag as sent, part of the dedup identity
    pub tag: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    LifecycleStart {
        thread_id: ThreadId,
    },
    Fragment(Fragment),
    ToolCall(ToolCallRequest),
    /// The producer echoing a tool's result as text
    ToolResultEcho(Fragment),
    LifecycleComplete {
        thread_id: ThreadId,
        final_content: Option<String>,
    },
    Error {
        thread_id: Option<ThreadId>,
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    LifecycleStart,
    Fragment,
    ToolCall,
    ToolResultEcho,
    LifecycleComplete,
    Error,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::LifecycleStart => "lifecycle_start",
            EventKind::Fragment => "fragment",
            EventKind::ToolCall => "tool_call",
            EventKind::ToolResultEcho => "tool_result_echo",
            EventKind::LifecycleComplete => "lifecycle_complete",
            EventKind::Error => "error",
        }
    }
}

/// Event names the decoder accepts, abstract and backend spelling.
pub const INBOUND_EVENT_NAMES: [&str; 9] = [
    "lifecycle_start",
    "stream_start",
    "fragment",
    "stream_update",
    "tool_call",
    "browser_tool_call",
    "lifecycle_complete",
    "stream_complete",
    "error",
];

#[derive(Deserialize)]
struct ThreadWire {
    #[serde(default)]
    thread_id: String,
}

#[derive(Deserialize)]
struct FragmentWire {
    #[serde(default)]
    thread_id: String,
    #[serde(default)]
    node: Option<String>,
    #[serde(default, rename = "type")]
    tag: String,
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct ToolCallWire {
    #[serde(default)]
    thread_id: String,
    tool_id: String,
    tool_name: String,
    #[serde(default)]
    tool_args: Value,
}

#[derive(Deserialize)]
struct CompleteWire {
    #[serde(default)]
    thread_id: String,
    #[serde(default)]
    final_content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorWire {
    #[serde(default)]
    thread_id: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

fn parse<T: serde::de::DeserializeOwned>(event: &str, data: Value) -> Result<T, ReconcileError> {
    let data = if data.is_null() {
        Value::Object(Default::default())
    } else {
        data
    };
    serde_json::from_value(data).map_err(|err| ReconcileError::decode(event, err.to_string()))
}

impl StreamEvent {
    /// Decode a named event. Unknown names yield `Ok(None)`.
    pub fn decode(name: &str, data: Value) -> Result<Option<Self>, ReconcileError> {
        let event = match name {
            "lifecycle_start" | "stream_start" => {
                let wire: ThreadWire = parse(name, data)?;
                StreamEvent::LifecycleStart {
                    thread_id: wire.thread_id.into(),
                }
            }
            "fragment" | "stream_update" => {
                let wire: FragmentWire = parse(name, data)?;
                let fragment = Fragment {
                    thread_id: wire.thread_id.into(),
                    origin_node: wire.node.filter(|node| !node.is_empty()),
                    kind: FragmentKind::from_tag(&wire.tag),
                    content: wire.content,
                    tag: wire.tag,
                };
                if fragment.tag == "tool_result" {
                    StreamEvent::ToolResultEcho(fragment)
                } else {
                    StreamEvent::Fragment(fragment)
                }
            }
            "tool_call" | "browser_tool_call" => {
                let wire: ToolCallWire = parse(name, data)?;
                if wire.tool_id.trim().is_empty() {
                    return Err(ReconcileError::decode(name, "empty tool_id"));
                }
                StreamEvent::ToolCall(ToolCallRequest::new(
                    wire.thread_id,
                    wire.tool_id,
                    wire.tool_name,
                    wire.tool_args,
                ))
            }
            "lifecycle_complete" | "stream_complete" => {
                let wire: CompleteWire = parse(name, data)?;
                StreamEvent::LifecycleComplete {
                    thread_id: wire.thread_id.into(),
                    final_content: wire.final_content,
                }
            }
            "error" => {
                let wire: ErrorWire = parse(name, data)?;
                StreamEvent::Error {
                    thread_id: wire.thread_id.map(ThreadId::from),
                    message: wire
                        .message
                        .or(wire.error)
                        .unwrap_or_else(|| "Unknown error".to_string()),
                }
            }
            _ => return Ok(None),
        };
        Ok(Some(event))
    }

    pub fn kind(&self) -> EventKind {
        match self {
            StreamEvent::LifecycleStart { .. } => EventKind::LifecycleStart,
            StreamEvent::Fragment(_) => EventKind::Fragment,
            StreamEvent::ToolCall(_) => EventKind::ToolCall,
            StreamEvent::ToolResultEcho(_) => EventKind::ToolResultEcho,
            StreamEvent::LifecycleComplete { .. } => EventKind::LifecycleComplete,
            StreamEvent::Error { .. } => EventKind::Error,
        }
    }

    pub fn thread_id(&self) -> Option<&ThreadId> {
        match self {
            StreamEvent::LifecycleStart { thread_id }
            | StreamEvent::LifecycleComplete { thread_id, .. } => Some(thread_id),
            StreamEvent::Fragment(fragment) | StreamEvent::ToolResultEcho(fragment) => {
                Some(&fragment.thread_id)
            }
            StreamEvent::ToolCall(request) => Some(&request.thread_id),
            StreamEvent::Error { thread_id, .. } => thread_id.as_ref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn backend_names_decode_to_the_same_variants() {
        let start = StreamEvent::decode("stream_start", json!({"thread_id": "a"}))
            .unwrap()
            .unwrap();
        assert_eq!(start.kind(), EventKind::LifecycleStart);

        let done = StreamEvent::decode("lifecycle_complete", json!({"thread_id": "a"}))
            .unwrap()
            .unwrap();
        assert_eq!(done.kind(), EventKind::LifecycleComplete);
    }

    #[test]
    fn fragment_tags_map_to_kinds() {
        let decode = |tag: &str| {
            StreamEvent::decode(
                "stream_update",
                json!({"thread_id": "a", "node": "agent", "type": tag, "content": "x"}),
            )
            .unwrap()
            .unwrap()
        };

        assert_eq!(decode("tool_result").kind(), EventKind::ToolResultEcho);
        match decode("tool_status") {
            StreamEvent::Fragment(fragment) => assert_eq!(fragment.kind, FragmentKind::ToolStatus),
            other => panic!("unexpected {other:?}"),
        }
        match decode("message") {
            StreamEvent::Fragment(fragment) => assert_eq!(fragment.kind, FragmentKind::Message),
            other => panic!("unexpected {other:?}"),
        }
        match decode("token") {
            StreamEvent::Fragment(fragment) => assert_eq!(fragment.kind, FragmentKind::Partial),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn tool_call_carries_arguments() {
        let event = StreamEvent::decode(
            "browser_tool_call",
            json!({
                "thread_id": "a",
                "tool_id": "t1",
                "tool_name": "scroll_page",
                "tool_args": {"direction": "down", "amount": 300}
            }),
        )
        .unwrap()
        .unwrap();

        let StreamEvent::ToolCall(request) = event else {
            panic!("expected tool call");
        };
        assert_eq!(request.tool_id.as_str(), "t1");
        assert_eq!(request.args["amount"], 300);
    }

    #[test]
    fn tool_call_without_id_is_rejected() {
        let err = StreamEvent::decode("tool_call", json!({"tool_name": "checkout"})).unwrap_err();
        assert!(matches!(err, ReconcileError::Decode { .. }));
    }

    #[test]
    fn error_message_falls_back_to_error_field() {
        let event = StreamEvent::decode("error", json!({"error": "boom"}))
            .unwrap()
            .unwrap();
        assert_eq!(
            event,
            StreamEvent::Error {
                thread_id: None,
                message: "boom".to_string()
            }
        );
    }

    #[test]
    fn unknown_events_are_ignored() {
        assert!(StreamEvent::decode("heartbeat", json!({})).unwrap().is_none());
    }
}
