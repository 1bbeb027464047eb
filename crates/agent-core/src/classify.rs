//! Fragment classification.
//!
//! The producer's tag decides. Only untagged partial chunks fall back to the
//! glyph and origin heuristic older backends rely on.

use crate::events::{Fragment, FragmentKind};

/// Origin node older backends use for browser tool progress.
pub const BROWSER_TOOLS_NODE: &str = "browser_tools";

const STATUS_GLYPHS: [char; 3] = ['🔧', '✅', '❌'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentClass {
    /// Finalized tool line, deduplicated on exact content
    ToolStatus,
    /// Complete assistant message
    AssistantMessage,
    /// Live preview only, never written to the transcript
    Partial,
}

pub fn classify(fragment: &Fragment) -> FragmentClass {
    match fragment.kind {
        FragmentKind::ToolStatus => FragmentClass::ToolStatus,
        FragmentKind::Message => FragmentClass::AssistantMessage,
        FragmentKind::Partial
            if looks_like_tool_status(&fragment.content, fragment.origin_node.as_deref()) =>
        {
            FragmentClass::ToolStatus
        }
        FragmentKind::Partial => FragmentClass::Partial,
    }
}

pub fn looks_like_tool_status(content: &str, origin_node: Option<&str>) -> bool {
    STATUS_GLYPHS.iter().any(|glyph| content.contains(*glyph))
        || content.contains("Browser action")
        || origin_node == Some(BROWSER_TOOLS_NODE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment(kind: FragmentKind, node: Option<&str>, content: &str) -> Fragment {
        Fragment {
            thread_id: "t".into(),
            origin_node: node.map(str::to_string),
            kind,
            tag: String::new(),
            content: content.to_string(),
        }
    }

    #[test]
    fn structured_tags_win() {
        assert_eq!(
            classify(&fragment(FragmentKind::Message, None, "✅ done")),
            FragmentClass::AssistantMessage
        );
        assert_eq!(
            classify(&fragment(FragmentKind::ToolStatus, None, "working")),
            FragmentClass::ToolStatus
        );
    }

    #[test]
    fn untagged_chunks_use_glyphs_and_origin() {
        assert_eq!(
            classify(&fragment(FragmentKind::Partial, None, "🔧 Executing checkout")),
            FragmentClass::ToolStatus
        );
        assert_eq!(
            classify(&fragment(FragmentKind::Partial, Some("browser_tools"), "scrolling")),
            FragmentClass::ToolStatus
        );
        assert_eq!(
            classify(&fragment(FragmentKind::Partial, Some("agent"), "Here are")),
            FragmentClass::Partial
        );
    }
}
