//! Per-turn duplicate ledger.
//!
//! Grows monotonically during a turn and is only cleared when the next turn starts.

use std::collections::HashSet;

use cartpilot_core_types::{ThreadId, ToolId};
use sha2::{Digest, Sha256};

use crate::events::Fragment;

const FINGERPRINT_LEN: usize = 16;

/// Short stable hash of a payload. Works on any UTF-8 text.
pub fn fingerprint(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    let mut hex = hex::encode(digest);
    hex.truncate(FINGERPRINT_LEN);
    hex
}

/// Identity of a free-text fragment within a turn.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FragmentKey {
    pub tag: String,
    pub origin_node: String,
    pub fingerprint: String,
    pub thread_id: ThreadId,
}

impl FragmentKey {
    pub fn of(fragment: &Fragment) -> Self {
        Self {
            tag: fragment.tag.clone(),
            origin_node: fragment.origin_node.clone().unwrap_or_default(),
            fingerprint: fingerprint(&fragment.content),
            thread_id: fragment.thread_id.clone(),
        }
    }

    pub fn as_key_string(&self) -> String {
        format!(
            "{}_{}_{}_{}",
            self.tag, self.origin_node, self.fingerprint, self.thread_id
        )
    }
}

#[derive(Debug, Default)]
pub struct DedupLedger {
    fragments: HashSet<FragmentKey>,
    tool_statuses: HashSet<String>,
    tool_calls: HashSet<(ThreadId, ToolId)>,
}

impl DedupLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the fragment is new this turn.
    pub fn accept_fragment(&mut self, key: FragmentKey) -> bool {
        self.fragments.insert(key)
    }

    /// Tool lines are compared on exact content, never on fingerprint.
    pub fn accept_tool_status(&mut self, content: &str) -> bool {
        if self.tool_statuses.contains(content) {
            return false;
        }
        self.tool_statuses.insert(content.to_string())
    }

    pub fn accept_tool_call(&mut self, thread_id: &ThreadId, tool_id: &ToolId) -> bool {
        self.tool_calls.insert((thread_id.clone(), tool_id.clone()))
    }

    pub fn clear(&mut self) {
        self.fragments.clear();
        self.tool_statuses.clear();
        self.tool_calls.clear();
    }

    pub fn len(&self) -> usize {
        self.fragments.len() + self.tool_statuses.len() + self.tool_calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
