//! Tool status lines and who reported them.
//!
//! A tool invocation can be reported twice: once by the agent when it runs
//! the call, and once by the assistant, which narrates its own tool use. Both
//! reports of one invocation share a single transcript line.

use serde::{Deserialize, Serialize};

/// Who wrote a status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reporter {
    /// The agent, while executing the call
    Local,
    /// The assistant's status fragments
    Assistant,
}

impl Reporter {
    pub fn other(self) -> Self {
        match self {
            Reporter::Local => Reporter::Assistant,
            Reporter::Assistant => Reporter::Local,
        }
    }
}

/// How far one reporter got on one invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Report {
    #[default]
    None,
    Started,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusPhase {
    /// `🔧` line
    Start,
    /// `✅` or `❌` line
    Finish,
}

impl StatusPhase {
    pub fn of(content: &str) -> Option<Self> {
        if content.contains('✅') || content.contains('❌') {
            Some(StatusPhase::Finish)
        } else if content.contains('🔧') {
            Some(StatusPhase::Start)
        } else {
            None
        }
    }

    fn report(self) -> Report {
        match self {
            StatusPhase::Start => Report::Started,
            StatusPhase::Finish => Report::Finished,
        }
    }
}

/// The invocation a tool entry follows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolLine {
    pub tool: String,
    pub local: Report,
    pub assistant: Report,
}

impl ToolLine {
    pub fn new(tool: impl Into<String>, reporter: Reporter, phase: StatusPhase) -> Self {
        let mut line = Self {
            tool: tool.into(),
            local: Report::None,
            assistant: Report::None,
        };
        line.record(reporter, phase);
        line
    }

    pub fn report(&self, reporter: Reporter) -> Report {
        match reporter {
            Reporter::Local => self.local,
            Reporter::Assistant => self.assistant,
        }
    }

    pub fn record(&mut self, reporter: Reporter, phase: StatusPhase) {
        let report = phase.report();
        match reporter {
            Reporter::Local => self.local = report,
            Reporter::Assistant => self.assistant = report,
        }
    }

    /// Reported by the other side only, so `reporter` may still join it.
    pub fn awaits(&self, reporter: Reporter) -> bool {
        self.report(reporter) == Report::None && self.report(reporter.other()) != Report::None
    }
}

/// Tool name a status text is about, if it names one.
///
/// Understands the agent's own lines (`🔧 Executing scroll_page`,
/// `✅ scroll_page completed`, `❌ scroll_page failed: ..`) and the
/// assistant's (`🔧 Executing browser action: scroll_page`,
/// `✅ Browser action 'scroll_page' completed successfully`).
pub fn status_tool(content: &str) -> Option<&str> {
    let text = content.trim_start_matches(|c: char| !c.is_ascii_alphanumeric());
    let candidate = if let Some((_, quoted)) = text.split_once('\'') {
        quoted.split('\'').next()?
    } else if let Some(rest) = text.strip_prefix("Executing ") {
        let rest = rest.strip_prefix("browser action: ").unwrap_or(rest);
        rest.split_whitespace().next()?
    } else {
        let (first, rest) = text.split_once(' ')?;
        if !(rest.starts_with("completed") || rest.starts_with("failed")) {
            return None;
        }
        first
    };
    is_tool_name(candidate).then_some(candidate)
}

fn is_tool_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}
