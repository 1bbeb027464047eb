//! Core types for locator system

use action_primitives::{ElementHandle, ElementInfo, Scope};
use serde::{Deserialize, Serialize};

/// Locator strategy enumeration, in fallback order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocatorStrategy {
    /// Site-specific selector list
    Structural,

    /// `aria-label`/`title`/`alt`/`class`/`id` patterns built from the target text
    AttributePattern,

    /// Case-insensitive text match over clickable elements
    TextContent,
}

impl LocatorStrategy {
    /// Get strategy name as string
    pub fn name(&self) -> &'static str {
        match self {
            LocatorStrategy::Structural => "structural",
            LocatorStrategy::AttributePattern => "attribute-pattern",
            LocatorStrategy::TextContent => "text-content",
        }
    }

    /// Get all strategies in fallback order
    pub fn fallback_chain() -> [LocatorStrategy; 3] {
        [
            LocatorStrategy::Structural,
            LocatorStrategy::AttributePattern,
            LocatorStrategy::TextContent,
        ]
    }
}

/// Free-text match over a candidate set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextQuery {
    /// Selector producing the candidate elements
    pub candidates: String,
    /// Lowercase terms; any of them matching is enough
    pub needles: Vec<String>,
    /// Lowercase terms that disqualify a candidate when present in its text
    pub excluded: Vec<String>,
}

/// What to look for, and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocateQuery {
    /// Human-readable target, used in logs and failure messages
    pub label: String,
    pub scope: Scope,
    pub selectors: Vec<String>,
    pub attribute_term: Option<String>,
    pub text: Option<TextQuery>,
}

impl LocateQuery {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            scope: Scope::Document,
            selectors: Vec::new(),
            attribute_term: None,
            text: None,
        }
    }

    pub fn within(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn selectors<I, S>(mut self, selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selectors = selectors.into_iter().map(Into::into).collect();
        self
    }

    pub fn attribute_term(mut self, term: impl Into<String>) -> Self {
        self.attribute_term = Some(term.into());
        self
    }

    pub fn text<I, S>(mut self, candidates: impl Into<String>, needles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.text = Some(TextQuery {
            candidates: candidates.into(),
            needles: needles
                .into_iter()
                .map(|needle| needle.as_ref().to_lowercase())
                .collect(),
            excluded: Vec::new(),
        });
        self
    }

    pub fn excluding<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if let Some(text) = self.text.as_mut() {
            text.excluded = words
                .into_iter()
                .map(|word| word.as_ref().to_lowercase())
                .collect();
        }
        self
    }

    /// True when at least one strategy has something to work with.
    pub fn is_actionable(&self) -> bool {
        !self.selectors.is_empty()
            || self
                .attribute_term
                .as_deref()
                .is_some_and(|term| !term.trim().is_empty())
            || self
                .text
                .as_ref()
                .is_some_and(|text| !text.needles.is_empty())
    }
}

/// A located, visible element.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub element: ElementHandle,
    pub info: ElementInfo,
    pub strategy: LocatorStrategy,
    /// Selector that produced the match
    pub selector: String,
}
