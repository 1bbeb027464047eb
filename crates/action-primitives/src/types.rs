//! Core types for page interaction

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque reference to an element held by the page driver.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementHandle(pub String);

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "el:{}", self.0)
    }
}

/// Where a selector query runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    Document,
    Within(ElementHandle),
}

impl Scope {
    pub fn within(element: &ElementHandle) -> Self {
        Scope::Within(element.clone())
    }
}

/// Snapshot of the properties the locate strategies look at.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ElementInfo {
    pub tag: String,
    pub text: String,
    pub value: Option<String>,
    pub aria_label: Option<String>,
    pub title: Option<String>,
    pub id: Option<String>,
    pub class_name: Option<String>,
    pub input_type: Option<String>,
    pub width: f64,
    pub height: f64,
    pub display: String,
    pub visibility: String,
    pub opacity: String,
}

impl ElementInfo {
    /// Non-zero rendered size and a computed style that does not hide it.
    pub fn is_visible(&self) -> bool {
        self.width > 0.0
            && self.height > 0.0
            && self.display != "none"
            && self.visibility != "hidden"
            && self.opacity != "0"
    }

    /// Lowercased text, value and aria-label, the fields free-text matching runs on.
    pub fn searchable_text(&self) -> String {
        let mut parts = vec![self.text.to_lowercase()];
        if let Some(value) = &self.value {
            parts.push(value.to_lowercase());
        }
        if let Some(label) = &self.aria_label {
            parts.push(label.to_lowercase());
        }
        parts.join(" ")
    }

    pub fn describe(&self) -> String {
        match (&self.id, self.text.trim()) {
            (Some(id), _) if !id.is_empty() => format!("{}#{}", self.tag, id),
            (_, text) if !text.is_empty() => {
                let short: String = text.chars().take(40).collect();
                format!("{} '{}'", self.tag, short)
            }
            _ => self.tag.clone(),
        }
    }
}

/// Synthetic events the primitives dispatch after mutating an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DomEvent {
    Input,
    Change,
    /// Bubbling, cancelable mouse click used as a compatibility fallback
    MouseClick,
}

impl DomEvent {
    pub fn name(&self) -> &'static str {
        match self {
            DomEvent::Input => "input",
            DomEvent::Change => "change",
            DomEvent::MouseClick => "click",
        }
    }
}

/// Inline outline properties touched by highlighting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineStyle {
    pub outline: String,
    pub outline_offset: String,
}

impl InlineStyle {
    pub fn highlight() -> Self {
        Self {
            outline: "3px solid #ff6b6b".to_string(),
            outline_offset: "2px".to_string(),
        }
    }
}

/// Scroll direction requested by the assistant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollDirection {
    Up,
    Down,
}

/// Scroll behavior (smooth vs instant)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScrollBehavior {
    /// Smooth animated scroll
    #[default]
    Smooth,

    /// Instant jump to position
    Instant,
}

impl ScrollBehavior {
    pub fn as_css(&self) -> &'static str {
        match self {
            ScrollBehavior::Smooth => "smooth",
            ScrollBehavior::Instant => "instant",
        }
    }
}

/// Where the page currently is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLocation {
    pub href: String,
    pub origin: String,
    pub hostname: String,
}

impl PageLocation {
    pub fn from_href(href: &str) -> Self {
        match url::Url::parse(href) {
            Ok(parsed) => Self {
                href: href.to_string(),
                origin: parsed.origin().ascii_serialization(),
                hostname: parsed.host_str().unwrap_or_default().to_string(),
            },
            Err(_) => Self {
                href: href.to_string(),
                ..Self::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sized(width: f64, height: f64) -> ElementInfo {
        ElementInfo {
            tag: "button".into(),
            width,
            height,
            display: "block".into(),
            visibility: "visible".into(),
            opacity: "1".into(),
            ..ElementInfo::default()
        }
    }

    #[test]
    fn zero_size_is_invisible() {
        assert!(sized(10.0, 10.0).is_visible());
        assert!(!sized(0.0, 10.0).is_visible());
        assert!(!sized(10.0, 0.0).is_visible());
    }

    #[test]
    fn hidden_styles_are_invisible() {
        let mut info = sized(10.0, 10.0);
        info.display = "none".into();
        assert!(!info.is_visible());

        let mut info = sized(10.0, 10.0);
        info.visibility = "hidden".into();
        assert!(!info.is_visible());

        let mut info = sized(10.0, 10.0);
        info.opacity = "0".into();
        assert!(!info.is_visible());
    }

    #[test]
    fn location_derives_origin_and_host() {
        let location = PageLocation::from_href("https://www.amazon.com/s?k=mug");
        assert_eq!(location.origin, "https://www.amazon.com");
        assert_eq!(location.hostname, "www.amazon.com");
    }
}
