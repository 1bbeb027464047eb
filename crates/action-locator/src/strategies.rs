//! Element resolution strategies
//!
//! Three strategies in fallback order:
//! 1. Structural - site-specific selector list
//! 2. Attribute pattern - generic selectors built from the target text
//! 3. Text content - free-text match over clickable elements

use crate::{errors::LocatorError, types::*};
use action_primitives::{first_visible, ElementInfo, PageDom};
use async_trait::async_trait;
use tracing::debug;

/// Strategy trait for element resolution
#[async_trait]
pub trait Strategy: Send + Sync {
    /// First visible match for `query`, if this strategy applies and finds one
    async fn locate(
        &self,
        dom: &dyn PageDom,
        query: &LocateQuery,
    ) -> Result<Option<Resolution>, LocatorError>;

    /// Get strategy type
    fn strategy_type(&self) -> LocatorStrategy;

    /// Get strategy name
    fn name(&self) -> &'static str {
        self.strategy_type().name()
    }
}

/// Tries each selector in order; the first with a visible match wins.
async fn first_visible_by_selectors(
    dom: &dyn PageDom,
    query: &LocateQuery,
    selectors: &[String],
    strategy: LocatorStrategy,
) -> Result<Option<Resolution>, LocatorError> {
    for selector in selectors {
        let handles = dom.query_all(&query.scope, selector).await?;
        if handles.is_empty() {
            continue;
        }
        if let Some((element, info)) = first_visible(dom, &handles).await {
            debug!(selector = %selector, strategy = strategy.name(), "Selector matched");
            return Ok(Some(Resolution {
                element,
                info,
                strategy,
                selector: selector.clone(),
            }));
        }
    }
    Ok(None)
}

/// Site-specific selector list
#[derive(Debug, Default)]
pub struct StructuralStrategy;

#[async_trait]
impl Strategy for StructuralStrategy {
    async fn locate(
        &self,
        dom: &dyn PageDom,
        query: &LocateQuery,
    ) -> Result<Option<Resolution>, LocatorError> {
        first_visible_by_selectors(dom, query, &query.selectors, self.strategy_type()).await
    }

    fn strategy_type(&self) -> LocatorStrategy {
        LocatorStrategy::Structural
    }
}

/// Generic attribute patterns derived from a free-text target
#[derive(Debug, Default)]
pub struct AttributePatternStrategy;

/// Case-insensitive substring selectors for `term`.
///
/// Class and id patterns use the hyphenated form (`add to cart` → `add-to-cart`).
pub fn attribute_patterns(term: &str) -> Vec<String> {
    let term = term.trim();
    if term.is_empty() {
        return Vec::new();
    }
    let quoted = escape_attribute_value(term);
    let hyphenated = escape_attribute_value(&term.split_whitespace().collect::<Vec<_>>().join("-"));
    vec![
        format!("[aria-label*=\"{quoted}\" i]"),
        format!("[title*=\"{quoted}\" i]"),
        format!("[alt*=\"{quoted}\" i]"),
        format!("*[class*=\"{hyphenated}\" i]"),
        format!("*[id*=\"{hyphenated}\" i]"),
    ]
}

fn escape_attribute_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[async_trait]
impl Strategy for AttributePatternStrategy {
    async fn locate(
        &self,
        dom: &dyn PageDom,
        query: &LocateQuery,
    ) -> Result<Option<Resolution>, LocatorError> {
        let Some(term) = query.attribute_term.as_deref() else {
            return Ok(None);
        };
        let patterns = attribute_patterns(term);
        first_visible_by_selectors(dom, query, &patterns, self.strategy_type()).await
    }

    fn strategy_type(&self) -> LocatorStrategy {
        LocatorStrategy::AttributePattern
    }
}

/// Free-text match over clickable elements
#[derive(Debug, Default)]
pub struct TextContentStrategy;

/// Whether `info` carries any needle in its text, value, aria-label or title,
/// and none of the excluded words in its text.
pub fn text_matches(info: &ElementInfo, text: &TextQuery) -> bool {
    let own_text = info.text.to_lowercase();
    if text.excluded.iter().any(|word| own_text.contains(word)) {
        return false;
    }
    let mut haystack = info.searchable_text();
    if let Some(title) = &info.title {
        haystack.push(' ');
        haystack.push_str(&title.to_lowercase());
    }
    text.needles
        .iter()
        .any(|needle| !needle.is_empty() && haystack.contains(needle.as_str()))
}

#[async_trait]
impl Strategy for TextContentStrategy {
    async fn locate(
        &self,
        dom: &dyn PageDom,
        query: &LocateQuery,
    ) -> Result<Option<Resolution>, LocatorError> {
        let Some(text) = query.text.as_ref() else {
            return Ok(None);
        };
        if text.needles.is_empty() {
            return Ok(None);
        }

        let handles = dom.query_all(&query.scope, &text.candidates).await?;
        debug!(candidates = handles.len(), needles = ?text.needles, "Scanning text content");

        for element in handles {
            let info = match dom.describe(&element).await {
                Ok(info) => info,
                Err(err) => {
                    debug!(element = %element, %err, "Skipping undescribable element");
                    continue;
                }
            };
            if info.is_visible() && text_matches(&info, text) {
                return Ok(Some(Resolution {
                    element,
                    info,
                    strategy: self.strategy_type(),
                    selector: text.candidates.clone(),
                }));
            }
        }
        Ok(None)
    }

    fn strategy_type(&self) -> LocatorStrategy {
        LocatorStrategy::TextContent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_generic_patterns() {
        let patterns = attribute_patterns("next page");
        assert_eq!(patterns[0], "[aria-label*=\"next page\" i]");
        assert_eq!(patterns[3], "*[class*=\"next-page\" i]");
        assert_eq!(patterns[4], "*[id*=\"next-page\" i]");
        assert!(attribute_patterns("   ").is_empty());
    }

    #[test]
    fn escapes_quotes() {
        let patterns = attribute_patterns("say \"hi\"");
        assert_eq!(patterns[0], "[aria-label*=\"say \\\"hi\\\"\" i]");
    }

    #[test]
    fn text_match_honours_exclusions() {
        let query = LocateQuery::new("confirm")
            .text("button", ["add"])
            .excluding(["cancel", "remove"]);
        let text = query.text.as_ref().unwrap();

        let add = ElementInfo::visible_element("button", "Add to cart");
        let remove = ElementInfo::visible_element("button", "Remove add-on");
        let labelled = ElementInfo::visible_element("button", "").with_aria_label("Add item");

        assert!(text_matches(&add, text));
        assert!(!text_matches(&remove, text));
        assert!(text_matches(&labelled, text));
    }
}
