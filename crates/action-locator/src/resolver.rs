//! Element locator with fallback chain orchestration

use crate::{errors::LocatorError, strategies::*, types::*};
use action_primitives::PageDom;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Pluggable element location capability.
#[async_trait]
pub trait ElementLocator: Send + Sync {
    /// Resolve the first visible match, walking the fallback chain
    async fn locate(
        &self,
        dom: &dyn PageDom,
        query: &LocateQuery,
    ) -> Result<Resolution, LocatorError>;

    /// Try a single strategy
    async fn locate_with_strategy(
        &self,
        dom: &dyn PageDom,
        query: &LocateQuery,
        strategy: LocatorStrategy,
    ) -> Result<Option<Resolution>, LocatorError>;
}

/// Default element locator implementation
pub struct DefaultElementLocator {
    structural: Arc<StructuralStrategy>,
    attribute: Arc<AttributePatternStrategy>,
    text: Arc<TextContentStrategy>,
}

impl Default for DefaultElementLocator {
    fn default() -> Self {
        Self::new()
    }
}

impl DefaultElementLocator {
    /// Create a new locator with all strategies
    pub fn new() -> Self {
        Self {
            structural: Arc::new(StructuralStrategy),
            attribute: Arc::new(AttributePatternStrategy),
            text: Arc::new(TextContentStrategy),
        }
    }

    /// Get strategy by type
    fn get_strategy(&self, strategy_type: LocatorStrategy) -> Arc<dyn Strategy> {
        match strategy_type {
            LocatorStrategy::Structural => self.structural.clone(),
            LocatorStrategy::AttributePattern => self.attribute.clone(),
            LocatorStrategy::TextContent => self.text.clone(),
        }
    }
}

#[async_trait]
impl ElementLocator for DefaultElementLocator {
    async fn locate(
        &self,
        dom: &dyn PageDom,
        query: &LocateQuery,
    ) -> Result<Resolution, LocatorError> {
        if !query.is_actionable() {
            return Err(LocatorError::InvalidQuery(format!(
                "nothing to search for '{}'",
                query.label
            )));
        }

        debug!(target = %query.label, "Locating element");
        let mut driver_error = None;

        for strategy_type in LocatorStrategy::fallback_chain() {
            match self.locate_with_strategy(dom, query, strategy_type).await {
                Ok(Some(resolution)) => {
                    info!(
                        target = %query.label,
                        strategy = strategy_type.name(),
                        selector = %resolution.selector,
                        element = %resolution.info.describe(),
                        "Resolved element"
                    );
                    return Ok(resolution);
                }
                Ok(None) => {
                    debug!("Strategy {} found no visible match", strategy_type.name());
                }
                Err(e) => {
                    warn!("Strategy {} failed: {}", strategy_type.name(), e);
                    driver_error = Some(e);
                }
            }
        }

        // A broken driver is reported as such rather than as a missing element
        match driver_error {
            Some(LocatorError::Driver(msg)) => Err(LocatorError::Driver(msg)),
            _ => Err(LocatorError::NotFound(format!(
                "no visible element for '{}'",
                query.label
            ))),
        }
    }

    async fn locate_with_strategy(
        &self,
        dom: &dyn PageDom,
        query: &LocateQuery,
        strategy: LocatorStrategy,
    ) -> Result<Option<Resolution>, LocatorError> {
        self.get_strategy(strategy).locate(dom, query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use action_primitives::testing::FakeDom;
    use action_primitives::{ElementInfo, Scope};

    #[tokio::test]
    async fn structural_selector_wins_first() {
        let dom = FakeDom::new();
        dom.add_element("cart", ElementInfo::visible_element("a", "Cart"));
        dom.add_element("other", ElementInfo::visible_element("a", "cart icon"));
        dom.bind("#nav-cart", &["cart"]);
        dom.bind("a, button", &["other"]);

        let query = LocateQuery::new("cart")
            .selectors(["#nav-cart"])
            .text("a, button", ["cart"]);
        let resolution = DefaultElementLocator::new().locate(&dom, &query).await.unwrap();

        assert_eq!(resolution.element.0, "cart");
        assert_eq!(resolution.strategy, LocatorStrategy::Structural);
    }

    #[tokio::test]
    async fn hidden_structural_match_falls_through() {
        let dom = FakeDom::new();
        dom.add_element("hidden", ElementInfo::hidden_element("a", "Cart"));
        dom.add_element("label", ElementInfo::visible_element("a", "").with_aria_label("Cart"));
        dom.bind("#nav-cart", &["hidden"]);
        dom.bind("[aria-label*=\"cart\" i]", &["label"]);

        let query = LocateQuery::new("cart")
            .selectors(["#nav-cart"])
            .attribute_term("cart");
        let resolution = DefaultElementLocator::new().locate(&dom, &query).await.unwrap();

        assert_eq!(resolution.element.0, "label");
        assert_eq!(resolution.strategy, LocatorStrategy::AttributePattern);
    }

    #[tokio::test]
    async fn text_content_is_last_resort() {
        let dom = FakeDom::new();
        dom.add_element("next", ElementInfo::visible_element("a", "Next page →"));
        dom.bind("a, button", &["next"]);

        let query = LocateQuery::new("next page")
            .attribute_term("next page")
            .text("a, button", ["next page"]);
        let resolution = DefaultElementLocator::new().locate(&dom, &query).await.unwrap();

        assert_eq!(resolution.strategy, LocatorStrategy::TextContent);
    }

    #[tokio::test]
    async fn scoped_queries_stay_inside_scope() {
        let dom = FakeDom::new();
        let popup = dom.add_element("popup", ElementInfo::visible_element("div", ""));
        dom.add_element("outside", ElementInfo::visible_element("button", "Add"));
        dom.add_element("inside", ElementInfo::visible_element("button", "Add"));
        dom.bind("button", &["outside"]);
        dom.bind_within("popup", "button", &["inside"]);

        let query = LocateQuery::new("popup add")
            .within(Scope::within(&popup))
            .selectors(["button"]);
        let resolution = DefaultElementLocator::new().locate(&dom, &query).await.unwrap();

        assert_eq!(resolution.element.0, "inside");
    }

    #[tokio::test]
    async fn exhausted_chain_reports_not_found() {
        let dom = FakeDom::new();
        let query = LocateQuery::new("checkout")
            .selectors(["#checkout"])
            .text("a, button", ["checkout"]);

        let err = DefaultElementLocator::new().locate(&dom, &query).await.unwrap_err();
        assert!(matches!(err, LocatorError::NotFound(_)));
    }

    #[tokio::test]
    async fn broken_driver_is_not_reported_as_missing() {
        let dom = FakeDom::new();
        dom.break_driver();
        let query = LocateQuery::new("checkout").selectors(["#checkout"]);

        let err = DefaultElementLocator::new().locate(&dom, &query).await.unwrap_err();
        assert!(matches!(err, LocatorError::Driver(_)));
    }

    #[tokio::test]
    async fn empty_query_is_rejected() {
        let dom = FakeDom::new();
        let err = DefaultElementLocator::new()
            .locate(&dom, &LocateQuery::new("nothing"))
            .await
            .unwrap_err();
        assert!(matches!(err, LocatorError::InvalidQuery(_)));
    }
}
