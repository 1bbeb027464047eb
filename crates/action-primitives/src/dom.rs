//! The page capability every primitive goes through.

use async_trait::async_trait;
use tracing::debug;

use crate::{
    errors::ActionError,
    types::{
        DomEvent, ElementHandle, ElementInfo, InlineStyle, PageLocation, Scope, ScrollBehavior,
    },
};

/// DOM access for one page.
///
/// Implemented by the DevTools driver in production and by an in-memory page in tests.
#[async_trait]
pub trait PageDom: Send + Sync {
    /// All elements matching `selector` inside `scope`, in document order.
    async fn query_all(
        &self,
        scope: &Scope,
        selector: &str,
    ) -> Result<Vec<ElementHandle>, ActionError>;

    async fn describe(&self, element: &ElementHandle) -> Result<ElementInfo, ActionError>;

    async fn attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, ActionError>;

    /// Replaces the outline properties and returns the previous ones.
    async fn set_inline_style(
        &self,
        element: &ElementHandle,
        style: &InlineStyle,
    ) -> Result<InlineStyle, ActionError>;

    async fn focus(&self, element: &ElementHandle) -> Result<(), ActionError>;

    /// Native `click()` on the element.
    async fn click(&self, element: &ElementHandle) -> Result<(), ActionError>;

    async fn dispatch(&self, element: &ElementHandle, event: DomEvent) -> Result<(), ActionError>;

    async fn set_value(&self, element: &ElementHandle, value: &str) -> Result<(), ActionError>;

    async fn scroll_into_view(&self, element: &ElementHandle) -> Result<(), ActionError>;

    /// Current vertical scroll offset in CSS pixels.
    async fn scroll_offset(&self) -> Result<f64, ActionError>;

    async fn scroll_to(&self, top: f64, behavior: ScrollBehavior) -> Result<(), ActionError>;

    async fn location(&self) -> Result<PageLocation, ActionError>;

    async fn navigate(&self, url: &str) -> Result<(), ActionError>;
}

/// First element in `candidates` that is currently visible.
///
/// Elements that vanish between query and describe are skipped.
pub async fn first_visible(
    dom: &dyn PageDom,
    candidates: &[ElementHandle],
) -> Option<(ElementHandle, ElementInfo)> {
    for candidate in candidates {
        match dom.describe(candidate).await {
            Ok(info) if info.is_visible() => return Some((candidate.clone(), info)),
            Ok(_) => {}
            Err(err) => debug!(element = %candidate, %err, "Skipping undescribable element"),
        }
    }
    None
}
