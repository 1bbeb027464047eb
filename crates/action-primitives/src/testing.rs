//! In-memory page for tests.
//!
//! Selectors are not parsed: each `(scope, selector)` pair is bound explicitly to the
//! element ids it should return, and every mutating call is recorded.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::{
    dom::PageDom,
    errors::ActionError,
    types::{
        DomEvent, ElementHandle, ElementInfo, InlineStyle, PageLocation, Scope, ScrollBehavior,
    },
};

/// A recorded side effect.
#[derive(Debug, Clone, PartialEq)]
pub enum DomCall {
    Focus(String),
    Click(String),
    Dispatch(String, DomEvent),
    SetValue(String, String),
    ScrollIntoView(String),
    ScrollTo(f64),
    Navigate(String),
}

#[derive(Default)]
struct FakeState {
    elements: HashMap<String, ElementInfo>,
    attributes: HashMap<(String, String), String>,
    bindings: HashMap<(Option<String>, String), Vec<String>>,
    styles: HashMap<String, InlineStyle>,
    values: HashMap<String, String>,
    refused: Vec<String>,
    calls: Vec<DomCall>,
    scroll_offset: f64,
    location: PageLocation,
    broken: bool,
}

#[derive(Default)]
pub struct FakeDom {
    state: Mutex<FakeState>,
}

impl ElementInfo {
    pub fn visible_element(tag: &str, text: &str) -> Self {
        Self {
            tag: tag.to_string(),
            text: text.to_string(),
            width: 120.0,
            height: 32.0,
            display: "block".to_string(),
            visibility: "visible".to_string(),
            opacity: "1".to_string(),
            ..Self::default()
        }
    }

    pub fn hidden_element(tag: &str, text: &str) -> Self {
        Self {
            display: "none".to_string(),
            ..Self::visible_element(tag, text)
        }
    }

    pub fn with_aria_label(mut self, label: &str) -> Self {
        self.aria_label = Some(label.to_string());
        self
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn with_value(mut self, value: &str) -> Self {
        self.value = Some(value.to_string());
        self
    }
}

impl FakeDom {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_element(&self, id: &str, info: ElementInfo) -> ElementHandle {
        self.state.lock().elements.insert(id.to_string(), info);
        ElementHandle(id.to_string())
    }

    pub fn set_attribute(&self, id: &str, name: &str, value: &str) {
        self.state
            .lock()
            .attributes
            .insert((id.to_string(), name.to_string()), value.to_string());
    }

    /// Bind a document-level selector to element ids.
    pub fn bind(&self, selector: &str, ids: &[&str]) {
        self.state.lock().bindings.insert(
            (None, selector.to_string()),
            ids.iter().map(|id| id.to_string()).collect(),
        );
    }

    /// Bind a selector evaluated inside `scope_id`.
    pub fn bind_within(&self, scope_id: &str, selector: &str, ids: &[&str]) {
        self.state.lock().bindings.insert(
            (Some(scope_id.to_string()), selector.to_string()),
            ids.iter().map(|id| id.to_string()).collect(),
        );
    }

    /// Native clicks on this element fail as if something covered it.
    pub fn refuse_clicks(&self, id: &str) {
        self.state.lock().refused.push(id.to_string());
    }

    /// Every call fails with a driver error.
    pub fn break_driver(&self) {
        self.state.lock().broken = true;
    }

    pub fn set_location(&self, href: &str) {
        self.state.lock().location = PageLocation::from_href(href);
    }

    pub fn set_scroll_offset(&self, offset: f64) {
        self.state.lock().scroll_offset = offset;
    }

    pub fn scroll_offset_now(&self) -> f64 {
        self.state.lock().scroll_offset
    }

    pub fn calls(&self) -> Vec<DomCall> {
        self.state.lock().calls.clone()
    }

    pub fn clicked(&self, id: &str) -> bool {
        self.state
            .lock()
            .calls
            .iter()
            .any(|call| matches!(call, DomCall::Click(clicked) if clicked == id))
    }

    pub fn value_of(&self, id: &str) -> Option<String> {
        self.state.lock().values.get(id).cloned()
    }

    pub fn dispatched(&self, id: &str) -> Vec<DomEvent> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                DomCall::Dispatch(target, event) if target == id => Some(*event),
                _ => None,
            })
            .collect()
    }

    pub fn style_of(&self, id: &str) -> InlineStyle {
        self.state.lock().styles.get(id).cloned().unwrap_or_default()
    }

    fn check(&self) -> Result<(), ActionError> {
        if self.state.lock().broken {
            return Err(ActionError::Dom("page driver disconnected".to_string()));
        }
        Ok(())
    }

    fn known(&self, element: &ElementHandle) -> Result<(), ActionError> {
        self.check()?;
        if self.state.lock().elements.contains_key(&element.0) {
            Ok(())
        } else {
            Err(ActionError::NotActionable(format!("{element} is detached")))
        }
    }

    fn record(&self, call: DomCall) {
        self.state.lock().calls.push(call);
    }
}

#[async_trait]
impl PageDom for FakeDom {
    async fn query_all(
        &self,
        scope: &Scope,
        selector: &str,
    ) -> Result<Vec<ElementHandle>, ActionError> {
        self.check()?;
        let key = match scope {
            Scope::Document => (None, selector.to_string()),
            Scope::Within(parent) => (Some(parent.0.clone()), selector.to_string()),
        };
        Ok(self
            .state
            .lock()
            .bindings
            .get(&key)
            .map(|ids| ids.iter().cloned().map(ElementHandle).collect())
            .unwrap_or_default())
    }

    async fn describe(&self, element: &ElementHandle) -> Result<ElementInfo, ActionError> {
        self.known(element)?;
        let state = self.state.lock();
        let mut info = state
            .elements
            .get(&element.0)
            .cloned()
            .unwrap_or_default();
        if let Some(value) = state.values.get(&element.0) {
            info.value = Some(value.clone());
        }
        Ok(info)
    }

    async fn attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, ActionError> {
        self.known(element)?;
        Ok(self
            .state
            .lock()
            .attributes
            .get(&(element.0.clone(), name.to_string()))
            .cloned())
    }

    async fn set_inline_style(
        &self,
        element: &ElementHandle,
        style: &InlineStyle,
    ) -> Result<InlineStyle, ActionError> {
        self.known(element)?;
        Ok(self
            .state
            .lock()
            .styles
            .insert(element.0.clone(), style.clone())
            .unwrap_or_default())
    }

    async fn focus(&self, element: &ElementHandle) -> Result<(), ActionError> {
        self.known(element)?;
        self.record(DomCall::Focus(element.0.clone()));
        Ok(())
    }

    async fn click(&self, element: &ElementHandle) -> Result<(), ActionError> {
        self.known(element)?;
        if self.state.lock().refused.contains(&element.0) {
            return Err(ActionError::NotActionable(format!(
                "{element} is covered by another element"
            )));
        }
        self.record(DomCall::Click(element.0.clone()));
        Ok(())
    }

    async fn dispatch(&self, element: &ElementHandle, event: DomEvent) -> Result<(), ActionError> {
        self.known(element)?;
        self.record(DomCall::Dispatch(element.0.clone(), event));
        Ok(())
    }

    async fn set_value(&self, element: &ElementHandle, value: &str) -> Result<(), ActionError> {
        self.known(element)?;
        let mut state = self.state.lock();
        state.values.insert(element.0.clone(), value.to_string());
        state
            .calls
            .push(DomCall::SetValue(element.0.clone(), value.to_string()));
        Ok(())
    }

    async fn scroll_into_view(&self, element: &ElementHandle) -> Result<(), ActionError> {
        self.known(element)?;
        self.record(DomCall::ScrollIntoView(element.0.clone()));
        Ok(())
    }

    async fn scroll_offset(&self) -> Result<f64, ActionError> {
        self.check()?;
        Ok(self.state.lock().scroll_offset)
    }

    async fn scroll_to(&self, top: f64, _behavior: ScrollBehavior) -> Result<(), ActionError> {
        self.check()?;
        let mut state = self.state.lock();
        state.scroll_offset = top;
        state.calls.push(DomCall::ScrollTo(top));
        Ok(())
    }

    async fn location(&self) -> Result<PageLocation, ActionError> {
        self.check()?;
        Ok(self.state.lock().location.clone())
    }

    async fn navigate(&self, url: &str) -> Result<(), ActionError> {
        self.check()?;
        let mut state = self.state.lock();
        state.location = PageLocation::from_href(url);
        state.calls.push(DomCall::Navigate(url.to_string()));
        Ok(())
    }
}
