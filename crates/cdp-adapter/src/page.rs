//! `PageDom` and `ScreenCapture` over a DevTools session.
//!
//! Every DOM operation is a `Runtime.evaluate` of a small script. Elements found
//! by a query are tagged with a `data-cartpilot-handle` attribute; the attribute
//! value is the handle the executor holds on to.

use std::sync::Arc;

use action_primitives::{
    ActionError, DomEvent, ElementHandle, ElementInfo, InlineStyle, PageDom, PageLocation, Scope,
    ScrollBehavior,
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use perceiver_visual::{ScreenCapture, VisualError};
use serde_json::{json, Value};
use tracing::debug;

use crate::{
    error::{AdapterError, AdapterErrorKind},
    transport::CdpTransport,
};

pub const HANDLE_ATTRIBUTE: &str = "data-cartpilot-handle";

fn js_string(value: &str) -> String {
    Value::String(value.to_string()).to_string()
}

fn handle_selector(handle: &ElementHandle) -> String {
    format!("[{HANDLE_ATTRIBUTE}={}]", js_string(&handle.0))
}

fn query_script(scope: &Scope, selector: &str) -> String {
    let root = match scope {
        Scope::Document => "document".to_string(),
        Scope::Within(parent) => format!(
            "document.querySelector({})",
            js_string(&handle_selector(parent))
        ),
    };
    format!(
        r"(() => {{
            const root = {root};
            if (!root) return null;
            window.__cartpilotSeq = window.__cartpilotSeq || 0;
            return Array.from(root.querySelectorAll({selector})).map((el) => {{
                if (!el.hasAttribute({attr})) {{
                    window.__cartpilotSeq += 1;
                    el.setAttribute({attr}, 'h' + window.__cartpilotSeq);
                }}
                return el.getAttribute({attr});
            }});
        }})()",
        selector = js_string(selector),
        attr = js_string(HANDLE_ATTRIBUTE),
    )
}

/// Wraps `body` so it runs with `el` bound to the handle's element. The script
/// yields `{missing: true}` when the element is gone.
fn element_script(handle: &ElementHandle, body: &str) -> String {
    format!(
        r"(() => {{
            const el = document.querySelector({selector});
            if (!el) return {{ missing: true }};
            return {{ value: (() => {{ {body} }})() }};
        }})()",
        selector = js_string(&handle_selector(handle)),
    )
}

const DESCRIBE_BODY: &str = r"
    const rect = el.getBoundingClientRect();
    const style = window.getComputedStyle(el);
    return {
        tag: el.tagName.toLowerCase(),
        text: (el.innerText || el.textContent || '').trim(),
        value: typeof el.value === 'string' ? el.value : null,
        ariaLabel: el.getAttribute('aria-label'),
        title: el.getAttribute('title'),
        id: el.id || null,
        className: el.getAttribute('class'),
        inputType: el.getAttribute('type'),
        width: rect.width,
        height: rect.height,
        display: style.display,
        visibility: style.visibility,
        opacity: style.opacity,
    };";

const SET_VALUE_BODY: &str = r"
    const descriptor = Object.getOwnPropertyDescriptor(Object.getPrototypeOf(el), 'value');
    if (descriptor && descriptor.set) {
        descriptor.set.call(el, VALUE);
    } else {
        el.value = VALUE;
    }
    return true;";

/// One browser tab driven over DevTools.
pub struct CdpPage {
    transport: Arc<dyn CdpTransport>,
}

impl CdpPage {
    pub fn new(transport: Arc<dyn CdpTransport>) -> Self {
        Self { transport }
    }

    /// Evaluate `expression` in the page and return its value.
    pub async fn evaluate(&self, expression: &str) -> Result<Value, AdapterError> {
        let response = self
            .transport
            .send_command(
                "Runtime.evaluate",
                json!({
                    "expression": expression,
                    "returnByValue": true,
                    "awaitPromise": true,
                }),
            )
            .await?;

        if let Some(details) = response.get("exceptionDetails") {
            let message = details
                .pointer("/exception/description")
                .or_else(|| details.get("text"))
                .and_then(Value::as_str)
                .unwrap_or("uncaught exception");
            return Err(AdapterError::new(AdapterErrorKind::Evaluation).with_hint(message));
        }

        Ok(response
            .pointer("/result/value")
            .cloned()
            .unwrap_or(Value::Null))
    }

    async fn on_element(&self, handle: &ElementHandle, body: &str) -> Result<Value, AdapterError> {
        let mut outcome = self.evaluate(&element_script(handle, body)).await?;
        if outcome.get("missing").and_then(Value::as_bool) == Some(true) {
            return Err(AdapterError::new(AdapterErrorKind::TargetNotFound)
                .with_hint(format!("{handle} is no longer attached")));
        }
        Ok(outcome
            .get_mut("value")
            .map(Value::take)
            .unwrap_or(Value::Null))
    }

    pub async fn href(&self) -> Result<String, AdapterError> {
        let href = self.evaluate("window.location.href").await?;
        Ok(href.as_str().unwrap_or_default().to_string())
    }

    /// `window.devicePixelRatio`, 1.0 when the page does not report one.
    pub async fn device_pixel_ratio(&self) -> Result<f64, AdapterError> {
        let ratio = self.evaluate("window.devicePixelRatio").await?;
        Ok(ratio.as_f64().filter(|ratio| *ratio > 0.0).unwrap_or(1.0))
    }

    pub async fn screenshot_png(&self) -> Result<Vec<u8>, AdapterError> {
        let response = self
            .transport
            .send_command("Page.captureScreenshot", json!({ "format": "png" }))
            .await?;
        let data = response
            .get("data")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                AdapterError::new(AdapterErrorKind::Internal).with_hint("missing screenshot data")
            })?;
        STANDARD.decode(data).map_err(|err| {
            AdapterError::new(AdapterErrorKind::Internal).with_hint(err.to_string())
        })
    }
}

#[async_trait]
impl PageDom for CdpPage {
    async fn query_all(
        &self,
        scope: &Scope,
        selector: &str,
    ) -> Result<Vec<ElementHandle>, ActionError> {
        let value = self.evaluate(&query_script(scope, selector)).await?;
        let Value::Array(handles) = value else {
            return match scope {
                Scope::Within(parent) => Err(ActionError::ElementNotFound(format!(
                    "{parent} is no longer attached"
                ))),
                Scope::Document => Ok(Vec::new()),
            };
        };
        Ok(handles
            .into_iter()
            .filter_map(|handle| handle.as_str().map(|id| ElementHandle(id.to_string())))
            .collect())
    }

    async fn describe(&self, element: &ElementHandle) -> Result<ElementInfo, ActionError> {
        let value = self.on_element(element, DESCRIBE_BODY).await?;
        serde_json::from_value(value).map_err(|err| ActionError::Dom(err.to_string()))
    }

    async fn attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, ActionError> {
        let body = format!("return el.getAttribute({});", js_string(name));
        let value = self.on_element(element, &body).await?;
        Ok(value.as_str().map(str::to_string))
    }

    async fn set_inline_style(
        &self,
        element: &ElementHandle,
        style: &InlineStyle,
    ) -> Result<InlineStyle, ActionError> {
        let body = format!(
            r"const previous = {{ outline: el.style.outline, outline_offset: el.style.outlineOffset }};
            el.style.outline = {outline};
            el.style.outlineOffset = {offset};
            return previous;",
            outline = js_string(&style.outline),
            offset = js_string(&style.outline_offset),
        );
        let value = self.on_element(element, &body).await?;
        serde_json::from_value(value).map_err(|err| ActionError::Dom(err.to_string()))
    }

    async fn focus(&self, element: &ElementHandle) -> Result<(), ActionError> {
        self.on_element(element, "el.focus(); return true;").await?;
        Ok(())
    }

    async fn click(&self, element: &ElementHandle) -> Result<(), ActionError> {
        debug!(%element, "click");
        self.on_element(element, "el.click(); return true;").await?;
        Ok(())
    }

    async fn dispatch(&self, element: &ElementHandle, event: DomEvent) -> Result<(), ActionError> {
        let body = match event {
            DomEvent::MouseClick => {
                "el.dispatchEvent(new MouseEvent('click', { bubbles: true, cancelable: true, view: window })); return true;"
                    .to_string()
            }
            other => format!(
                "el.dispatchEvent(new Event({}, {{ bubbles: true }})); return true;",
                js_string(other.name())
            ),
        };
        self.on_element(element, &body).await?;
        Ok(())
    }

    async fn set_value(&self, element: &ElementHandle, value: &str) -> Result<(), ActionError> {
        let body = SET_VALUE_BODY.replace("VALUE", &js_string(value));
        self.on_element(element, &body).await?;
        Ok(())
    }

    async fn scroll_into_view(&self, element: &ElementHandle) -> Result<(), ActionError> {
        self.on_element(
            element,
            "el.scrollIntoView({ behavior: 'smooth', block: 'center' }); return true;",
        )
        .await?;
        Ok(())
    }

    async fn scroll_offset(&self) -> Result<f64, ActionError> {
        let value = self
            .evaluate("window.scrollY || window.pageYOffset || 0")
            .await?;
        Ok(value.as_f64().unwrap_or(0.0))
    }

    async fn scroll_to(&self, top: f64, behavior: ScrollBehavior) -> Result<(), ActionError> {
        let script = format!(
            "window.scrollTo({{ top: {top}, behavior: {} }})",
            js_string(behavior.as_css())
        );
        self.evaluate(&script).await?;
        Ok(())
    }

    async fn location(&self) -> Result<PageLocation, ActionError> {
        Ok(PageLocation::from_href(&self.href().await?))
    }

    async fn navigate(&self, url: &str) -> Result<(), ActionError> {
        let response = self
            .transport
            .send_command("Page.navigate", json!({ "url": url }))
            .await?;
        if let Some(error) = response.get("errorText").and_then(Value::as_str) {
            return Err(ActionError::Dom(format!("navigation to {url} failed: {error}")));
        }
        Ok(())
    }
}

#[async_trait]
impl ScreenCapture for CdpPage {
    async fn capture_visible(&self) -> Result<Vec<u8>, VisualError> {
        Ok(self.screenshot_png().await?)
    }

    async fn current_url(&self) -> Result<Option<String>, VisualError> {
        let href = self.href().await?;
        Ok((!href.is_empty()).then_some(href))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use tokio::sync::Mutex;

    use super::*;

    /// Returns scripted responses in order and records every command.
    #[derive(Default)]
    struct MockTransport {
        responses: Mutex<VecDeque<Result<Value, AdapterError>>>,
        commands: Mutex<Vec<(String, Value)>>,
    }

    impl MockTransport {
        async fn push(&self, response: Value) {
            self.responses.lock().await.push_back(Ok(response));
        }

        async fn push_value(&self, value: Value) {
            self.push(json!({ "result": { "type": "object", "value": value } }))
                .await;
        }

        async fn commands(&self) -> Vec<(String, Value)> {
            self.commands.lock().await.clone()
        }
    }

    #[async_trait]
    impl CdpTransport for MockTransport {
        async fn send_command(&self, method: &str, params: Value) -> Result<Value, AdapterError> {
            self.commands
                .lock()
                .await
                .push((method.to_string(), params));
            self.responses
                .lock()
                .await
                .pop_front()
                .unwrap_or(Ok(Value::Null))
        }
    }

    fn page() -> (CdpPage, Arc<MockTransport>) {
        let transport = Arc::new(MockTransport::default());
        (CdpPage::new(transport.clone()), transport)
    }

    #[tokio::test]
    async fn query_returns_tagged_handles() {
        let (page, transport) = page();
        transport.push_value(json!(["h1", "h2"])).await;

        let handles = page
            .query_all(&Scope::Document, "#nav-cart")
            .await
            .unwrap();

        assert_eq!(
            handles,
            vec![ElementHandle("h1".into()), ElementHandle("h2".into())]
        );
        let commands = transport.commands().await;
        assert_eq!(commands[0].0, "Runtime.evaluate");
        let expression = commands[0].1["expression"].as_str().unwrap();
        assert!(expression.contains("\"#nav-cart\""));
        assert!(expression.contains(HANDLE_ATTRIBUTE));
    }

    #[tokio::test]
    async fn scoped_query_on_detached_parent_is_not_found() {
        let (page, transport) = page();
        transport.push_value(Value::Null).await;

        let err = page
            .query_all(&Scope::within(&ElementHandle("h9".into())), "button")
            .await
            .unwrap_err();
        assert!(err.is_locate_failure());
    }

    #[tokio::test]
    async fn describe_maps_element_fields() {
        let (page, transport) = page();
        transport
            .push_value(json!({
                "value": {
                    "tag": "button",
                    "text": "Add to Cart",
                    "value": null,
                    "ariaLabel": "Add to cart",
                    "id": "add-to-cart-button",
                    "width": 120.0,
                    "height": 32.0,
                    "display": "block",
                    "visibility": "visible",
                    "opacity": "1"
                }
            }))
            .await;

        let info = page.describe(&ElementHandle("h1".into())).await.unwrap();
        assert_eq!(info.tag, "button");
        assert_eq!(info.aria_label.as_deref(), Some("Add to cart"));
        assert!(info.is_visible());
    }

    #[tokio::test]
    async fn missing_element_is_a_locate_failure() {
        let (page, transport) = page();
        transport.push_value(json!({ "missing": true })).await;

        let err = page.click(&ElementHandle("h4".into())).await.unwrap_err();
        assert!(matches!(err, ActionError::ElementNotFound(_)));
    }

    #[tokio::test]
    async fn script_exceptions_become_driver_errors() {
        let (page, transport) = page();
        transport
            .push(json!({
                "result": { "type": "object" },
                "exceptionDetails": {
                    "text": "Uncaught",
                    "exception": { "description": "SyntaxError: bad selector" }
                }
            }))
            .await;

        let err = page.query_all(&Scope::Document, "[[").await.unwrap_err();
        match err {
            ActionError::Dom(message) => assert!(message.contains("bad selector")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn capture_decodes_png_data() {
        let (page, transport) = page();
        let png = perceiver_visual::testing::solid_png(2, 2);
        transport.push(json!({ "data": STANDARD.encode(&png) })).await;

        let bytes = page.capture_visible().await.unwrap();
        assert_eq!(bytes, png);
        let commands = transport.commands().await;
        assert_eq!(commands[0].0, "Page.captureScreenshot");
    }

    #[tokio::test]
    async fn location_is_parsed_from_href() {
        let (page, transport) = page();
        transport
            .push_value(json!("https://www.amazon.com/s?k=mug"))
            .await;

        let location = page.location().await.unwrap();
        assert_eq!(location.origin, "https://www.amazon.com");
        assert_eq!(location.hostname, "www.amazon.com");
    }

    #[tokio::test]
    async fn failed_navigation_reports_error_text() {
        let (page, transport) = page();
        transport
            .push(json!({ "frameId": "f", "errorText": "net::ERR_NAME_NOT_RESOLVED" }))
            .await;

        assert!(page.navigate("https://nowhere.invalid").await.is_err());
    }

    #[tokio::test]
    async fn pixel_ratio_defaults_to_one() {
        let (page, transport) = page();
        transport.push_value(json!(2)).await;
        transport.push_value(Value::Null).await;

        assert_eq!(page.device_pixel_ratio().await.unwrap(), 2.0);
        assert_eq!(page.device_pixel_ratio().await.unwrap(), 1.0);
    }
}
