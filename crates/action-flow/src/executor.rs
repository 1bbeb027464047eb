//! Action executor - tool call in, tool result out

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use action_locator::{DefaultElementLocator, ElementLocator, LocateQuery, LocatorCatalog, Resolution};
use action_primitives::{
    execute_click, settle, ClickOptions, ElementHandle, Highlighter, PageDom, SettleDelays,
};
use async_trait::async_trait;
use cartpilot_core_types::{ImagePayload, ToolCallRequest, ToolCallResult};
use futures::FutureExt;
use perceiver_visual::ScreenshotService;
use tracing::{debug, error, info, warn};

use crate::{
    errors::FlowError,
    pending::PendingCart,
    types::{ExecutorConfig, ToolAction},
};

/// Error reported when the screen capture tool cannot produce an image.
pub const CAPTURE_FAILED: &str = "Failed to capture screenshot";

/// Performs browser tool calls.
///
/// Implementations never return an error: every accepted request yields exactly
/// one result, failed or not.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    async fn execute(&self, request: &ToolCallRequest) -> ToolCallResult;
}

/// Executor driving a live page through [`PageDom`].
pub struct DefaultActionExecutor {
    pub(crate) dom: Arc<dyn PageDom>,
    pub(crate) locator: Arc<dyn ElementLocator>,
    pub(crate) catalog: Arc<LocatorCatalog>,
    screenshots: Arc<ScreenshotService>,
    pub(crate) highlighter: Highlighter,
    pub(crate) config: ExecutorConfig,
    pub(crate) pending_cart: Arc<PendingCart>,
}

impl DefaultActionExecutor {
    pub fn new(
        dom: Arc<dyn PageDom>,
        screenshots: Arc<ScreenshotService>,
        catalog: LocatorCatalog,
        config: ExecutorConfig,
    ) -> Self {
        Self::with_locator(
            dom,
            Arc::new(DefaultElementLocator::new()),
            screenshots,
            catalog,
            config,
        )
    }

    pub fn with_locator(
        dom: Arc<dyn PageDom>,
        locator: Arc<dyn ElementLocator>,
        screenshots: Arc<ScreenshotService>,
        catalog: LocatorCatalog,
        config: ExecutorConfig,
    ) -> Self {
        let highlighter = Highlighter::new(
            Arc::clone(&dom),
            Duration::from_millis(config.highlight_ms),
        );
        Self {
            dom,
            locator,
            catalog: Arc::new(catalog),
            screenshots,
            highlighter,
            config,
            pending_cart: Arc::new(PendingCart::new()),
        }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn pending_cart(&self) -> &Arc<PendingCart> {
        &self.pending_cart
    }

    pub(crate) fn delays(&self) -> &SettleDelays {
        &self.config.delays
    }

    pub(crate) fn click_options(&self) -> ClickOptions {
        ClickOptions {
            focus_first: true,
            synthesize: self.config.synthesize_clicks,
        }
    }

    async fn run(&self, request: &ToolCallRequest) -> ToolCallResult {
        let action = match request
            .tool()
            .map_err(|err| FlowError::UnknownTool(err.to_string()))
            .and_then(|tool| ToolAction::parse(tool, &request.args))
        {
            Ok(action) => action,
            Err(err) => {
                warn!(tool_id = %request.tool_id, tool_name = %request.tool_name, %err, "Rejected tool call");
                return ToolCallResult::failure(request, err.to_string());
            }
        };

        if action == ToolAction::ScreenCapture {
            return self.screen_capture(request).await;
        }

        let outcome = self.perform(&action).await;
        settle(self.delays().post_action()).await;
        let evidence = self.capture_evidence().await;

        match outcome {
            Ok(outcome) => {
                info!(tool_id = %request.tool_id, summary = %outcome.summary, "Tool call succeeded");
                ToolCallResult::success(request).with_evidence(evidence)
            }
            Err(err) => {
                warn!(
                    tool_id = %request.tool_id,
                    locate_failure = err.is_locate_failure(),
                    %err,
                    "Tool call failed"
                );
                ToolCallResult::failure(request, err.to_string()).with_evidence(evidence)
            }
        }
    }

    async fn screen_capture(&self, request: &ToolCallRequest) -> ToolCallResult {
        match self.screenshots.capture_viewport().await {
            Ok(image) if !image.is_empty() => {
                info!(tool_id = %request.tool_id, "Screenshot captured");
                ToolCallResult::success(request).with_evidence(Some(image))
            }
            Ok(_) => {
                warn!(tool_id = %request.tool_id, "Screenshot was empty");
                ToolCallResult::failure(request, CAPTURE_FAILED)
            }
            Err(err) => {
                warn!(tool_id = %request.tool_id, %err, "Screenshot capture failed");
                ToolCallResult::failure(request, CAPTURE_FAILED)
            }
        }
    }

    async fn capture_evidence(&self) -> Option<ImagePayload> {
        if !self.config.capture_evidence {
            return None;
        }
        match self.screenshots.capture_viewport().await {
            Ok(image) => Some(image),
            Err(err) => {
                debug!(%err, "Evidence capture skipped");
                None
            }
        }
    }

    /// Locate a target, bring it into view, outline it, wait, then click it.
    pub(crate) async fn locate_and_click(
        &self,
        query: &LocateQuery,
        pre_click: Duration,
    ) -> Result<Resolution, FlowError> {
        let resolution = self.locator.locate(self.dom.as_ref(), query).await?;
        self.click_resolved(&resolution.element, pre_click).await?;
        Ok(resolution)
    }

    pub(crate) async fn click_resolved(
        &self,
        element: &ElementHandle,
        pre_click: Duration,
    ) -> Result<(), FlowError> {
        if let Err(err) = self.dom.scroll_into_view(element).await {
            debug!(element = %element, %err, "Scroll into view failed");
        }
        self.highlighter.highlight(element).await;
        settle(pre_click).await;
        execute_click(self.dom.as_ref(), element, self.click_options()).await?;
        Ok(())
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[async_trait]
impl ActionExecutor for DefaultActionExecutor {
    async fn execute(&self, request: &ToolCallRequest) -> ToolCallResult {
        info!(
            thread_id = %request.thread_id,
            tool_id = %request.tool_id,
            tool_name = %request.tool_name,
            "Executing tool call"
        );

        match AssertUnwindSafe(self.run(request)).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(tool_id = %request.tool_id, %message, "Tool call panicked");
                ToolCallResult::failure(request, format!("Browser action crashed: {message}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use action_primitives::testing::FakeDom;
    use action_primitives::ElementInfo;
    use perceiver_visual::testing::{solid_png, FakeCapture};
    use perceiver_visual::CapturePolicy;
    use serde_json::json;

    fn immediate() -> ExecutorConfig {
        ExecutorConfig {
            delays: SettleDelays::immediate(),
            highlight_ms: 10,
            ..ExecutorConfig::default()
        }
    }

    fn executor(dom: Arc<FakeDom>, capture: FakeCapture) -> DefaultActionExecutor {
        let screenshots = Arc::new(ScreenshotService::new(
            Arc::new(capture),
            CapturePolicy::default(),
        ));
        DefaultActionExecutor::new(dom, screenshots, LocatorCatalog::default(), immediate())
    }

    #[tokio::test]
    async fn screen_capture_attaches_viewport() {
        let executor = executor(Arc::new(FakeDom::new()), FakeCapture::new(solid_png(8, 8)));
        let request = ToolCallRequest::new("t1", "k1", "screen_capture", json!({}));

        let result = executor.execute(&request).await;

        assert!(result.success);
        let evidence = result.evidence.expect("evidence");
        assert_eq!(evidence.file_name, "screen-capture.png");
        assert!(evidence.data_uri.starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn screen_capture_failure_has_no_evidence() {
        let executor = executor(Arc::new(FakeDom::new()), FakeCapture::failing("tab gone"));
        let request = ToolCallRequest::new("t1", "k1", "screen_capture", json!({}));

        let result = executor.execute(&request).await;

        assert!(!result.success);
        assert!(result.evidence.is_none());
        assert_eq!(result.error.as_deref(), Some(CAPTURE_FAILED));
    }

    #[tokio::test]
    async fn restricted_page_capture_fails() {
        let capture = FakeCapture::new(solid_png(8, 8)).with_url("chrome://settings");
        let executor = executor(Arc::new(FakeDom::new()), capture);
        let request = ToolCallRequest::new("t1", "k1", "screen_capture", json!({}));

        assert!(!executor.execute(&request).await.success);
    }

    #[tokio::test]
    async fn unknown_tool_yields_failed_result() {
        let executor = executor(Arc::new(FakeDom::new()), FakeCapture::new(solid_png(8, 8)));
        let request = ToolCallRequest::new("t1", "k1", "teleport", json!({}));

        let result = executor.execute(&request).await;

        assert!(!result.success);
        assert_eq!(result.tool_id.as_str(), "k1");
        assert!(result.error.unwrap().contains("teleport"));
    }

    #[tokio::test]
    async fn scroll_reports_success_with_evidence() {
        let dom = Arc::new(FakeDom::new());
        dom.set_scroll_offset(100.0);
        let capture = FakeCapture::new(solid_png(8, 8));
        let executor = executor(dom.clone(), capture);
        let request = ToolCallRequest::new(
            "t1",
            "k1",
            "scroll_page",
            json!({"direction": "up", "amount": 500}),
        );

        let result = executor.execute(&request).await;

        assert!(result.success);
        assert!(result.evidence.is_some());
        assert_eq!(dom.scroll_offset_now(), 0.0);
    }

    #[tokio::test]
    async fn evidence_failure_does_not_fail_the_action() {
        let dom = Arc::new(FakeDom::new());
        let executor = executor(dom.clone(), FakeCapture::failing("no tab"));
        let request = ToolCallRequest::new(
            "t1",
            "k1",
            "scroll_page",
            json!({"direction": "down"}),
        );

        let result = executor.execute(&request).await;

        assert!(result.success);
        assert!(result.evidence.is_none());
        assert_eq!(dom.scroll_offset_now(), 300.0);
    }

    #[tokio::test]
    async fn driver_failure_becomes_failed_result() {
        let dom = Arc::new(FakeDom::new());
        dom.add_element("b", ElementInfo::visible_element("button", "Go"));
        dom.break_driver();
        let executor = executor(dom, FakeCapture::new(solid_png(8, 8)));
        let request = ToolCallRequest::new("t1", "k1", "checkout", json!({"confirmation": true}));

        let result = executor.execute(&request).await;

        assert!(!result.success);
        assert!(result.error.is_some());
    }
}
