//! Add-to-cart: find the product among the search results, click its add button,
//! then deal with the confirmation popup some listings open.

use action_primitives::{
    execute_click, first_visible, settle, ElementHandle, ElementInfo, Scope,
};
use tracing::{debug, info, warn};

use crate::{
    errors::FlowError, executor::DefaultActionExecutor, pending::PendingGuard,
    types::ActionOutcome,
};

/// Loose two-way containment, case-insensitive.
pub(crate) fn titles_match(title: &str, product: &str) -> bool {
    let title = title.trim().to_lowercase();
    let product = product.trim().to_lowercase();
    if title.is_empty() || product.is_empty() {
        return false;
    }
    title.contains(&product) || product.contains(&title)
}

fn mentions_add(info: &ElementInfo) -> bool {
    let text = info.text.to_lowercase();
    let value = info.value.as_deref().unwrap_or_default().to_lowercase();
    let aria = info.aria_label.as_deref().unwrap_or_default().to_lowercase();
    let id = info.id.as_deref().unwrap_or_default().to_lowercase();
    text.contains("add") || value.contains("add") || aria.contains("add") || id.contains("add")
}

fn has_class(info: &ElementInfo, classes: &[String]) -> bool {
    let class_name = info.class_name.as_deref().unwrap_or_default().to_lowercase();
    classes
        .iter()
        .any(|class| class_name.contains(&class.to_lowercase()))
}

impl DefaultActionExecutor {
    pub(crate) async fn add_to_cart(&self, product_name: &str) -> Result<ActionOutcome, FlowError> {
        let pending = self.pending_cart.begin(product_name);

        let containers = self
            .dom
            .query_all(&Scope::Document, &self.catalog.product_containers)
            .await?;
        debug!(count = containers.len(), "Scanning product containers");

        for container in containers.iter().take(self.config.product_scan_limit) {
            let Some(title) = self.product_title(container).await else {
                continue;
            };
            if !titles_match(&title, product_name) {
                continue;
            }

            info!(%title, "Found matching product");
            let button = self.add_button(container).await?.ok_or_else(|| {
                FlowError::NotFound(format!(
                    "Found \"{title}\" but couldn't locate add to cart button"
                ))
            })?;

            if let Err(err) = self.dom.scroll_into_view(container).await {
                debug!(%err, "Scroll product into view failed");
            }
            self.highlighter.highlight(container).await;
            self.highlighter.highlight(&button).await;
            settle(self.delays().cart_pre_click()).await;
            execute_click(self.dom.as_ref(), &button, self.click_options()).await?;
            info!(%title, "Clicked add to cart");

            settle(self.delays().popup_appear()).await;
            self.handle_cart_popup(&pending, &title).await?;
            return Ok(ActionOutcome::new(format!(
                "Successfully added \"{title}\" to cart"
            )));
        }

        Err(FlowError::NotFound(format!(
            "Product \"{product_name}\" doesn't exist in the current search results"
        )))
    }

    async fn product_title(&self, container: &ElementHandle) -> Option<String> {
        let scope = Scope::within(container);
        for selector in &self.catalog.product_titles {
            let handles = match self.dom.query_all(&scope, selector).await {
                Ok(handles) => handles,
                Err(err) => {
                    debug!(%err, selector, "Title query failed");
                    continue;
                }
            };
            if let Some(handle) = handles.first() {
                return match self.dom.describe(handle).await {
                    Ok(info) => Some(info.text.trim().to_string()),
                    Err(_) => None,
                };
            }
        }
        None
    }

    /// First structural match if it looks like an add button, otherwise a scan of
    /// every button-like element in the container.
    async fn add_button(&self, container: &ElementHandle) -> Result<Option<ElementHandle>, FlowError> {
        let scope = Scope::within(container);

        for selector in &self.catalog.add_buttons {
            if let Some(handle) = self.dom.query_all(&scope, selector).await?.into_iter().next() {
                let info = self.dom.describe(&handle).await?;
                if mentions_add(&info) {
                    return Ok(Some(handle));
                }
                break;
            }
        }

        let candidates = self
            .dom
            .query_all(&scope, &self.catalog.add_button_candidates)
            .await?;
        for handle in candidates {
            let info = match self.dom.describe(&handle).await {
                Ok(info) => info,
                Err(_) => continue,
            };
            if mentions_add(&info) || has_class(&info, &self.catalog.add_button_classes) {
                debug!(button = %info.describe(), "Using alternative add button");
                return Ok(Some(handle));
            }
        }
        Ok(None)
    }

    async fn handle_cart_popup(&self, pending: &PendingGuard, title: &str) -> Result<(), FlowError> {
        if !pending.is_current() {
            info!(%title, "Add-to-cart no longer pending, skipping popup");
            return Ok(());
        }
        settle(self.delays().popup_render()).await;

        let popups = self
            .dom
            .query_all(&Scope::Document, &self.catalog.popups)
            .await?;
        let newest_first: Vec<ElementHandle> = popups.into_iter().rev().collect();
        let popup = first_visible(self.dom.as_ref(), &newest_first)
            .await
            .map(|(handle, _)| handle);
        let Some(popup) = popup else {
            debug!(%title, "No popup, item added directly");
            pending.clear();
            return Ok(());
        };

        let scope = Scope::within(&popup);
        let confirm = self
            .dom
            .query_all(&scope, &self.catalog.popup_confirm_buttons)
            .await?;
        let mut target = None;
        for handle in &confirm {
            if let Ok(info) = self.dom.describe(handle).await {
                let text = info.text.to_lowercase();
                if text.contains("add")
                    && !text.contains("cancel")
                    && !text.contains("remove")
                    && info.is_visible()
                {
                    target = Some(handle.clone());
                    break;
                }
            }
        }

        if target.is_none() {
            let alternatives = self
                .dom
                .query_all(&scope, &self.catalog.popup_alt_buttons)
                .await?;
            for handle in alternatives {
                if let Ok(info) = self.dom.describe(&handle).await {
                    let text = info.searchable_text();
                    if (text.contains("add") && !text.contains("cancel"))
                        || has_class(&info, &self.catalog.add_button_classes)
                    {
                        target = Some(handle);
                        break;
                    }
                }
            }
        }

        match target {
            Some(button) => {
                if !pending.is_current() {
                    return Ok(());
                }
                self.highlighter.highlight(&button).await;
                settle(self.delays().popup_click()).await;
                let clicked = execute_click(self.dom.as_ref(), &button, self.click_options()).await;
                pending.clear();
                clicked.map_err(FlowError::from)
            }
            None => {
                match self
                    .locator
                    .locate(self.dom.as_ref(), &self.catalog.popup_close(&popup))
                    .await
                {
                    Ok(close) => {
                        if let Err(err) = self.dom.click(&close.element).await {
                            warn!(%err, "Closing cart popup failed");
                        }
                    }
                    Err(err) => debug!(%err, "Cart popup has no close button"),
                }
                pending.clear();
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use action_primitives::testing::FakeDom;
    use action_primitives::ElementInfo;

    use super::*;
    use crate::actions::tests::executor;

    const POPUPS: &str = ".a-popover-wrapper, [id*=\"popover\"]";
    const POPUP_CONFIRM: &str = "button.a-button-text, [data-cy=\"add-to-cart\"] button, .puis-atcb-add-container button, button[type=\"button\"]";

    /// Two result tiles; the second is the Echo Dot with a structural add button.
    fn results_page() -> Arc<FakeDom> {
        let dom = Arc::new(FakeDom::new());
        for (tile, title) in [("c1", "Kindle Paperwhite"), ("c2", "Echo Dot (5th Gen)")] {
            dom.add_element(tile, ElementInfo::visible_element("div", ""));
            let title_id = format!("{tile}-title");
            dom.add_element(&title_id, ElementInfo::visible_element("span", title));
            dom.bind_within(tile, "h2 span", &[title_id.as_str()]);
        }
        dom.bind(".sg-col-inner", &["c1", "c2"]);
        dom.add_element("c2-add", ElementInfo::visible_element("button", "Add to cart"));
        dom.bind_within("c2", "button.a-button-text", &["c2-add"]);
        dom
    }

    #[test]
    fn title_matching_is_two_way() {
        assert!(titles_match("Echo Dot (5th Gen) Smart Speaker", "echo dot"));
        assert!(titles_match("Echo Dot", "Amazon Echo Dot speaker"));
        assert!(!titles_match("Kindle", "Echo Dot"));
        assert!(!titles_match("", "Echo Dot"));
    }

    #[tokio::test]
    async fn clicks_add_button_of_matching_product() {
        let dom = results_page();
        let executor = executor(dom.clone());

        let outcome = executor.add_to_cart("echo dot").await.unwrap();

        assert!(dom.clicked("c2-add"));
        assert!(outcome.summary.contains("Echo Dot (5th Gen)"));
        assert!(executor.pending_cart().is_empty());
    }

    #[tokio::test]
    async fn confirms_popup_add_button() {
        let dom = results_page();
        dom.add_element("pop", ElementInfo::visible_element("div", ""));
        dom.add_element("pop-cancel", ElementInfo::visible_element("button", "Cancel"));
        dom.add_element("pop-add", ElementInfo::visible_element("button", "Add to Cart"));
        dom.bind(POPUPS, &["pop"]);
        dom.bind_within("pop", POPUP_CONFIRM, &["pop-cancel", "pop-add"]);

        executor(dom.clone()).add_to_cart("Echo Dot").await.unwrap();

        assert!(dom.clicked("pop-add"));
        assert!(!dom.clicked("pop-cancel"));
    }

    #[tokio::test]
    async fn unknown_product_is_reported() {
        let dom = results_page();
        let executor = executor(dom.clone());

        let err = executor.add_to_cart("Fire TV Stick").await.unwrap_err();

        assert_eq!(
            err.to_string(),
            "Product \"Fire TV Stick\" doesn't exist in the current search results"
        );
        assert!(executor.pending_cart().is_empty());
    }

    #[tokio::test]
    async fn product_without_add_button_is_reported() {
        let dom = results_page();

        let err = executor(dom.clone()).add_to_cart("Kindle").await.unwrap_err();

        assert_eq!(
            err.to_string(),
            "Found \"Kindle Paperwhite\" but couldn't locate add to cart button"
        );
    }

    #[tokio::test]
    async fn falls_back_to_add_button_class() {
        let dom = results_page();
        let mut info = ElementInfo::visible_element("span", "");
        info.class_name = Some("puis-atcb-button".to_string());
        dom.add_element("c1-atcb", info);
        dom.bind_within(
            "c1",
            "button, input[type=\"button\"], input[type=\"submit\"], .a-button, [role=\"button\"]",
            &["c1-atcb"],
        );

        executor(dom.clone()).add_to_cart("kindle paperwhite").await.unwrap();

        assert!(dom.clicked("c1-atcb"));
    }

    #[tokio::test]
    async fn superseded_trigger_leaves_popup_alone() {
        let dom = results_page();
        dom.add_element("pop", ElementInfo::visible_element("div", ""));
        dom.add_element("pop-add", ElementInfo::visible_element("button", "Add to Cart"));
        dom.bind(POPUPS, &["pop"]);
        dom.bind_within("pop", POPUP_CONFIRM, &["pop-add"]);
        let executor = executor(dom.clone());

        let stale = executor.pending_cart().begin("Echo Dot");
        let _newer = executor.pending_cart().begin("Echo Dot");
        executor.handle_cart_popup(&stale, "Echo Dot").await.unwrap();

        assert!(!dom.clicked("pop-add"));
    }
}
