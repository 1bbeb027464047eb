use action_primitives::execute_navigate;
use tracing::{info, warn};

use crate::{errors::FlowError, executor::DefaultActionExecutor, types::ActionOutcome};

impl DefaultActionExecutor {
    pub(crate) async fn click_element(&self, target: &str) -> Result<ActionOutcome, FlowError> {
        let query = self.catalog.click_target(target);
        let resolution = self
            .locate_and_click(&query, self.delays().pre_click())
            .await
            .map_err(|err| match err {
                FlowError::NotFound(_) => {
                    FlowError::NotFound(format!("Could not find element: {target}"))
                }
                other => other,
            })?;
        Ok(ActionOutcome::new(format!(
            "Clicked {} via {}",
            resolution.info.describe(),
            resolution.strategy.name()
        )))
    }

    pub(crate) async fn checkout(&self) -> Result<ActionOutcome, FlowError> {
        self.locate_and_click(&self.catalog.checkout(), self.delays().pre_click())
            .await
            .map_err(|err| match err {
                FlowError::NotFound(_) => FlowError::NotFound(
                    "Checkout button not found. Make sure you are on the cart page.".to_string(),
                ),
                other => other,
            })?;
        Ok(ActionOutcome::new("Proceeded to checkout"))
    }

    /// Click the cart link, or on known storefronts load `{origin}/cart` directly.
    pub(crate) async fn navigate_to_cart(&self) -> Result<ActionOutcome, FlowError> {
        match self
            .locate_and_click(&self.catalog.cart_link(), self.delays().pre_click())
            .await
        {
            Ok(_) => Ok(ActionOutcome::new("Opened cart")),
            Err(FlowError::NotFound(reason)) => {
                let location = self.dom.location().await?;
                let fallback = self
                    .config
                    .cart_fallback_hosts
                    .iter()
                    .any(|host| location.hostname.contains(host.as_str()));
                if !fallback || location.origin.is_empty() {
                    warn!(%reason, hostname = %location.hostname, "No cart link and no fallback");
                    return Err(FlowError::NotFound("Cart button not found".to_string()));
                }

                let url = format!("{}/cart", location.origin.trim_end_matches('/'));
                info!(%url, "Cart link missing, navigating directly");
                execute_navigate(self.dom.as_ref(), &url).await?;
                Ok(ActionOutcome::new(format!("Navigated to {url}")))
            }
            Err(other) => Err(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use action_primitives::{testing::DomCall, testing::FakeDom, ElementInfo};

    use crate::actions::tests::executor;
    use crate::errors::FlowError;

    #[tokio::test]
    async fn keyed_target_clicks_site_selector() {
        let dom = Arc::new(FakeDom::new());
        dom.add_element("cart", ElementInfo::visible_element("a", "Cart"));
        dom.bind("#nav-cart", &["cart"]);

        executor(dom.clone()).click_element("the cart icon").await.unwrap();

        assert!(dom.clicked("cart"));
    }

    #[tokio::test]
    async fn free_text_target_falls_back_to_text_scan() {
        let dom = Arc::new(FakeDom::new());
        dom.add_element("deal", ElementInfo::visible_element("a", "Today's Deals"));
        dom.bind(
            "a, button, [onclick], [role=\"button\"], input[type=\"submit\"], input[type=\"button\"]",
            &["deal"],
        );

        executor(dom.clone()).click_element("today's deals").await.unwrap();

        assert!(dom.clicked("deal"));
    }

    #[tokio::test]
    async fn missing_target_names_it() {
        let dom = Arc::new(FakeDom::new());
        let err = executor(dom).click_element("Buy Now").await.unwrap_err();
        assert_eq!(err, FlowError::NotFound("Could not find element: Buy Now".to_string()));
        assert!(err.is_locate_failure());
    }

    #[tokio::test]
    async fn hidden_checkout_button_is_not_clicked() {
        let dom = Arc::new(FakeDom::new());
        dom.add_element("co", ElementInfo::hidden_element("input", "Proceed to checkout"));
        dom.bind("input[name=\"proceedToRetailCheckout\"]", &["co"]);

        let err = executor(dom.clone()).checkout().await.unwrap_err();

        assert!(err.is_locate_failure());
        assert!(!dom.clicked("co"));
    }

    #[tokio::test]
    async fn cart_falls_back_to_origin_on_known_host() {
        let dom = Arc::new(FakeDom::new());
        dom.set_location("https://www.amazon.com/s?k=kindle");

        executor(dom.clone()).navigate_to_cart().await.unwrap();

        assert!(dom
            .calls()
            .contains(&DomCall::Navigate("https://www.amazon.com/cart".to_string())));
    }

    #[tokio::test]
    async fn cart_without_link_elsewhere_fails() {
        let dom = Arc::new(FakeDom::new());
        dom.set_location("https://shop.example/catalog");

        let err = executor(dom.clone()).navigate_to_cart().await.unwrap_err();

        assert_eq!(err, FlowError::NotFound("Cart button not found".to_string()));
        assert!(!dom.calls().iter().any(|call| matches!(call, DomCall::Navigate(_))));
    }
}
