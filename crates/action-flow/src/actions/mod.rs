//! One module per browser tool. Each adds an `impl DefaultActionExecutor` block.

mod cart;
mod click;
mod price;
mod scroll;
mod search;

use crate::{
    errors::FlowError,
    executor::DefaultActionExecutor,
    types::{ActionOutcome, ToolAction},
};

impl DefaultActionExecutor {
    pub(crate) async fn perform(&self, action: &ToolAction) -> Result<ActionOutcome, FlowError> {
        match action {
            ToolAction::AddToCart { product_name } => self.add_to_cart(product_name).await,
            ToolAction::Scroll { direction, amount } => self.scroll(*direction, *amount).await,
            ToolAction::SetPriceRange {
                min_price,
                max_price,
            } => self.set_price_range(*min_price, *max_price).await,
            ToolAction::Search { query } => self.search(query).await,
            ToolAction::Click { target } => self.click_element(target).await,
            ToolAction::Checkout => self.checkout().await,
            ToolAction::NavigateToCart => self.navigate_to_cart().await,
            ToolAction::ScreenCapture => Err(FlowError::Internal(
                "screen capture does not act on the page".to_string(),
            )),
        }
    }
}
