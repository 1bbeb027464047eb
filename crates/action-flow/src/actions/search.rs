use action_primitives::execute_type_text;
use tracing::info;

use crate::{errors::FlowError, executor::DefaultActionExecutor, types::ActionOutcome};

impl DefaultActionExecutor {
    /// Fill the search box and submit it.
    pub(crate) async fn search(&self, query: &str) -> Result<ActionOutcome, FlowError> {
        let input = self
            .locator
            .locate(self.dom.as_ref(), &self.catalog.search_input())
            .await
            .map_err(|err| match FlowError::from(err) {
                FlowError::NotFound(_) => {
                    FlowError::NotFound("Search box not found on this page".to_string())
                }
                other => other,
            })?;

        self.highlighter.highlight(&input.element).await;
        execute_type_text(self.dom.as_ref(), &input.element, query).await?;
        info!(query, selector = %input.selector, "Search query entered");

        self.locate_and_click(&self.catalog.search_button(), self.delays().pre_click())
            .await
            .map_err(|err| match err {
                FlowError::NotFound(_) => {
                    FlowError::NotFound("Search button not found on this page".to_string())
                }
                other => other,
            })?;

        Ok(ActionOutcome::new(format!("Searched for '{query}'")))
    }
}
