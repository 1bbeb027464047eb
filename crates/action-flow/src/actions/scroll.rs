use action_primitives::{execute_scroll, ScrollBehavior, ScrollDirection};

use crate::{errors::FlowError, executor::DefaultActionExecutor, types::ActionOutcome};

impl DefaultActionExecutor {
    pub(crate) async fn scroll(
        &self,
        direction: ScrollDirection,
        amount: f64,
    ) -> Result<ActionOutcome, FlowError> {
        let outcome =
            execute_scroll(self.dom.as_ref(), direction, amount, ScrollBehavior::Smooth).await?;
        Ok(ActionOutcome::new(format!(
            "Scrolled {direction:?} from {} to {}",
            outcome.from, outcome.to
        )))
    }
}
