//! Scroll primitive - Move the viewport by a relative amount

use crate::{
    dom::PageDom,
    errors::ActionError,
    types::{ScrollBehavior, ScrollDirection},
};
use serde::Serialize;
use tracing::info;

/// Offsets before and after a scroll
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScrollOutcome {
    pub from: f64,
    pub to: f64,
}

/// Target offset for a relative scroll, never above the top of the page.
pub fn compute_scroll_target(current: f64, direction: ScrollDirection, amount: f64) -> f64 {
    let target = match direction {
        ScrollDirection::Down => current + amount,
        ScrollDirection::Up => current - amount,
    };
    target.max(0.0)
}

/// Execute scroll primitive
///
/// Reads the current offset, computes `max(0, current ± amount)` and scrolls there.
pub async fn execute_scroll(
    dom: &dyn PageDom,
    direction: ScrollDirection,
    amount: f64,
    behavior: ScrollBehavior,
) -> Result<ScrollOutcome, ActionError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(ActionError::ScrollTargetInvalid(format!(
            "scroll amount must be a positive number of pixels, got {amount}"
        )));
    }

    let from = dom.scroll_offset().await?;
    let to = compute_scroll_target(from, direction, amount);

    info!(
        direction = ?direction,
        amount,
        from,
        to,
        behavior = behavior.as_css(),
        "Executing scroll primitive"
    );

    dom.scroll_to(to, behavior).await?;
    Ok(ScrollOutcome { from, to })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeDom;

    #[test]
    fn upward_scroll_clamps_at_top() {
        assert_eq!(compute_scroll_target(100.0, ScrollDirection::Up, 300.0), 0.0);
        assert_eq!(compute_scroll_target(500.0, ScrollDirection::Up, 300.0), 200.0);
        assert_eq!(compute_scroll_target(0.0, ScrollDirection::Down, 300.0), 300.0);
    }

    #[tokio::test]
    async fn scrolls_relative_to_current_offset() {
        let dom = FakeDom::new();
        dom.set_scroll_offset(120.0);

        let outcome = execute_scroll(&dom, ScrollDirection::Down, 300.0, ScrollBehavior::Smooth)
            .await
            .unwrap();

        assert_eq!(outcome, ScrollOutcome { from: 120.0, to: 420.0 });
        assert_eq!(dom.scroll_offset_now(), 420.0);
    }

    #[tokio::test]
    async fn rejects_non_positive_amounts() {
        let dom = FakeDom::new();
        let err = execute_scroll(&dom, ScrollDirection::Down, 0.0, ScrollBehavior::Instant)
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::ScrollTargetInvalid(_)));
    }
}
