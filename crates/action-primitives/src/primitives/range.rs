//! Range control primitive

use crate::{
    dom::PageDom,
    errors::ActionError,
    types::{DomEvent, ElementHandle},
};
use tracing::debug;

/// Set a slider (or a hidden input mirroring one) and notify listeners.
pub async fn execute_set_range(
    dom: &dyn PageDom,
    element: &ElementHandle,
    value: &str,
) -> Result<(), ActionError> {
    debug!(element = %element, value, "Setting range control");
    dom.set_value(element, value).await?;
    dom.dispatch(element, DomEvent::Input).await?;
    dom.dispatch(element, DomEvent::Change).await?;
    Ok(())
}

/// Index of the step closest to `target`. Null steps never win.
pub fn closest_step_index(steps: &[Option<f64>], target: f64) -> Option<usize> {
    steps
        .iter()
        .enumerate()
        .filter_map(|(index, step)| step.map(|value| (index, (value - target).abs())))
        .fold(None, |best: Option<(usize, f64)>, (index, distance)| match best {
            Some((_, best_distance)) if best_distance <= distance => best,
            _ => Some((index, distance)),
        })
        .map(|(index, _)| index)
}
