//! Click primitive

use crate::{
    dom::PageDom,
    errors::ActionError,
    types::{DomEvent, ElementHandle},
};
use tracing::{debug, info};

/// Click behaviour switches
#[derive(Debug, Clone, Copy)]
pub struct ClickOptions {
    /// Focus the element before clicking
    pub focus_first: bool,
    /// Follow the native click with a synthesized bubbling mouse event
    pub synthesize: bool,
}

impl Default for ClickOptions {
    fn default() -> Self {
        Self {
            focus_first: true,
            synthesize: true,
        }
    }
}

/// Execute click primitive
///
/// Steps:
/// 1. Re-check the element is still visible
/// 2. Focus it (best effort)
/// 3. Native click
/// 4. Synthesized mouse click for pages that ignore `click()`
pub async fn execute_click(
    dom: &dyn PageDom,
    element: &ElementHandle,
    options: ClickOptions,
) -> Result<(), ActionError> {
    let info = dom.describe(element).await?;
    if !info.is_visible() {
        return Err(ActionError::NotActionable(format!(
            "{} is no longer visible",
            info.describe()
        )));
    }

    info!(element = %element, target = %info.describe(), "Executing click primitive");

    if options.focus_first {
        if let Err(err) = dom.focus(element).await {
            debug!(element = %element, %err, "Focus before click failed");
        }
    }

    dom.click(element).await?;

    if options.synthesize {
        if let Err(err) = dom.dispatch(element, DomEvent::MouseClick).await {
            debug!(element = %element, %err, "Synthesized click failed");
        }
    }

    Ok(())
}
