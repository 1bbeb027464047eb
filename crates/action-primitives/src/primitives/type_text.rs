//! Type text primitive

use crate::{
    dom::PageDom,
    errors::ActionError,
    types::{DomEvent, ElementHandle},
};
use tracing::info;

/// Execute type text primitive
///
/// Focuses the field, replaces its value, then fires `input` and `change`
/// so framework listeners observe the edit.
pub async fn execute_type_text(
    dom: &dyn PageDom,
    element: &ElementHandle,
    text: &str,
) -> Result<(), ActionError> {
    info!(element = %element, text_len = text.len(), "Executing type_text primitive");

    dom.focus(element).await?;
    dom.set_value(element, text).await?;
    dom.dispatch(element, DomEvent::Input).await?;
    dom.dispatch(element, DomEvent::Change).await?;
    Ok(())
}
