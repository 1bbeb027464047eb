//! Transient outline around elements the agent is about to act on

use std::sync::Arc;
use std::time::Duration;

use crate::{
    dom::PageDom,
    types::{ElementHandle, InlineStyle},
};
use tracing::debug;

/// Outlines elements and restores their previous style after `duration`.
///
/// Purely cosmetic: every failure is logged and swallowed.
#[derive(Clone)]
pub struct Highlighter {
    dom: Arc<dyn PageDom>,
    style: InlineStyle,
    duration: Duration,
}

impl Highlighter {
    pub fn new(dom: Arc<dyn PageDom>, duration: Duration) -> Self {
        Self {
            dom,
            style: InlineStyle::highlight(),
            duration,
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub async fn highlight(&self, element: &ElementHandle) {
        let previous = match self.dom.set_inline_style(element, &self.style).await {
            Ok(previous) => previous,
            Err(err) => {
                debug!(element = %element, %err, "Highlight skipped");
                return;
            }
        };

        let dom = Arc::clone(&self.dom);
        let element = element.clone();
        let duration = self.duration;
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            if let Err(err) = dom.set_inline_style(&element, &previous).await {
                debug!(element = %element, %err, "Highlight revert failed");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeDom;
    use crate::types::ElementInfo;

    #[tokio::test(start_paused = true)]
    async fn outline_reverts_after_duration() {
        let dom = Arc::new(FakeDom::new());
        let button = dom.add_element("b1", ElementInfo::visible_element("button", "Buy"));
        let highlighter = Highlighter::new(dom.clone(), Duration::from_millis(3000));

        highlighter.highlight(&button).await;
        assert_eq!(dom.style_of("b1"), InlineStyle::highlight());

        tokio::time::sleep(Duration::from_millis(3100)).await;
        assert_eq!(dom.style_of("b1"), InlineStyle::default());
    }
}
