//! Fixed settle delays between acting and observing

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Delays, in milliseconds, that let the page react before the next step.
///
/// These are pauses, not timeouts: nothing is cancelled when they elapse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettleDelays {
    /// After the action, before evidence is captured
    pub post_action_ms: u64,
    /// Between highlighting a target and clicking it
    pub pre_click_ms: u64,
    /// Between highlighting a product's add button and clicking it
    pub cart_pre_click_ms: u64,
    /// After the add-to-cart click, before looking for a popup
    pub popup_appear_ms: u64,
    /// Extra wait for a popup's contents to render
    pub popup_render_ms: u64,
    /// Between highlighting a popup button and clicking it
    pub popup_click_ms: u64,
}

impl Default for SettleDelays {
    fn default() -> Self {
        Self {
            post_action_ms: 1000,
            pre_click_ms: 500,
            cart_pre_click_ms: 1000,
            popup_appear_ms: 1500,
            popup_render_ms: 1000,
            popup_click_ms: 300,
        }
    }
}

impl SettleDelays {
    /// All delays zeroed.
    pub fn immediate() -> Self {
        Self {
            post_action_ms: 0,
            pre_click_ms: 0,
            cart_pre_click_ms: 0,
            popup_appear_ms: 0,
            popup_render_ms: 0,
            popup_click_ms: 0,
        }
    }

    pub fn post_action(&self) -> Duration {
        Duration::from_millis(self.post_action_ms)
    }

    pub fn pre_click(&self) -> Duration {
        Duration::from_millis(self.pre_click_ms)
    }

    pub fn cart_pre_click(&self) -> Duration {
        Duration::from_millis(self.cart_pre_click_ms)
    }

    pub fn popup_appear(&self) -> Duration {
        Duration::from_millis(self.popup_appear_ms)
    }

    pub fn popup_render(&self) -> Duration {
        Duration::from_millis(self.popup_render_ms)
    }

    pub fn popup_click(&self) -> Duration {
        Duration::from_millis(self.popup_click_ms)
    }
}

/// Sleep for `delay`; zero returns immediately without yielding to the timer.
pub async fn settle(delay: Duration) {
    if delay.is_zero() {
        return;
    }
    debug!(delay_ms = delay.as_millis() as u64, "Settling");
    tokio::time::sleep(delay).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_page_reaction_times() {
        let delays = SettleDelays::default();
        assert_eq!(delays.post_action(), Duration::from_secs(1));
        assert_eq!(delays.popup_appear(), Duration::from_millis(1500));
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let delays: SettleDelays = serde_json::from_str(r#"{"post_action_ms": 10}"#).unwrap();
        assert_eq!(delays.post_action_ms, 10);
        assert_eq!(delays.pre_click_ms, 500);
    }

    #[tokio::test]
    async fn zero_delay_returns_immediately() {
        settle(Duration::ZERO).await;
    }
}
