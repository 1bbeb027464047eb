//! Tool actions and executor configuration

use action_primitives::{ScrollDirection, SettleDelays};
use cartpilot_core_types::ToolName;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::FlowError;

pub const DEFAULT_SCROLL_AMOUNT: f64 = 300.0;

/// A decoded tool call
#[derive(Debug, Clone, PartialEq)]
pub enum ToolAction {
    AddToCart { product_name: String },
    Scroll { direction: ScrollDirection, amount: f64 },
    SetPriceRange { min_price: f64, max_price: f64 },
    Search { query: String },
    Click { target: String },
    ScreenCapture,
    Checkout,
    NavigateToCart,
}

#[derive(Deserialize)]
struct AddToCartArgs {
    product_name: String,
}

#[derive(Deserialize)]
struct ScrollArgs {
    direction: ScrollDirection,
    #[serde(default)]
    amount: Option<f64>,
}

#[derive(Deserialize)]
struct PriceRangeArgs {
    min_price: f64,
    max_price: f64,
}

#[derive(Deserialize)]
struct SearchArgs {
    query: String,
}

#[derive(Deserialize)]
struct ClickArgs {
    target: String,
}

#[derive(Deserialize)]
struct CheckoutArgs {
    #[serde(default = "confirmed")]
    confirmation: bool,
}

fn confirmed() -> bool {
    true
}

fn non_empty(field: &str, value: String) -> Result<String, FlowError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(FlowError::InvalidArguments(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

impl ToolAction {
    /// Decode the assistant's arguments for `tool`.
    pub fn parse(tool: ToolName, args: &Value) -> Result<Self, FlowError> {
        let args = if args.is_null() {
            Value::Object(Default::default())
        } else {
            args.clone()
        };

        let action = match tool {
            ToolName::AddToCart => {
                let args: AddToCartArgs = serde_json::from_value(args)?;
                ToolAction::AddToCart {
                    product_name: non_empty("product_name", args.product_name)?,
                }
            }
            ToolName::ScrollPage => {
                let args: ScrollArgs = serde_json::from_value(args)?;
                ToolAction::Scroll {
                    direction: args.direction,
                    amount: args.amount.unwrap_or(DEFAULT_SCROLL_AMOUNT),
                }
            }
            ToolName::SetPriceRange => {
                let args: PriceRangeArgs = serde_json::from_value(args)?;
                if args.min_price < 0.0 || args.min_price > args.max_price {
                    return Err(FlowError::InvalidArguments(format!(
                        "price range {}-{} is not a valid range",
                        args.min_price, args.max_price
                    )));
                }
                ToolAction::SetPriceRange {
                    min_price: args.min_price,
                    max_price: args.max_price,
                }
            }
            ToolName::SearchPage => {
                let args: SearchArgs = serde_json::from_value(args)?;
                ToolAction::Search {
                    query: non_empty("query", args.query)?,
                }
            }
            ToolName::ClickElement => {
                let args: ClickArgs = serde_json::from_value(args)?;
                ToolAction::Click {
                    target: non_empty("target", args.target)?,
                }
            }
            ToolName::ScreenCapture => ToolAction::ScreenCapture,
            ToolName::Checkout => {
                let args: CheckoutArgs = serde_json::from_value(args)?;
                if !args.confirmation {
                    return Err(FlowError::InvalidArguments(
                        "checkout was not confirmed".to_string(),
                    ));
                }
                ToolAction::Checkout
            }
            ToolName::NavigateToCart => ToolAction::NavigateToCart,
        };
        Ok(action)
    }
}

/// What an action did, for logs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    pub summary: String,
}

impl ActionOutcome {
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    pub delays: SettleDelays,
    /// How long highlight outlines stay on
    pub highlight_ms: u64,
    /// Product containers inspected by add-to-cart
    pub product_scan_limit: usize,
    /// Hosts where a missing cart link falls back to `{origin}/cart`
    pub cart_fallback_hosts: Vec<String>,
    /// Follow native clicks with a synthesized mouse event
    pub synthesize_clicks: bool,
    /// Attach a viewport screenshot to every non-capture result
    pub capture_evidence: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            delays: SettleDelays::default(),
            highlight_ms: 3000,
            product_scan_limit: 40,
            cart_fallback_hosts: vec!["amazon".to_string()],
            synthesize_clicks: true,
            capture_evidence: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_scroll_with_default_amount() {
        let action = ToolAction::parse(ToolName::ScrollPage, &json!({"direction": "up"})).unwrap();
        assert_eq!(
            action,
            ToolAction::Scroll {
                direction: ScrollDirection::Up,
                amount: 300.0
            }
        );
    }

    #[test]
    fn no_argument_tools_accept_null() {
        assert_eq!(
            ToolAction::parse(ToolName::ScreenCapture, &Value::Null).unwrap(),
            ToolAction::ScreenCapture
        );
        assert_eq!(
            ToolAction::parse(ToolName::Checkout, &Value::Null).unwrap(),
            ToolAction::Checkout
        );
    }

    #[test]
    fn rejects_inverted_price_range() {
        let err = ToolAction::parse(
            ToolName::SetPriceRange,
            &json!({"min_price": 600, "max_price": 200}),
        )
        .unwrap_err();
        assert!(matches!(err, FlowError::InvalidArguments(_)));
    }

    #[test]
    fn rejects_missing_required_fields() {
        assert!(ToolAction::parse(ToolName::AddToCart, &json!({})).is_err());
        assert!(ToolAction::parse(ToolName::SearchPage, &json!({"query": "  "})).is_err());
        assert!(ToolAction::parse(ToolName::ScrollPage, &json!({"direction": "left"})).is_err());
    }

    #[test]
    fn unconfirmed_checkout_is_refused() {
        assert!(ToolAction::parse(ToolName::Checkout, &json!({"confirmation": false})).is_err());
    }
}
