//! Per-action selector lists.
//!
//! Defaults target the Amazon storefront layout; every list can be replaced from config.

use std::collections::BTreeMap;

use action_primitives::{ElementHandle, Scope};
use serde::{Deserialize, Serialize};

use crate::types::LocateQuery;

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorCatalog {
    pub search_inputs: Vec<String>,
    pub search_buttons: Vec<String>,

    /// Keyword → selectors used by `click_element` when the target mentions the keyword
    pub click_targets: BTreeMap<String, Vec<String>>,
    pub clickable: String,

    pub checkout_buttons: Vec<String>,
    pub checkout_candidates: String,
    pub checkout_words: Vec<String>,

    pub cart_links: Vec<String>,
    pub cart_candidates: String,
    pub cart_words: Vec<String>,

    pub product_containers: String,
    pub product_titles: Vec<String>,
    pub add_buttons: Vec<String>,
    pub add_button_candidates: String,
    pub add_button_classes: Vec<String>,

    pub popups: String,
    pub popup_confirm_buttons: String,
    pub popup_alt_buttons: String,
    pub popup_close_buttons: Vec<String>,

    pub price_form: String,
    pub price_lower_slider: String,
    pub price_upper_slider: String,
    pub price_low_input: String,
    pub price_high_input: String,
    pub price_submit_buttons: Vec<String>,
}

impl Default for LocatorCatalog {
    fn default() -> Self {
        let mut click_targets = BTreeMap::new();
        click_targets.insert(
            "cart".to_string(),
            strings(&[
                "#nav-cart",
                "[aria-label*=\"cart\" i]",
                "[class*=\"cart\" i]",
                "a[href*=\"cart\" i]",
                "button[class*=\"cart\" i]",
            ]),
        );
        click_targets.insert(
            "search".to_string(),
            strings(&[
                "#nav-search-submit-button",
                "[type=\"submit\"][class*=\"search\" i]",
                "button[aria-label*=\"search\" i]",
            ]),
        );
        click_targets.insert(
            "menu".to_string(),
            strings(&[
                "#nav-hamburger-menu",
                "[aria-label*=\"menu\" i]",
                "button[class*=\"menu\" i]",
            ]),
        );

        Self {
            search_inputs: strings(&[
                "#twotabsearchtextbox",
                "input[name=\"field-keywords\"]",
                "input[aria-label*=\"Search\" i]",
                "input[placeholder*=\"Search\" i]",
            ]),
            search_buttons: strings(&[
                "#nav-search-submit-button",
                "input[type=\"submit\"][value*=\"Go\" i]",
                "button[type=\"submit\"]",
                "input[type=\"submit\"]",
            ]),
            click_targets,
            clickable: "a, button, [onclick], [role=\"button\"], input[type=\"submit\"], input[type=\"button\"]"
                .to_string(),
            checkout_buttons: strings(&[
                "input[name=\"proceedToRetailCheckout\"]",
                "button[name=\"proceedToRetailCheckout\"]",
                "input[aria-labelledby=\"attach-sidesheet-checkout-button-announce\"]",
                "input[id=\"attach-sidesheet-checkout-button\"]",
                "a[href*=\"checkout\"]",
                "button[data-testid*=\"checkout\"]",
                "button[class*=\"checkout\"]",
                "a[class*=\"checkout\"]",
                "input[value*=\"checkout\" i]",
                "button[title*=\"checkout\" i]",
            ]),
            checkout_candidates: "a, button, input[type=\"submit\"]".to_string(),
            checkout_words: strings(&["checkout", "proceed"]),
            cart_links: strings(&[
                "#nav-cart",
                "a[href*=\"/cart\"]",
                "a[aria-label*=\"cart\" i]",
                "button[aria-label*=\"cart\" i]",
                "a[class*=\"cart\" i]",
                "button[class*=\"cart\" i]",
                "a[data-testid*=\"cart\" i]",
                "button[data-testid*=\"cart\" i]",
                "a[id*=\"cart\" i]",
                "button[id*=\"cart\" i]",
            ]),
            cart_candidates: "a, button, span[onclick], div[onclick]".to_string(),
            cart_words: strings(&["cart", "basket"]),
            product_containers: ".sg-col-inner".to_string(),
            product_titles: strings(&[
                "h2.a-size-base-plus.a-spacing-none.a-color-base.a-text-normal span",
                "h2 span",
                "[data-cy=\"title-recipe\"] h2 span",
                ".s-line-clamp-2 span",
                ".a-text-normal span",
            ]),
            add_buttons: strings(&[
                "button.a-button-text[type=\"button\"]",
                "button.a-button-text",
                "[data-cy=\"add-to-cart\"] button",
                ".puis-atcb-add-container button",
                ".a-button-inner button",
                "button[id*=\"autoid\"][id$=\"announce\"]",
                "button[type=\"button\"]",
                ".a-button-text",
            ]),
            add_button_candidates:
                "button, input[type=\"button\"], input[type=\"submit\"], .a-button, [role=\"button\"]"
                    .to_string(),
            add_button_classes: strings(&["atcb", "add-to-cart"]),
            popups: ".a-popover-wrapper, [id*=\"popover\"]".to_string(),
            popup_confirm_buttons: "button.a-button-text, [data-cy=\"add-to-cart\"] button, .puis-atcb-add-container button, button[type=\"button\"]"
                .to_string(),
            popup_alt_buttons: "button, input[type=\"button\"], .a-button".to_string(),
            popup_close_buttons: strings(&[
                "[data-action=\"a-popover-close\"]",
                ".a-button-close",
                "button[aria-label*=\"Close\"]",
            ]),
            price_form: "form[data-slider-id=\"p_36/range-slider\"]".to_string(),
            price_lower_slider: "#p_36\\/range-slider_slider-item_lower-bound-slider".to_string(),
            price_upper_slider: "#p_36\\/range-slider_slider-item_upper-bound-slider".to_string(),
            price_low_input: "input[name=\"low-price\"]".to_string(),
            price_high_input: "input[name=\"high-price\"]".to_string(),
            price_submit_buttons: strings(&[
                "input[aria-label=\"Go - Submit price range\"]",
                ".a-button-input[type=\"submit\"]",
                "input[type=\"submit\"]",
                ".sf-submit-range-button input",
            ]),
        }
    }
}

impl LocatorCatalog {
    pub fn search_input(&self) -> LocateQuery {
        LocateQuery::new("search input").selectors(self.search_inputs.iter().cloned())
    }

    pub fn search_button(&self) -> LocateQuery {
        LocateQuery::new("search button").selectors(self.search_buttons.iter().cloned())
    }

    /// Keyed selectors when the target mentions a known keyword, generic patterns otherwise,
    /// and a text scan over clickable elements last.
    pub fn click_target(&self, target: &str) -> LocateQuery {
        let lowered = target.to_lowercase();
        let keyed = self
            .click_targets
            .iter()
            .find(|(keyword, _)| lowered.contains(keyword.as_str()))
            .map(|(_, selectors)| selectors.clone());

        let query = LocateQuery::new(target.to_string());
        let query = match keyed {
            Some(selectors) => query.selectors(selectors),
            None => query.attribute_term(target.to_string()),
        };
        query.text(self.clickable.clone(), [lowered])
    }

    pub fn checkout(&self) -> LocateQuery {
        LocateQuery::new("checkout button")
            .selectors(self.checkout_buttons.iter().cloned())
            .text(self.checkout_candidates.clone(), &self.checkout_words)
    }

    pub fn cart_link(&self) -> LocateQuery {
        LocateQuery::new("cart link")
            .selectors(self.cart_links.iter().cloned())
            .text(self.cart_candidates.clone(), &self.cart_words)
    }

    pub fn product_title(&self, container: &ElementHandle) -> LocateQuery {
        LocateQuery::new("product title")
            .within(Scope::within(container))
            .selectors(self.product_titles.iter().cloned())
    }

    pub fn popup_close(&self, popup: &ElementHandle) -> LocateQuery {
        LocateQuery::new("popup close button")
            .within(Scope::within(popup))
            .selectors(self.popup_close_buttons.iter().cloned())
    }

    pub fn price_submit(&self, form: &ElementHandle) -> LocateQuery {
        LocateQuery::new("price range submit")
            .within(Scope::within(form))
            .selectors(self.price_submit_buttons.iter().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyed_click_targets_use_site_selectors() {
        let catalog = LocatorCatalog::default();
        let query = catalog.click_target("Shopping Cart");
        assert_eq!(query.selectors[0], "#nav-cart");
        assert!(query.attribute_term.is_none());
        assert_eq!(query.text.unwrap().needles, vec!["shopping cart".to_string()]);
    }

    #[test]
    fn unknown_click_targets_use_attribute_patterns() {
        let catalog = LocatorCatalog::default();
        let query = catalog.click_target("next page");
        assert!(query.selectors.is_empty());
        assert_eq!(query.attribute_term.as_deref(), Some("next page"));
    }

    #[test]
    fn partial_override_keeps_defaults() {
        let catalog: LocatorCatalog =
            serde_yaml::from_str("search_inputs: ['#q']\n").unwrap();
        assert_eq!(catalog.search_inputs, vec!["#q".to_string()]);
        assert_eq!(catalog.product_containers, ".sg-col-inner");
    }
}
