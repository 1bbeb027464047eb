use action_primitives::{closest_step_index, execute_set_range, ElementHandle, Scope};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::{errors::FlowError, executor::DefaultActionExecutor, types::ActionOutcome};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SliderProps {
    step_values: Vec<Value>,
}

/// Step values from a slider form's `data-slider-props`. Entries that are not
/// numbers become `None` and never win the closest-step search.
pub(crate) fn parse_step_values(props: &str) -> Result<Vec<Option<f64>>, FlowError> {
    let props: SliderProps = serde_json::from_str(props)
        .map_err(|err| FlowError::Internal(format!("Error parsing slider data: {err}")))?;
    Ok(props
        .step_values
        .iter()
        .map(|value| match value {
            Value::Number(number) => number.as_f64(),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        })
        .collect())
}

fn format_price(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

impl DefaultActionExecutor {
    async fn first_match(
        &self,
        scope: &Scope,
        selector: &str,
    ) -> Result<Option<ElementHandle>, FlowError> {
        Ok(self.dom.query_all(scope, selector).await?.into_iter().next())
    }

    /// Snap both bounds to the slider's step values, move the sliders, mirror the
    /// prices into the form's hidden inputs and submit.
    pub(crate) async fn set_price_range(
        &self,
        min_price: f64,
        max_price: f64,
    ) -> Result<ActionOutcome, FlowError> {
        let form = self
            .first_match(&Scope::Document, &self.catalog.price_form)
            .await?
            .ok_or_else(|| {
                FlowError::NotFound("Price range filter not found on this page".to_string())
            })?;

        let props = self
            .dom
            .attribute(&form, "data-slider-props")
            .await?
            .ok_or_else(|| FlowError::NotFound("Price slider data not found".to_string()))?;
        let steps = parse_step_values(&props)?;

        let (lower_index, upper_index) = match (
            closest_step_index(&steps, min_price),
            closest_step_index(&steps, max_price),
        ) {
            (Some(lower), Some(upper)) => (lower, upper),
            _ => {
                return Err(FlowError::NotFound(
                    "Price slider has no usable step values".to_string(),
                ))
            }
        };
        let lower_value = steps[lower_index].unwrap_or(min_price);
        let upper_value = steps[upper_index].unwrap_or(max_price);
        debug!(min_price, lower_index, lower_value, max_price, upper_index, upper_value, "Snapped price bounds");

        let lower = self
            .first_match(&Scope::Document, &self.catalog.price_lower_slider)
            .await?;
        let upper = self
            .first_match(&Scope::Document, &self.catalog.price_upper_slider)
            .await?;
        let (lower, upper) = match (lower, upper) {
            (Some(lower), Some(upper)) => (lower, upper),
            _ => return Err(FlowError::NotFound("Could not find slider controls".to_string())),
        };

        execute_set_range(self.dom.as_ref(), &lower, &lower_index.to_string()).await?;
        execute_set_range(self.dom.as_ref(), &upper, &upper_index.to_string()).await?;

        let within = Scope::within(&form);
        let low_input = self.first_match(&within, &self.catalog.price_low_input).await?;
        let high_input = self.first_match(&within, &self.catalog.price_high_input).await?;
        if let (Some(low_input), Some(high_input)) = (low_input, high_input) {
            self.dom
                .set_value(&low_input, &format_price(lower_value))
                .await?;
            self.dom
                .set_value(&high_input, &format_price(upper_value))
                .await?;
        }

        self.highlighter.highlight(&lower).await;
        self.highlighter.highlight(&upper).await;

        self.locate_and_click(&self.catalog.price_submit(&form), self.delays().pre_click())
            .await
            .map_err(|err| match err {
                FlowError::NotFound(_) => FlowError::NotFound(
                    "Could not find submit button for price range".to_string(),
                ),
                other => other,
            })?;

        info!(lower_value, upper_value, "Applied price range");
        Ok(ActionOutcome::new(format!(
            "Set price range: {} - {}",
            format_price(lower_value),
            format_price(upper_value)
        )))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use action_primitives::{testing::FakeDom, DomEvent, ElementInfo};

    use super::*;
    use crate::actions::tests::executor;

    const FORM: &str = "form[data-slider-id=\"p_36/range-slider\"]";

    fn price_page() -> Arc<FakeDom> {
        let dom = Arc::new(FakeDom::new());
        dom.add_element("form", ElementInfo::visible_element("form", ""));
        dom.set_attribute(
            "form",
            "data-slider-props",
            r#"{"stepValues":[0,100,null,300,500,1000]}"#,
        );
        dom.add_element("lo", ElementInfo::visible_element("input", ""));
        dom.add_element("hi", ElementInfo::visible_element("input", ""));
        dom.add_element("low-price", ElementInfo::hidden_element("input", ""));
        dom.add_element("high-price", ElementInfo::hidden_element("input", ""));
        dom.add_element("go", ElementInfo::visible_element("input", "Go"));
        dom.bind(FORM, &["form"]);
        dom.bind("#p_36\\/range-slider_slider-item_lower-bound-slider", &["lo"]);
        dom.bind("#p_36\\/range-slider_slider-item_upper-bound-slider", &["hi"]);
        dom.bind_within("form", "input[name=\"low-price\"]", &["low-price"]);
        dom.bind_within("form", "input[name=\"high-price\"]", &["high-price"]);
        dom.bind_within("form", "input[aria-label=\"Go - Submit price range\"]", &["go"]);
        dom
    }

    #[test]
    fn step_values_tolerate_nulls_and_strings() {
        let steps = parse_step_values(r#"{"stepValues":[0,"250",null,{"x":1}]}"#).unwrap();
        assert_eq!(steps, vec![Some(0.0), Some(250.0), None, None]);
    }

    #[test]
    fn malformed_props_are_rejected() {
        assert!(parse_step_values("not json").is_err());
    }

    #[tokio::test]
    async fn snaps_bounds_and_submits() {
        let dom = price_page();

        let outcome = executor(dom.clone()).set_price_range(280.0, 600.0).await.unwrap();

        assert_eq!(dom.value_of("lo").as_deref(), Some("3"));
        assert_eq!(dom.value_of("hi").as_deref(), Some("4"));
        assert_eq!(dom.value_of("low-price").as_deref(), Some("300"));
        assert_eq!(dom.value_of("high-price").as_deref(), Some("500"));
        assert_eq!(dom.dispatched("lo"), vec![DomEvent::Input, DomEvent::Change]);
        assert!(dom.clicked("go"));
        assert_eq!(outcome.summary, "Set price range: 300 - 500");
    }

    #[tokio::test]
    async fn missing_form_is_not_found() {
        let dom = Arc::new(FakeDom::new());
        let err = executor(dom).set_price_range(0.0, 100.0).await.unwrap_err();
        assert!(err.is_locate_failure());
    }

    #[tokio::test]
    async fn missing_sliders_fail_before_submit() {
        let dom = price_page();
        dom.bind("#p_36\\/range-slider_slider-item_upper-bound-slider", &[]);

        let err = executor(dom.clone()).set_price_range(0.0, 100.0).await.unwrap_err();

        assert_eq!(err, FlowError::NotFound("Could not find slider controls".to_string()));
        assert!(!dom.clicked("go"));
    }
}
