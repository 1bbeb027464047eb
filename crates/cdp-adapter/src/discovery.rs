//! Finds the page websocket through the DevTools `/json` listing.

use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::{
    config::CdpConfig,
    error::{AdapterError, AdapterErrorKind},
};

/// One entry of the `/json` target listing.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default, rename = "type")]
    pub target_type: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub web_socket_debugger_url: Option<String>,
}

/// First attachable page, optionally the first whose url contains `filter`.
pub fn select_page<'a>(targets: &'a [TargetInfo], filter: Option<&str>) -> Option<&'a TargetInfo> {
    targets
        .iter()
        .filter(|target| target.target_type == "page")
        .filter(|target| target.web_socket_debugger_url.is_some())
        .find(|target| filter.map_or(true, |needle| target.url.contains(needle)))
}

pub async fn list_targets(config: &CdpConfig) -> Result<Vec<TargetInfo>, AdapterError> {
    let base = Url::parse(&config.devtools_url).map_err(|err| {
        AdapterError::new(AdapterErrorKind::Discovery)
            .with_hint(format!("{}: {err}", config.devtools_url))
    })?;
    let listing = base.join("/json").map_err(|err| {
        AdapterError::new(AdapterErrorKind::Discovery).with_hint(err.to_string())
    })?;

    let targets: Vec<TargetInfo> = reqwest::get(listing).await?.json().await?;
    debug!(targets = targets.len(), "DevTools targets listed");
    Ok(targets)
}

/// Websocket url of the page to drive.
pub async fn discover_page_ws(config: &CdpConfig) -> Result<String, AdapterError> {
    let targets = list_targets(config).await?;
    let page = select_page(&targets, config.page_url_filter.as_deref()).ok_or_else(|| {
        AdapterError::new(AdapterErrorKind::Discovery).with_hint(format!(
            "no page target at {} (filter: {:?})",
            config.devtools_url, config.page_url_filter
        ))
    })?;
    debug!(id = %page.id, url = %page.url, "Attaching to page");
    page.web_socket_debugger_url
        .clone()
        .ok_or_else(|| AdapterError::new(AdapterErrorKind::Internal))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targets() -> Vec<TargetInfo> {
        serde_json::from_str(
            r#"[
                {"id": "sw", "type": "service_worker", "url": "https://shop.example/sw.js",
                 "webSocketDebuggerUrl": "ws://127.0.0.1:9222/devtools/page/sw"},
                {"id": "a", "type": "page", "title": "New Tab", "url": "chrome://newtab/",
                 "webSocketDebuggerUrl": "ws://127.0.0.1:9222/devtools/page/a"},
                {"id": "b", "type": "page", "title": "Shop", "url": "https://www.amazon.com/s?k=mug",
                 "webSocketDebuggerUrl": "ws://127.0.0.1:9222/devtools/page/b"},
                {"id": "c", "type": "page", "url": "https://attached.example/"}
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn picks_first_page_target() {
        let targets = targets();
        assert_eq!(select_page(&targets, None).unwrap().id, "a");
    }

    #[test]
    fn filter_matches_on_url() {
        let targets = targets();
        assert_eq!(select_page(&targets, Some("amazon")).unwrap().id, "b");
        assert!(select_page(&targets, Some("attached")).is_none());
    }
}
