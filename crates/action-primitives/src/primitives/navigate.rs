//! Navigate primitive

use crate::{dom::PageDom, errors::ActionError};
use tracing::info;

/// Load `url` in the current page. Only absolute http(s) URLs are accepted.
pub async fn execute_navigate(dom: &dyn PageDom, url: &str) -> Result<(), ActionError> {
    let parsed = url::Url::parse(url)
        .map_err(|err| ActionError::InvalidArgument(format!("invalid URL '{url}': {err}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ActionError::InvalidArgument(format!(
            "refusing to navigate to non-http URL '{url}'"
        )));
    }

    info!(url = %parsed, "Executing navigate primitive");
    dom.navigate(parsed.as_str()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{DomCall, FakeDom};

    #[tokio::test]
    async fn navigates_to_http_urls() {
        let dom = FakeDom::new();
        execute_navigate(&dom, "https://shop.example/cart").await.unwrap();
        assert_eq!(
            dom.calls(),
            vec![DomCall::Navigate("https://shop.example/cart".into())]
        );
    }

    #[tokio::test]
    async fn rejects_other_schemes() {
        let dom = FakeDom::new();
        assert!(execute_navigate(&dom, "javascript:alert(1)").await.is_err());
        assert!(execute_navigate(&dom, "not a url").await.is_err());
    }
}
