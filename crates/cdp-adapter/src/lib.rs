//! Chrome DevTools Protocol page driver.
//!
//! Attaches to a page of an already running browser and implements the
//! executor's `PageDom` and the capture service's `ScreenCapture` on top of it.

pub mod config;
pub mod discovery;
pub mod error;
pub mod page;
pub mod transport;

use std::sync::Arc;

use tracing::info;

pub use config::CdpConfig;
pub use discovery::{discover_page_ws, list_targets, select_page, TargetInfo};
pub use error::{AdapterError, AdapterErrorKind};
pub use page::{CdpPage, HANDLE_ATTRIBUTE};
pub use transport::{CdpTransport, WsTransport};

/// Discover the page target and open a session to it.
pub async fn attach(config: &CdpConfig) -> Result<Arc<CdpPage>, AdapterError> {
    let ws_url = discover_page_ws(config).await?;
    let transport = WsTransport::connect(&ws_url, config.command_timeout()).await?;
    info!(devtools = %config.devtools_url, "Page driver ready");
    Ok(Arc::new(CdpPage::new(Arc::new(transport))))
}
