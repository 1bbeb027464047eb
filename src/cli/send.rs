use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use cartpilot_core_types::{ImagePayload, ThreadId};
use channel_client::{Backend, HttpBackend};
use clap::Args;
use tokio::fs;
use tracing::info;

use crate::config::AppConfig;

#[derive(Args, Debug, Clone)]
pub struct SendArgs {
    /// Message text
    #[arg(default_value = "")]
    pub message: String,

    /// Thread to send into (a new thread when omitted)
    #[arg(long, value_name = "ID")]
    pub thread: Option<String>,

    /// Attach an image file
    #[arg(long, value_name = "FILE")]
    pub image: Option<PathBuf>,
}

pub async fn cmd_send(args: SendArgs, config: &AppConfig) -> Result<()> {
    config.validate().context("invalid configuration")?;
    let backend = HttpBackend::from_config(&config.channel)?;
    let thread_id = args.thread.map(ThreadId::from).unwrap_or_default();
    let image = match args.image.as_deref() {
        Some(path) => Some(load_image(path).await?),
        None => None,
    };

    info!(%thread_id, url = %backend.chat_url(), "Sending one-shot turn");
    let reply = backend
        .send_turn(&args.message, &thread_id, image.as_ref())
        .await
        .context("Backend request failed")?;
    println!("{reply}");
    Ok(())
}

fn image_mime(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// Read an image file into a payload named after the file.
pub async fn load_image(path: &Path) -> Result<ImagePayload> {
    let Some(mime) = image_mime(path) else {
        bail!("{} is not a png, jpeg, gif or webp image", path.display());
    };
    let bytes = fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("image");
    Ok(ImagePayload::from_bytes(&bytes, mime, file_name))
}
