use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use perceiver_visual::{CaptureRect, ScreenshotService, VIEWPORT_FILE_NAME};
use tokio::fs;
use tracing::info;

use crate::config::AppConfig;

#[derive(Args, Debug, Clone)]
pub struct CaptureArgs {
    /// Output file
    #[arg(short, long, default_value = VIEWPORT_FILE_NAME)]
    pub output: PathBuf,

    /// Crop to `left,top,width,height` in CSS pixels
    #[arg(long, value_name = "RECT", value_parser = parse_region)]
    pub region: Option<CaptureRect>,
}

pub async fn cmd_capture(args: CaptureArgs, config: &AppConfig) -> Result<()> {
    config.validate().context("invalid configuration")?;
    let page = cdp_adapter::attach(&config.browser.devtools)
        .await
        .context("Failed to attach to the browser")?;
    let service = ScreenshotService::new(page.clone(), config.browser.capture.clone());

    let image = match args.region {
        Some(rect) => {
            let ratio = page.device_pixel_ratio().await?;
            service.capture_region(rect, ratio).await?
        }
        None => service.capture_viewport().await?,
    };
    let bytes = image.decode()?;
    fs::write(&args.output, &bytes)
        .await
        .with_context(|| format!("writing {}", args.output.display()))?;

    info!(path = %args.output.display(), bytes = bytes.len(), "Screenshot saved");
    println!("Saved {} ({} bytes)", args.output.display(), bytes.len());
    Ok(())
}

fn parse_region(raw: &str) -> Result<CaptureRect> {
    let parts = raw
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("{raw} is not a list of numbers"))?;
    let [left, top, width, height] = parts[..] else {
        bail!("expected left,top,width,height, got {raw}");
    };
    Ok(CaptureRect::new(left, top, width, height))
}
