//! Scriptable capture source for tests.

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use image::{DynamicImage, ImageOutputFormat, RgbaImage};

use crate::{errors::VisualError, screenshot::ScreenCapture};

/// Opaque white PNG of the given size.
pub fn solid_png(width: u32, height: u32) -> Vec<u8> {
    let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
        width,
        height,
        image::Rgba([255, 255, 255, 255]),
    ));
    let mut out = Cursor::new(Vec::new());
    image
        .write_to(&mut out, ImageOutputFormat::Png)
        .expect("encode test png");
    out.into_inner()
}

pub struct FakeCapture {
    result: Result<Vec<u8>, VisualError>,
    url: Option<String>,
    calls: AtomicUsize,
}

impl FakeCapture {
    pub fn new(png: Vec<u8>) -> Self {
        Self {
            result: Ok(png),
            url: Some("https://shop.example/".to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            result: Err(VisualError::CaptureFailed(reason.to_string())),
            url: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_url(mut self, url: &str) -> Self {
        self.url = Some(url.to_string());
        self
    }

    pub fn captures(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScreenCapture for FakeCapture {
    async fn capture_visible(&self) -> Result<Vec<u8>, VisualError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }

    async fn current_url(&self) -> Result<Option<String>, VisualError> {
        Ok(self.url.clone())
    }
}
