//! Screenshot capture service
use crate::{errors::VisualError, models::*};
use async_trait::async_trait;
use cartpilot_core_types::ImagePayload;
use image::{GenericImageView, ImageOutputFormat};
use std::io::Cursor;
use std::sync::Arc;
use tracing::{debug, warn};

/// Source of raw viewport pixels.
#[async_trait]
pub trait ScreenCapture: Send + Sync {
    /// PNG of the currently visible area
    async fn capture_visible(&self) -> Result<Vec<u8>, VisualError>;

    /// URL of the page being captured, when known
    async fn current_url(&self) -> Result<Option<String>, VisualError>;
}

/// Viewport and region captures with restricted-page checks
pub struct ScreenshotService {
    source: Arc<dyn ScreenCapture>,
    policy: CapturePolicy,
}

impl ScreenshotService {
    pub fn new(source: Arc<dyn ScreenCapture>, policy: CapturePolicy) -> Self {
        Self { source, policy }
    }

    pub fn policy(&self) -> &CapturePolicy {
        &self.policy
    }

    /// Capture the visible area of the page.
    pub async fn capture_viewport(&self) -> Result<ImagePayload, VisualError> {
        let bytes = self.capture_allowed().await?;
        debug!(bytes = bytes.len(), "Captured viewport");
        Ok(ImagePayload::png(&bytes, VIEWPORT_FILE_NAME))
    }

    /// Capture the visible area and crop it to `rect`, given in CSS pixels.
    pub async fn capture_region(
        &self,
        rect: CaptureRect,
        device_pixel_ratio: f64,
    ) -> Result<ImagePayload, VisualError> {
        if !device_pixel_ratio.is_finite() || device_pixel_ratio <= 0.0 {
            return Err(VisualError::InvalidInput(format!(
                "device pixel ratio must be positive, got {device_pixel_ratio}"
            )));
        }
        if rect.width < self.policy.min_region_px || rect.height < self.policy.min_region_px {
            return Err(VisualError::InvalidInput(format!(
                "region {}x{} is smaller than {}px",
                rect.width, rect.height, self.policy.min_region_px
            )));
        }

        let bytes = self.capture_allowed().await?;
        let cropped = crop_png(&bytes, rect, device_pixel_ratio)?;
        debug!(?rect, device_pixel_ratio, bytes = cropped.len(), "Captured region");
        Ok(ImagePayload::png(&cropped, REGION_FILE_NAME))
    }

    async fn capture_allowed(&self) -> Result<Vec<u8>, VisualError> {
        match self.source.current_url().await {
            Ok(Some(url)) if self.policy.is_restricted(&url) => {
                return Err(VisualError::Restricted(url));
            }
            Ok(_) => {}
            Err(err) => warn!(%err, "Could not read page URL before capture"),
        }

        let bytes = self.source.capture_visible().await?;
        if bytes.is_empty() {
            return Err(VisualError::CaptureFailed(
                "capture returned an empty image".to_string(),
            ));
        }
        Ok(bytes)
    }
}

/// Crop an encoded image to `rect` × `device_pixel_ratio`, clamped to the image bounds.
pub fn crop_png(
    bytes: &[u8],
    rect: CaptureRect,
    device_pixel_ratio: f64,
) -> Result<Vec<u8>, VisualError> {
    let image = image::load_from_memory(bytes)?;
    let (image_width, image_height) = image.dimensions();
    let (x, y, width, height) = rect.scaled(device_pixel_ratio);

    let x = x.max(0.0).min(image_width as f64) as u32;
    let y = y.max(0.0).min(image_height as f64) as u32;
    let width = width.max(0.0).min((image_width - x) as f64) as u32;
    let height = height.max(0.0).min((image_height - y) as f64) as u32;
    if width == 0 || height == 0 {
        return Err(VisualError::InvalidInput(
            "region lies outside the captured image".to_string(),
        ));
    }

    let cropped = image.crop_imm(x, y, width, height);
    let mut out = Cursor::new(Vec::new());
    cropped.write_to(&mut out, ImageOutputFormat::Png)?;
    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{solid_png, FakeCapture};

    fn dimensions(payload: &ImagePayload) -> (u32, u32) {
        image::load_from_memory(&payload.decode().unwrap())
            .unwrap()
            .dimensions()
    }

    #[tokio::test]
    async fn viewport_capture_returns_png_payload() {
        let service = ScreenshotService::new(
            Arc::new(FakeCapture::new(solid_png(64, 48))),
            CapturePolicy::default(),
        );
        let payload = service.capture_viewport().await.unwrap();
        assert_eq!(payload.mime_type, "image/png");
        assert_eq!(payload.file_name, VIEWPORT_FILE_NAME);
        assert_eq!(dimensions(&payload), (64, 48));
    }

    #[tokio::test]
    async fn region_scales_by_pixel_ratio() {
        let service = ScreenshotService::new(
            Arc::new(FakeCapture::new(solid_png(200, 100))),
            CapturePolicy::default(),
        );
        let payload = service
            .capture_region(CaptureRect::new(10.0, 5.0, 30.0, 20.0), 2.0)
            .await
            .unwrap();
        assert_eq!(dimensions(&payload), (60, 40));
    }

    #[tokio::test]
    async fn region_is_clamped_to_image() {
        let service = ScreenshotService::new(
            Arc::new(FakeCapture::new(solid_png(100, 100))),
            CapturePolicy::default(),
        );
        let payload = service
            .capture_region(CaptureRect::new(80.0, 90.0, 50.0, 50.0), 1.0)
            .await
            .unwrap();
        assert_eq!(dimensions(&payload), (20, 10));
    }

    #[tokio::test]
    async fn tiny_regions_are_rejected() {
        let service = ScreenshotService::new(
            Arc::new(FakeCapture::new(solid_png(100, 100))),
            CapturePolicy::default(),
        );
        let err = service
            .capture_region(CaptureRect::new(0.0, 0.0, 5.0, 50.0), 1.0)
            .await
            .unwrap_err();
        assert!(matches!(err, VisualError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn restricted_pages_are_refused() {
        let source = FakeCapture::new(solid_png(10, 10)).with_url("chrome://settings");
        let service = ScreenshotService::new(Arc::new(source), CapturePolicy::default());
        let err = service.capture_viewport().await.unwrap_err();
        assert_eq!(err, VisualError::Restricted("chrome://settings".into()));
    }

    #[tokio::test]
    async fn source_failures_are_reported() {
        let service = ScreenshotService::new(
            Arc::new(FakeCapture::failing("tab closed")),
            CapturePolicy::default(),
        );
        assert!(matches!(
            service.capture_viewport().await,
            Err(VisualError::CaptureFailed(_))
        ));
    }

    #[tokio::test]
    async fn empty_capture_is_a_failure() {
        let service = ScreenshotService::new(
            Arc::new(FakeCapture::new(Vec::new())),
            CapturePolicy::default(),
        );
        assert!(service.capture_viewport().await.is_err());
    }
}
