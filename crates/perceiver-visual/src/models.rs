//! Capture request types
use serde::{Deserialize, Serialize};

pub const VIEWPORT_FILE_NAME: &str = "screen-capture.png";
pub const REGION_FILE_NAME: &str = "region-capture.png";

/// Rectangle in CSS pixels relative to the viewport
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CaptureRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl CaptureRect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Device-pixel bounds `(x, y, width, height)` after scaling and rounding
    pub fn scaled(&self, device_pixel_ratio: f64) -> (f64, f64, f64, f64) {
        (
            (self.left * device_pixel_ratio).round(),
            (self.top * device_pixel_ratio).round(),
            (self.width * device_pixel_ratio).round(),
            (self.height * device_pixel_ratio).round(),
        )
    }
}

/// Which pages may be captured
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapturePolicy {
    /// URL prefixes the browser refuses to capture
    pub restricted_prefixes: Vec<String>,
    /// Smallest region side, in CSS pixels
    pub min_region_px: f64,
}

impl Default for CapturePolicy {
    fn default() -> Self {
        Self {
            restricted_prefixes: vec![
                "chrome://".to_string(),
                "about:".to_string(),
                "moz-extension://".to_string(),
                "chrome-extension://".to_string(),
            ],
            min_region_px: 10.0,
        }
    }
}

impl CapturePolicy {
    pub fn is_restricted(&self, url: &str) -> bool {
        self.restricted_prefixes
            .iter()
            .any(|prefix| url.starts_with(prefix.as_str()))
    }
}
