//! Visual Perceiver - Screenshot capture for CartPilot
//!
//! This crate provides:
//! - Viewport capture through a pluggable [`ScreenCapture`] source
//! - Region capture, cropped by device pixel ratio
//! - Refusal of restricted internal pages

pub mod errors;
pub mod models;
pub mod screenshot;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-exports
pub use errors::VisualError;
pub use models::*;
pub use screenshot::{crop_png, ScreenCapture, ScreenshotService};
