//! Error types for screenshot capture
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisualError {
    /// The capture source could not produce an image
    CaptureFailed(String),

    /// The current page forbids capture
    Restricted(String),

    /// Decoding, cropping or encoding failed
    ImageProcessing(String),

    /// Invalid input parameters
    InvalidInput(String),
}

impl fmt::Display for VisualError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CaptureFailed(msg) => write!(f, "Screenshot capture failed: {}", msg),
            Self::Restricted(url) => write!(f, "Cannot capture restricted page: {}", url),
            Self::ImageProcessing(msg) => write!(f, "Image processing error: {}", msg),
            Self::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
        }
    }
}

impl std::error::Error for VisualError {}

impl From<image::ImageError> for VisualError {
    fn from(err: image::ImageError) -> Self {
        Self::ImageProcessing(err.to_string())
    }
}
