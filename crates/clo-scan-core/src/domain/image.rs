//! Image types shared between ports and inference.

use serde::{Deserialize, Serialize};

/// Image dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl ImageDimensions {
    /// Creates new dimensions.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// A decoded image together with where it came from.
#[derive(Debug, Clone)]
pub struct ImageInfo {
    /// Path or identifier of the image.
    pub path: String,
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Decoded pixel data.
    pub image: image::DynamicImage,
}

impl ImageInfo {
    /// Creates image info from a decoded image, recording its dimensions.
    #[must_use]
    pub fn new(path: impl Into<String>, image: image::DynamicImage) -> Self {
        Self {
            path: path.into(),
            width: image.width(),
            height: image.height(),
            image,
        }
    }

    /// Returns the dimensions of this image.
    #[must_use]
    pub const fn dimensions(&self) -> ImageDimensions {
        ImageDimensions::new(self.width, self.height)
    }
}
