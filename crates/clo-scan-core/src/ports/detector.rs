//! Detector port.

use crate::domain::{Detection, ImageInfo};

/// Port for garment object detection.
///
/// The aggregation core consumes only the output of this trait; which model
/// produces it (or whether it is a model at all) is an adapter concern.
pub trait Detector: Send + Sync {
    /// Returns the name of this detector.
    fn name(&self) -> &'static str;

    /// Detects garments in an image.
    ///
    /// Returns detections in the detector's native order; the aggregator
    /// preserves that order in its output.
    ///
    /// # Errors
    ///
    /// Returns an error if inference fails.
    fn detect(&self, image: &ImageInfo) -> anyhow::Result<Vec<Detection>>;
}
