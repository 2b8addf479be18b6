//! Detection types produced by the garment detector and the aggregator.

use serde::{Deserialize, Serialize};

/// A single classified, localized object instance from the detector.
///
/// The bounding box is `[x_min, y_min, x_max, y_max]` in pixel coordinates of
/// the source image. Confidence is whatever the detector reports; the
/// aggregation core passes both through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Detector class index.
    pub class_id: usize,
    /// Predicted category name (e.g. "jacket").
    pub class_label: String,
    /// Detection confidence in `[0, 1]`.
    pub confidence: f32,
    /// Bounding box `[x_min, y_min, x_max, y_max]`.
    pub bbox: [f32; 4],
}

impl Detection {
    /// Creates a new detection.
    #[must_use]
    pub fn new(class_id: usize, class_label: impl Into<String>, confidence: f32, bbox: [f32; 4]) -> Self {
        Self {
            class_id,
            class_label: class_label.into(),
            confidence,
            bbox,
        }
    }
}

/// A detection annotated with its insulation contribution.
///
/// Produced by [`crate::clo::annotate`]; the input [`Detection`] is consumed
/// rather than mutated, so callers holding the raw detections are unaffected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedDetection {
    /// Detector class index.
    pub class_id: usize,
    /// Predicted category name.
    pub class_label: String,
    /// Detection confidence in `[0, 1]`.
    pub confidence: f32,
    /// Bounding box `[x_min, y_min, x_max, y_max]`.
    pub bbox: [f32; 4],
    /// CLO contribution of this garment; `0.0` for labels without a
    /// coefficient entry.
    pub clo_value: f32,
}

impl AnnotatedDetection {
    /// Annotates a detection with its CLO contribution.
    #[must_use]
    pub fn new(detection: Detection, clo_value: f32) -> Self {
        Self {
            class_id: detection.class_id,
            class_label: detection.class_label,
            confidence: detection.confidence,
            bbox: detection.bbox,
            clo_value,
        }
    }
}
