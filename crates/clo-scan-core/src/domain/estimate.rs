//! Aggregation result types.

use serde::{Deserialize, Serialize};

use super::{AnnotatedDetection, ImageDimensions};

/// Result of mapping a detection sequence onto the CLO coefficient table.
///
/// `detections` has the same length and order as the aggregator's input.
/// `total_clo` is the sum of per-detection contributions, the lower-body
/// fallback (when applied), and the base coefficient; it is therefore never
/// below the table's base coefficient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloEstimate {
    /// Annotated detections in input order.
    pub detections: Vec<AnnotatedDetection>,
    /// Aggregate garment insulation in CLO.
    pub total_clo: f32,
}

/// Complete estimation record for a single image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimateResult {
    /// Path to the analyzed image.
    pub path: String,
    /// Timestamp of analysis (RFC 3339).
    pub timestamp: String,
    /// Image dimensions.
    pub dimensions: ImageDimensions,
    /// Annotated detections in detector order.
    pub detections: Vec<AnnotatedDetection>,
    /// Aggregate garment insulation in CLO.
    pub total_clo: f32,
}

impl EstimateResult {
    /// Builds a per-image record from an estimate.
    #[must_use]
    pub fn new(
        path: impl Into<String>,
        timestamp: impl Into<String>,
        dimensions: ImageDimensions,
        estimate: CloEstimate,
    ) -> Self {
        Self {
            path: path.into(),
            timestamp: timestamp.into(),
            dimensions,
            detections: estimate.detections,
            total_clo: estimate.total_clo,
        }
    }
}
