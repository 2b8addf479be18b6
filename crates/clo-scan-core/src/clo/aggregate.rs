//! Detection-to-insulation aggregation.
//!
//! A single pass over the detection sequence: every detection is annotated
//! with the coefficient for its label (or `0.0` when the table has no entry)
//! and the contributions are summed. When no lower-body garment was seen, the
//! policy's fallback coefficient is added to the total, modeling a subject
//! assumed to be wearing pants that the detector could not see.

use tracing::info;

use crate::domain::{AnnotatedDetection, CloEstimate, Detection};

use super::CloTable;

/// Lower-body garment labels and the assumed-garment fallback key.
///
/// Matching is case-insensitive and exact: no synonyms, no substrings. Only
/// the fallback label's coefficient is ever added for a missing lower body,
/// even though all lower-body labels suppress the fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackPolicy {
    lower_body_labels: Vec<String>,
    fallback_label: String,
}

impl FallbackPolicy {
    /// Creates a policy, normalizing all labels to lower case.
    #[must_use]
    pub fn new(
        lower_body_labels: impl IntoIterator<Item = impl Into<String>>,
        fallback_label: impl Into<String>,
    ) -> Self {
        Self {
            lower_body_labels: lower_body_labels
                .into_iter()
                .map(|l| l.into().to_lowercase())
                .collect(),
            fallback_label: fallback_label.into().to_lowercase(),
        }
    }

    /// Returns the lower-body label set.
    #[must_use]
    pub fn lower_body_labels(&self) -> &[String] {
        &self.lower_body_labels
    }

    /// Returns the label whose coefficient backs the fallback.
    #[must_use]
    pub fn fallback_label(&self) -> &str {
        &self.fallback_label
    }

    /// Whether an already lower-cased label counts as lower-body coverage.
    fn covers_lower_body(&self, normalized_label: &str) -> bool {
        self.lower_body_labels
            .iter()
            .any(|l| l == normalized_label)
    }
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self::new(["pants", "shorts", "skirt"], "pants")
    }
}

/// Maps detections onto the coefficient table and totals their insulation.
///
/// Detections are consumed and returned as a new annotated sequence of the
/// same length and order; labels without a table entry are annotated with
/// `0.0` but never dropped. The total is the sum of per-detection values, the
/// fallback contribution when no lower-body label was seen and the fallback
/// label has a coefficient, and the table's base value.
///
/// This is a pure transformation: it cannot fail, performs no I/O beyond a
/// log event when the fallback fires, and is safe to call concurrently with a
/// shared table.
#[must_use]
pub fn annotate(
    detections: Vec<Detection>,
    table: &CloTable,
    policy: &FallbackPolicy,
) -> CloEstimate {
    let mut total = 0.0f32;
    let mut found_lower_body = false;
    let mut annotated = Vec::with_capacity(detections.len());

    for detection in detections {
        let label = detection.class_label.to_lowercase();
        if policy.covers_lower_body(&label) {
            found_lower_body = true;
        }

        let clo_value = table.get(&label).unwrap_or(0.0);
        total += clo_value;
        annotated.push(AnnotatedDetection::new(detection, clo_value));
    }

    if !found_lower_body {
        if let Some(fallback) = table.get(policy.fallback_label()) {
            info!(
                label = policy.fallback_label(),
                clo = fallback,
                "no lower-body garment detected, assuming {}",
                policy.fallback_label()
            );
            total += fallback;
        }
    }

    total += table.base_clo();

    CloEstimate {
        detections: annotated,
        total_clo: total,
    }
}
