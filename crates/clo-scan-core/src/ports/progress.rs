//! Progress reporting port for UI integration.

use crate::domain::EstimateResult;

/// Events emitted while estimating a batch of images.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Estimation started for an image.
    Started {
        /// Path to the image.
        path: String,
        /// Index in the batch (0-based).
        index: usize,
        /// Total images in batch, if known.
        total: Option<usize>,
    },
    /// Estimation completed for an image.
    Completed {
        /// The estimation result.
        result: EstimateResult,
    },
    /// An image was skipped due to an error.
    Skipped {
        /// Path to the image.
        path: String,
        /// Reason for skipping.
        reason: String,
    },
    /// All images have been processed.
    Finished {
        /// Total images estimated successfully.
        processed: usize,
        /// Total images skipped.
        skipped: usize,
    },
}

/// Port for receiving progress events.
pub trait ProgressSink: Send + Sync {
    /// Called when a progress event occurs.
    fn on_event(&self, event: ProgressEvent);
}
