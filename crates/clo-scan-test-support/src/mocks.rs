//! Mock implementations of core port traits.

use std::sync::{Arc, Mutex, PoisonError};

use clo_scan_core::{
    Detection, Detector, EstimateResult, ImageInfo, ImageSource, ProgressEvent, ProgressSink,
    ResultOutput,
};

/// Mock implementation of `ImageSource` for testing.
///
/// Yields pre-built images and tracks iteration for assertions.
pub struct MockImageSource {
    images: Vec<ImageInfo>,
    iteration_count: Arc<Mutex<usize>>,
}

impl MockImageSource {
    /// Creates a new mock source with the given images.
    #[must_use]
    pub fn new(images: Vec<ImageInfo>) -> Self {
        Self {
            images,
            iteration_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Creates an empty mock source.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(vec![])
    }

    /// Returns the number of times the source has been iterated.
    #[must_use]
    pub fn iteration_count(&self) -> usize {
        *self
            .iteration_count
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl ImageSource for MockImageSource {
    fn images(&self) -> Box<dyn Iterator<Item = anyhow::Result<ImageInfo>> + Send + '_> {
        let count = Arc::clone(&self.iteration_count);
        if let Ok(mut c) = count.lock() {
            *c += 1;
        }
        Box::new(self.images.iter().cloned().map(Ok))
    }

    fn count_hint(&self) -> Option<usize> {
        Some(self.images.len())
    }
}

/// Mock implementation of the `Detector` port.
///
/// Returns the same canned detections for every image, or fails on demand.
pub struct MockDetector {
    detections: Vec<Detection>,
    fail: bool,
    call_count: Arc<Mutex<usize>>,
}

impl MockDetector {
    /// Creates a detector that returns the given detections for every image.
    #[must_use]
    pub fn returning(detections: Vec<Detection>) -> Self {
        Self {
            detections,
            fail: false,
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Creates a detector that sees nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self::returning(vec![])
    }

    /// Creates a detector whose `detect` always fails.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            detections: vec![],
            fail: true,
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Returns how many times `detect` was called.
    #[must_use]
    pub fn call_count(&self) -> usize {
        *self
            .call_count
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Detector for MockDetector {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn detect(&self, image: &ImageInfo) -> anyhow::Result<Vec<Detection>> {
        if let Ok(mut c) = self.call_count.lock() {
            *c += 1;
        }
        if self.fail {
            anyhow::bail!("mock detector failure for {}", image.path);
        }
        Ok(self.detections.clone())
    }
}

/// Mock implementation of `ResultOutput` for testing.
///
/// Captures results for later assertions.
pub struct MockResultOutput {
    results: Arc<Mutex<Vec<EstimateResult>>>,
    flush_count: Arc<Mutex<usize>>,
}

impl MockResultOutput {
    /// Creates a new mock output.
    #[must_use]
    pub fn new() -> Self {
        Self {
            results: Arc::new(Mutex::new(Vec::new())),
            flush_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Returns all captured results.
    #[must_use]
    pub fn results(&self) -> Vec<EstimateResult> {
        self.results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the number of times `flush()` was called.
    #[must_use]
    pub fn flush_count(&self) -> usize {
        *self
            .flush_count
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MockResultOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultOutput for MockResultOutput {
    fn write(&self, result: &EstimateResult) -> anyhow::Result<()> {
        self.results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(result.clone());
        Ok(())
    }

    fn flush(&self) -> anyhow::Result<()> {
        if let Ok(mut c) = self.flush_count.lock() {
            *c += 1;
        }
        Ok(())
    }
}

/// Mock implementation of `ProgressSink` for testing.
///
/// Captures events for later assertions.
pub struct MockProgressSink {
    events: Arc<Mutex<Vec<ProgressEvent>>>,
}

impl MockProgressSink {
    /// Creates a new mock progress sink.
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Returns all captured events.
    #[must_use]
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the number of `Started` events.
    #[must_use]
    pub fn started_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, ProgressEvent::Started { .. }))
            .count()
    }

    /// Returns the number of `Skipped` events.
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, ProgressEvent::Skipped { .. }))
            .count()
    }

    /// Returns the final counts from the `Finished` event, if any.
    #[must_use]
    pub fn finished_counts(&self) -> Option<(usize, usize)> {
        self.events().iter().find_map(|e| match e {
            ProgressEvent::Finished { processed, skipped } => Some((*processed, *skipped)),
            _ => None,
        })
    }
}

impl Default for MockProgressSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for MockProgressSink {
    fn on_event(&self, event: ProgressEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clo_scan_core::ImageDimensions;

    #[test]
    fn test_mock_image_source_empty() {
        let source = MockImageSource::empty();
        assert_eq!(source.count_hint(), Some(0));
        assert_eq!(source.images().count(), 0);
        assert_eq!(source.iteration_count(), 1);
    }

    #[test]
    fn test_mock_detector_counts_calls() {
        let detector = MockDetector::empty();
        let info = ImageInfo::new("a.png", image::DynamicImage::new_rgb8(8, 8));

        detector.detect(&info).unwrap();
        detector.detect(&info).unwrap();

        assert_eq!(detector.call_count(), 2);
    }

    #[test]
    fn test_mock_detector_failing() {
        let detector = MockDetector::failing();
        let info = ImageInfo::new("a.png", image::DynamicImage::new_rgb8(8, 8));

        assert!(detector.detect(&info).is_err());
        assert_eq!(detector.call_count(), 1);
    }

    #[test]
    fn test_mock_result_output() {
        let output = MockResultOutput::new();

        let result = EstimateResult::new(
            "a.png",
            "2024-01-01T00:00:00Z",
            ImageDimensions::new(8, 8),
            clo_scan_core::CloEstimate {
                detections: vec![],
                total_clo: 0.1,
            },
        );

        output.write(&result).unwrap();
        output.flush().unwrap();

        assert_eq!(output.results().len(), 1);
        assert_eq!(output.results()[0].path, "a.png");
        assert_eq!(output.flush_count(), 1);
    }

    #[test]
    fn test_mock_progress_sink() {
        let sink = MockProgressSink::new();

        sink.on_event(ProgressEvent::Started {
            path: "a.png".into(),
            index: 0,
            total: Some(1),
        });
        sink.on_event(ProgressEvent::Finished {
            processed: 1,
            skipped: 0,
        });

        assert_eq!(sink.started_count(), 1);
        assert_eq!(sink.finished_counts(), Some((1, 0)));
    }
}
