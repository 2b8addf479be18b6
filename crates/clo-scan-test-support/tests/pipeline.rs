//! Port-level pipeline tests: image source -> detector -> aggregator -> output.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]

use clo_scan_core::{
    annotate, CloTable, Detector, EstimateResult, FallbackPolicy, ImageSource, ProgressEvent,
    ProgressSink, ResultOutput,
};
use clo_scan_test_support::{builders, MockDetector, MockImageSource, MockProgressSink, MockResultOutput};

/// Runs the estimation loop over all images from a source.
fn run_pipeline(
    source: &MockImageSource,
    detector: &MockDetector,
    table: &CloTable,
    output: &MockResultOutput,
    progress: &MockProgressSink,
) {
    let policy = FallbackPolicy::default();
    let total = source.count_hint();
    let mut processed = 0;
    let mut skipped = 0;

    for (index, item) in source.images().enumerate() {
        let image = item.expect("mock images always decode");
        progress.on_event(ProgressEvent::Started {
            path: image.path.clone(),
            index,
            total,
        });

        let detections = match detector.detect(&image) {
            Ok(d) => d,
            Err(e) => {
                progress.on_event(ProgressEvent::Skipped {
                    path: image.path.clone(),
                    reason: e.to_string(),
                });
                skipped += 1;
                continue;
            }
        };

        let estimate = annotate(detections, table, &policy);
        let result = EstimateResult::new(
            image.path.clone(),
            "2024-01-01T00:00:00Z",
            image.dimensions(),
            estimate,
        );

        progress.on_event(ProgressEvent::Completed {
            result: result.clone(),
        });
        output.write(&result).unwrap();
        processed += 1;
    }

    output.flush().unwrap();
    progress.on_event(ProgressEvent::Finished { processed, skipped });
}

#[test]
fn test_one_result_per_image_in_order() {
    let source = MockImageSource::new(vec![
        builders::test_image("a.png"),
        builders::test_image("b.png"),
        builders::test_image("c.png"),
    ]);
    let detector = MockDetector::returning(vec![builders::detection("jacket", 0.9)]);
    let table = builders::clo_table(&[("jacket", 0.3), ("pants", 0.2)], 0.1);
    let output = MockResultOutput::new();
    let progress = MockProgressSink::new();

    run_pipeline(&source, &detector, &table, &output, &progress);

    let results = output.results();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].path, "a.png");
    assert_eq!(results[1].path, "b.png");
    assert_eq!(results[2].path, "c.png");
    assert_eq!(detector.call_count(), 3);
    assert_eq!(progress.finished_counts(), Some((3, 0)));
}

#[test]
fn test_estimate_totals_flow_through() {
    let source = MockImageSource::new(vec![builders::test_image("a.png")]);
    let detector = MockDetector::returning(vec![
        builders::detection("jacket", 0.9),
        builders::detection("shorts", 0.7),
    ]);
    // Shorts suppresses the pants fallback but carries no coefficient.
    let table = builders::clo_table(&[("jacket", 0.3), ("pants", 0.2)], 0.1);
    let output = MockResultOutput::new();
    let progress = MockProgressSink::new();

    run_pipeline(&source, &detector, &table, &output, &progress);

    let results = output.results();
    assert_eq!(results[0].detections.len(), 2);
    assert!((results[0].total_clo - 0.4).abs() < 1e-6);
}

#[test]
fn test_empty_detector_output_still_produces_result() {
    let source = MockImageSource::new(vec![builders::test_image("bare.png")]);
    let detector = MockDetector::empty();
    let table = builders::clo_table(&[("pants", 0.2)], 0.1);
    let output = MockResultOutput::new();
    let progress = MockProgressSink::new();

    run_pipeline(&source, &detector, &table, &output, &progress);

    let results = output.results();
    assert_eq!(results.len(), 1);
    assert!(results[0].detections.is_empty());
    // Vacuous fallback plus base.
    assert!((results[0].total_clo - 0.3).abs() < 1e-6);
}

#[test]
fn test_detector_failure_skips_image() {
    let source = MockImageSource::new(vec![builders::test_image("a.png")]);
    let detector = MockDetector::failing();
    let table = builders::clo_table(&[], 0.0);
    let output = MockResultOutput::new();
    let progress = MockProgressSink::new();

    run_pipeline(&source, &detector, &table, &output, &progress);

    assert!(output.results().is_empty());
    assert_eq!(progress.skipped_count(), 1);
    assert_eq!(progress.finished_counts(), Some((0, 1)));
}
