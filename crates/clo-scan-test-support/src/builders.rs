//! Builders for detections, tables and synthetic images.

use std::collections::HashMap;

use clo_scan_core::{CloTable, Detection, ImageInfo};

/// Builds a detection with a default bounding box and class id 0.
#[must_use]
pub fn detection(label: &str, confidence: f32) -> Detection {
    Detection::new(0, label, confidence, [10.0, 10.0, 90.0, 90.0])
}

/// Builds a detection with explicit class id and bounding box.
#[must_use]
pub fn detection_with_bbox(
    class_id: usize,
    label: &str,
    confidence: f32,
    bbox: [f32; 4],
) -> Detection {
    Detection::new(class_id, label, confidence, bbox)
}

/// Builds a coefficient table from label/value pairs and a base value.
///
/// # Panics
///
/// Panics if any value is negative; test tables are expected to be valid.
#[must_use]
pub fn clo_table(pairs: &[(&str, f32)], base_clo: f32) -> CloTable {
    let map: HashMap<String, f32> = pairs
        .iter()
        .map(|(label, value)| ((*label).to_string(), *value))
        .collect();
    CloTable::new(map, base_clo).expect("test table values must be non-negative")
}

/// Builds a small uniform RGB test image.
#[must_use]
pub fn test_image(path: &str) -> ImageInfo {
    ImageInfo::new(path, image::DynamicImage::new_rgb8(64, 64))
}

/// Builds a test image with explicit dimensions.
#[must_use]
pub fn test_image_sized(path: &str, width: u32, height: u32) -> ImageInfo {
    ImageInfo::new(path, image::DynamicImage::new_rgb8(width, height))
}
