//! Test support utilities for clo-scan.
//!
//! Provides mocks for every port and builders for detections, tables and
//! synthetic images.
//!
//! # Example
//!
//! ```
//! use clo_scan_test_support::{builders, MockDetector, MockImageSource};
//!
//! let source = MockImageSource::new(vec![builders::test_image("a.png")]);
//! let detector = MockDetector::returning(vec![
//!     builders::detection("jacket", 0.9),
//!     builders::detection("pants", 0.8),
//! ]);
//! ```

pub mod builders;
mod mocks;

pub use mocks::{MockDetector, MockImageSource, MockProgressSink, MockResultOutput};
