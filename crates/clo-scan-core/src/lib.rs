//! Clo-Scan Core - Domain logic for garment-based thermal insulation estimation.
//!
//! This crate contains the core domain types, the CLO coefficient table, the
//! detection-to-insulation aggregator, and the garment detector inference code.

pub mod clo;
pub mod domain;
pub mod inference;
pub mod ports;

pub use clo::{annotate, CloTable, FallbackPolicy, TableError};
pub use domain::{
    AnnotatedDetection, CloEstimate, Detection, EstimateResult, ImageDimensions, ImageInfo,
};
pub use ports::{Detector, ImageSource, ProgressEvent, ProgressSink, ResultOutput};
