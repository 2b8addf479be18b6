//! Port definitions for hexagonal architecture.
//!
//! These traits define the boundaries between the domain core and external
//! adapters: the detector model, image sources, result sinks and progress UI.

mod detector;
mod image_source;
mod progress;
mod result_output;

pub use detector::Detector;
pub use image_source::ImageSource;
pub use progress::{ProgressEvent, ProgressSink};
pub use result_output::ResultOutput;
