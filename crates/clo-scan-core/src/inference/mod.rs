//! ML inference engine using Candle.
//!
//! Provides device selection, safetensors weight loading, and the single-shot
//! garment detector that backs the [`crate::ports::Detector`] port.

mod device;
mod garment;
mod loader;

pub use device::select_device;
pub use garment::{GarmentDetector, GarmentDetectorConfig, INPUT_SIZE};
pub use loader::load_weights;
