//! Clo-Scan Adapters - External adapters for clo-scan.
//!
//! This crate provides adapters for:
//! - Filesystem image source
//! - Detector model downloading and caching

pub mod fs;
pub mod models;

pub use fs::FsImageSource;
pub use models::{model_path, models_dir, set_models_dir};
