//! Filesystem adapter for loading images.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clo_scan_core::{ImageInfo, ImageSource};
use tracing::{debug, warn};

/// Supported raster image extensions.
const RASTER_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "tiff", "tif", "webp", "bmp", "gif"];

/// Filesystem image source adapter.
pub struct FsImageSource {
    paths: Vec<PathBuf>,
    recursive: bool,
}

impl FsImageSource {
    /// Creates a new filesystem image source.
    ///
    /// # Arguments
    ///
    /// * `paths` - Files or directories to scan
    /// * `recursive` - Whether to recurse into subdirectories
    #[must_use]
    pub const fn new(paths: Vec<PathBuf>, recursive: bool) -> Self {
        Self { paths, recursive }
    }

    /// Collects all image files from the configured paths.
    fn collect_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();

        for path in &self.paths {
            if path.is_file() {
                if is_supported_image(path) {
                    files.push(path.clone());
                } else {
                    warn!("Unsupported file type: {}", path.display());
                }
            } else if path.is_dir() {
                self.collect_from_dir(path, &mut files);
            } else {
                warn!("Path does not exist: {}", path.display());
            }
        }

        files
    }

    fn collect_from_dir(&self, dir: &Path, files: &mut Vec<PathBuf>) {
        let entries = match std::fs::read_dir(dir) {
            Ok(e) => e,
            Err(e) => {
                warn!("Failed to read directory {}: {e}", dir.display());
                return;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_file() && is_supported_image(&path) {
                files.push(path);
            } else if path.is_dir() && self.recursive {
                self.collect_from_dir(&path, files);
            }
        }
    }
}

impl ImageSource for FsImageSource {
    fn images(&self) -> Box<dyn Iterator<Item = Result<ImageInfo>> + Send + '_> {
        let files = self.collect_files();
        debug!("Found {} image files", files.len());

        Box::new(files.into_iter().map(|path| load_image(&path)))
    }

    fn count_hint(&self) -> Option<usize> {
        Some(self.collect_files().len())
    }
}

/// Checks if a path has a supported image extension.
fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .is_some_and(|e| RASTER_EXTENSIONS.contains(&e.as_str()))
}

/// Loads and decodes an image from the filesystem.
fn load_image(path: &Path) -> Result<ImageInfo> {
    let image =
        image::open(path).with_context(|| format!("Failed to open image: {}", path.display()))?;

    Ok(ImageInfo::new(path.to_string_lossy().into_owned(), image))
}
