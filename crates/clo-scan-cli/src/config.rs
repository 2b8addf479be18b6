//! Configuration file support for clo-scan.
//!
//! Supports TOML configuration from:
//! - XDG config: `~/.config/clo-scan/config.toml` (lowest priority)
//! - Project-local: `.clo-scan.toml` (searched up directory tree)
//! - CLI flags (highest priority, applied separately)

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};

/// Top-level configuration structure.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// General options.
    pub general: GeneralConfig,
    /// Detector settings.
    pub detector: DetectorConfig,
    /// CLO table and fallback policy settings.
    pub clo: CloConfig,
    /// Model settings.
    pub models: ModelsConfig,
    /// Output formatting settings.
    pub output: OutputConfig,
}

/// General configuration options.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Recurse into subdirectories by default.
    pub recursive: Option<bool>,
}

/// Detector configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Confidence threshold (0.0-1.0).
    pub conf_threshold: Option<f32>,
    /// Non-maximum suppression IoU threshold (0.0-1.0).
    pub iou_threshold: Option<f32>,
    /// Maximum detections per image.
    pub max_detections: Option<usize>,
    /// Device spec: "cpu", "cuda[:n]" or "metal[:n]".
    pub device: Option<String>,
}

/// CLO table and fallback policy configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct CloConfig {
    /// Path to the coefficient table document.
    pub table: Option<PathBuf>,
    /// Labels counting as lower-body coverage.
    pub lower_body_labels: Option<Vec<String>>,
    /// Label whose coefficient is assumed when no lower-body item is seen.
    pub fallback_label: Option<String>,
}

/// Model configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// Custom models directory path.
    pub dir: Option<PathBuf>,
}

/// Output formatting configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output format: "json" or "jsonl".
    pub format: Option<String>,
    /// Pretty-print JSON output.
    pub pretty: Option<bool>,
    /// Show progress bar.
    pub progress: Option<bool>,
}

impl AppConfig {
    /// Load configuration from XDG and project-local files.
    ///
    /// Priority (lowest to highest):
    /// 1. XDG config: `~/.config/clo-scan/config.toml`
    /// 2. Project-local: `.clo-scan.toml` (searched up from cwd)
    ///
    /// Missing files are silently ignored. Invalid values are logged as warnings.
    pub fn load() -> Self {
        let mut config = Self::default();

        // Load XDG config (lowest priority)
        if let Some(xdg_path) = xdg_config_path() {
            if xdg_path.exists() {
                info!("Loading XDG config: {}", xdg_path.display());
                if let Some(xdg_config) = load_file(&xdg_path) {
                    config = xdg_config;
                }
            } else {
                debug!("XDG config not found: {}", xdg_path.display());
            }
        }

        // Load project-local config (higher priority, merged)
        if let Some(project_path) = find_project_config() {
            info!("Loading project config: {}", project_path.display());
            if let Some(project_config) = load_file(&project_path) {
                config.merge(project_config);
            }
        }

        // Validate merged config
        if let Err(e) = config.validate() {
            eprintln!("warning: {e}");
        }

        config
    }

    /// Validate configuration values are within acceptable ranges.
    fn validate(&self) -> Result<(), String> {
        if let Some(t) = self.detector.conf_threshold {
            if !(0.0..=1.0).contains(&t) {
                return Err(format!("detector.conf_threshold must be 0.0-1.0, got {t}"));
            }
        }
        if let Some(t) = self.detector.iou_threshold {
            if !(0.0..=1.0).contains(&t) {
                return Err(format!("detector.iou_threshold must be 0.0-1.0, got {t}"));
            }
        }
        if self.detector.max_detections == Some(0) {
            return Err("detector.max_detections must be at least 1".to_string());
        }

        if let Some(ref labels) = self.clo.lower_body_labels {
            if labels.iter().any(|l| l.trim().is_empty()) {
                return Err("clo.lower_body_labels must not contain empty labels".to_string());
            }
        }
        if let Some(ref label) = self.clo.fallback_label {
            if label.trim().is_empty() {
                return Err("clo.fallback_label must not be empty".to_string());
            }
        }

        if let Some(ref f) = self.output.format {
            if f != "json" && f != "jsonl" {
                return Err(format!("output.format must be 'json' or 'jsonl', got '{f}'"));
            }
        }

        Ok(())
    }

    /// Merge another config into this one.
    /// Values from `other` override values in `self` when present.
    fn merge(&mut self, other: Self) {
        // General
        self.general.recursive = other.general.recursive.or(self.general.recursive);

        // Detector
        self.detector.conf_threshold = other
            .detector
            .conf_threshold
            .or(self.detector.conf_threshold);
        self.detector.iou_threshold = other.detector.iou_threshold.or(self.detector.iou_threshold);
        self.detector.max_detections = other
            .detector
            .max_detections
            .or(self.detector.max_detections);
        self.detector.device = other.detector.device.or_else(|| self.detector.device.take());

        // Clo
        self.clo.table = other.clo.table.or_else(|| self.clo.table.take());
        self.clo.lower_body_labels = other
            .clo
            .lower_body_labels
            .or_else(|| self.clo.lower_body_labels.take());
        self.clo.fallback_label = other
            .clo
            .fallback_label
            .or_else(|| self.clo.fallback_label.take());

        // Models
        self.models.dir = other.models.dir.or_else(|| self.models.dir.take());

        // Output
        self.output.format = other.output.format.or_else(|| self.output.format.take());
        self.output.pretty = other.output.pretty.or(self.output.pretty);
        self.output.progress = other.output.progress.or(self.output.progress);
    }
}

/// Get the XDG config file path.
fn xdg_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("clo-scan").join("config.toml"))
}

/// Find project-local config by searching up from current directory.
fn find_project_config() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    find_config_in_parents(&cwd)
}

/// Search for `.clo-scan.toml` in the given directory and its parents.
fn find_config_in_parents(start: &Path) -> Option<PathBuf> {
    let mut current = Some(start);

    while let Some(dir) = current {
        let config_path = dir.join(".clo-scan.toml");
        if config_path.exists() {
            return Some(config_path);
        }
        current = dir.parent();
    }

    None
}

/// Load and parse a TOML config file.
fn load_file(path: &Path) -> Option<AppConfig> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!("Failed to read config file {}: {}", path.display(), e);
            return None;
        }
    };

    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!("Failed to parse config file {}: {}", path.display(), e);
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.detector.conf_threshold.is_none());
        assert!(config.clo.table.is_none());
        assert!(config.output.format.is_none());
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: AppConfig = toml::from_str("").expect("parse empty config");
        assert!(config.general.recursive.is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[general]
recursive = true

[detector]
conf_threshold = 0.3
iou_threshold = 0.5
max_detections = 100
device = "cpu"

[clo]
table = "clo_values.toml"
lower_body_labels = ["pants", "shorts", "skirt", "kilt"]
fallback_label = "pants"

[models]
dir = "/opt/clo-scan/models"

[output]
format = "json"
pretty = true
progress = false
"#;
        let config: AppConfig = toml::from_str(toml).expect("parse full config");

        assert_eq!(config.general.recursive, Some(true));
        assert_eq!(config.detector.conf_threshold, Some(0.3));
        assert_eq!(config.detector.max_detections, Some(100));
        assert_eq!(config.detector.device.as_deref(), Some("cpu"));
        assert_eq!(config.clo.table, Some(PathBuf::from("clo_values.toml")));
        assert_eq!(
            config.clo.lower_body_labels.as_deref(),
            Some(["pants", "shorts", "skirt", "kilt"].map(String::from).as_slice())
        );
        assert_eq!(config.output.format.as_deref(), Some("json"));
        assert_eq!(config.output.pretty, Some(true));
    }

    #[test]
    fn test_partial_sections() {
        let toml = r#"
[detector]
conf_threshold = 0.4

[output]
format = "jsonl"
"#;
        let config: AppConfig = toml::from_str(toml).expect("parse mixed");

        assert_eq!(config.detector.conf_threshold, Some(0.4));
        assert!(config.detector.iou_threshold.is_none());
        assert_eq!(config.output.format.as_deref(), Some("jsonl"));
        assert!(config.clo.table.is_none());
    }

    #[test]
    fn test_merge_override_wins() {
        let mut base: AppConfig = toml::from_str(
            r#"
[detector]
conf_threshold = 0.25
iou_threshold = 0.45

[clo]
table = "base.toml"
"#,
        )
        .expect("parse base");

        let override_config: AppConfig = toml::from_str(
            r#"
[detector]
conf_threshold = 0.5

[clo]
table = "project.toml"
"#,
        )
        .expect("parse override");

        base.merge(override_config);

        assert_eq!(base.detector.conf_threshold, Some(0.5));
        // Untouched by the override
        assert_eq!(base.detector.iou_threshold, Some(0.45));
        assert_eq!(base.clo.table, Some(PathBuf::from("project.toml")));
    }

    #[test]
    fn test_merge_empty_override_preserves_base() {
        let mut base: AppConfig = toml::from_str(
            r"
[detector]
conf_threshold = 0.3
",
        )
        .expect("parse base");

        base.merge(AppConfig::default());

        assert_eq!(base.detector.conf_threshold, Some(0.3));
    }

    #[test]
    fn test_invalid_toml_syntax_rejected() {
        let result: Result<AppConfig, _> = toml::from_str("[detector\nconf_threshold = 0.5\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_field_type_rejected() {
        let result: Result<AppConfig, _> = toml::from_str(
            r#"
[detector]
conf_threshold = "high"
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_conf_threshold_range() {
        let mut config = AppConfig::default();
        config.detector.conf_threshold = Some(1.5);

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("detector.conf_threshold"));
    }

    #[test]
    fn test_validate_zero_max_detections() {
        let mut config = AppConfig::default();
        config.detector.max_detections = Some(0);

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("max_detections"));
    }

    #[test]
    fn test_validate_empty_fallback_label() {
        let mut config = AppConfig::default();
        config.clo.fallback_label = Some("  ".to_string());

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_output_format() {
        let mut config = AppConfig::default();
        config.output.format = Some("xml".to_string());

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("output.format"));
    }

    #[test]
    fn test_validate_valid_config_passes() {
        let config: AppConfig = toml::from_str(
            r#"
[detector]
conf_threshold = 0.25
iou_threshold = 0.45

[output]
format = "jsonl"
"#,
        )
        .expect("parse valid config");

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_find_config_in_parents() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join(".clo-scan.toml"), "").unwrap();

        let found = find_config_in_parents(&nested);
        assert_eq!(found, Some(dir.path().join(".clo-scan.toml")));
    }
}
