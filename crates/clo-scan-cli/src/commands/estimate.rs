//! Estimate command - detect garments and total their insulation.

use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use clo_scan_adapters::{model_path, set_models_dir, FsImageSource};
use clo_scan_core::inference::{GarmentDetector, GarmentDetectorConfig};
use clo_scan_core::{
    annotate, CloTable, Detector, EstimateResult, FallbackPolicy, ImageSource, ProgressEvent,
    ProgressSink, ResultOutput,
};
use tracing::{debug, info, warn};

use super::ExitCode;
use crate::config::AppConfig;
use crate::output::{JsonOutput, ProgressBar};

/// Output format for results.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// JSON Lines (one JSON object per line)
    #[default]
    Jsonl,
    /// Single JSON array
    Json,
}

/// Hardcoded default values.
mod defaults {
    pub const CONF_THRESHOLD: f32 = 0.25;
    pub const IOU_THRESHOLD: f32 = 0.45;
    pub const MAX_DETECTIONS: usize = 1000;
    pub const TABLE_FILE: &str = "clo_values.toml";
}

/// Parse and validate a threshold value (0.0-1.0).
fn parse_threshold(s: &str) -> Result<f32, String> {
    let value: f32 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("{value} is not in 0.0..=1.0"))
    }
}

/// Shared arguments for insulation estimation.
#[derive(Args, Clone)]
pub struct EstimateArgs {
    /// Files or directories to analyze
    pub paths: Vec<PathBuf>,

    /// Recurse into subdirectories
    #[arg(short, long)]
    pub recursive: bool,

    /// Path to the CLO coefficient table
    #[arg(long, value_name = "FILE")]
    pub table: Option<PathBuf>,

    /// Detection confidence threshold (0.0-1.0)
    #[arg(long, value_parser = parse_threshold)]
    pub conf_threshold: Option<f32>,

    /// Non-maximum suppression IoU threshold (0.0-1.0)
    #[arg(long, value_parser = parse_threshold)]
    pub iou_threshold: Option<f32>,

    /// Inference device: cpu, cuda[:n] or metal[:n]
    #[arg(long, value_name = "DEVICE")]
    pub device: Option<String>,

    /// Show progress bar
    #[arg(long)]
    pub progress: bool,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Pretty-print JSON output (only affects --format json)
    #[arg(long)]
    pub pretty: bool,

    /// Custom models directory (overrides default and config)
    #[arg(long, value_name = "DIR")]
    pub models_dir: Option<PathBuf>,

    /// Merged config (populated by `with_config`, not from CLI).
    #[arg(skip)]
    config: Option<AppConfig>,
}

impl EstimateArgs {
    /// Apply configuration file values, respecting CLI precedence.
    ///
    /// Layering priority (lowest to highest):
    /// 1. Hardcoded defaults (in accessor methods)
    /// 2. Config file values (XDG, then project-local)
    /// 3. CLI arguments (already set on self)
    pub fn with_config(mut args: Self, config: &AppConfig) -> Self {
        // Recursive: config applies only if CLI --recursive not passed
        if !args.recursive {
            args.recursive = config.general.recursive.unwrap_or(false);
        }

        // Thresholds and device: CLI > config (accessors provide fallbacks)
        args.conf_threshold = args.conf_threshold.or(config.detector.conf_threshold);
        args.iou_threshold = args.iou_threshold.or(config.detector.iou_threshold);
        if args.device.is_none() {
            args.device.clone_from(&config.detector.device);
        }

        // Table path: CLI > config (accessor provides fallback)
        if args.table.is_none() {
            args.table.clone_from(&config.clo.table);
        }

        // Output format: CLI > config
        if args.format.is_none() {
            args.format = config
                .output
                .format
                .as_ref()
                .and_then(|s| match s.as_str() {
                    "json" => Some(OutputFormat::Json),
                    "jsonl" => Some(OutputFormat::Jsonl),
                    _ => None,
                });
        }

        // Boolean output options: CLI flag wins, then config
        if !args.pretty {
            args.pretty = config.output.pretty.unwrap_or(false);
        }
        if !args.progress {
            args.progress = config.output.progress.unwrap_or(false);
        }

        // Models directory: CLI > config
        if args.models_dir.is_none() {
            args.models_dir.clone_from(&config.models.dir);
        }

        // Store config for policy and detector construction
        args.config = Some(config.clone());

        args
    }

    /// Get confidence threshold with fallback to hardcoded default.
    fn conf_threshold(&self) -> f32 {
        self.conf_threshold.unwrap_or(defaults::CONF_THRESHOLD)
    }

    /// Get IoU threshold with fallback to hardcoded default.
    fn iou_threshold(&self) -> f32 {
        self.iou_threshold.unwrap_or(defaults::IOU_THRESHOLD)
    }

    /// Get the coefficient table path with fallback to `clo_values.toml`.
    fn table_path(&self) -> PathBuf {
        self.table
            .clone()
            .unwrap_or_else(|| PathBuf::from(defaults::TABLE_FILE))
    }

    /// Get output format with fallback to JSONL.
    fn format(&self) -> OutputFormat {
        self.format.unwrap_or(OutputFormat::Jsonl)
    }
}

/// Result of running the estimate command.
#[allow(dead_code)] // Fields exposed for programmatic use
pub struct EstimateSummary {
    /// Number of images estimated.
    pub processed: usize,
    /// Number of images skipped.
    pub skipped: usize,
    /// Exit code.
    pub exit_code: ExitCode,
}

/// Run the estimate command.
///
/// Expects `args` to have been processed through `with_config()` first
/// to apply configuration file settings.
pub fn run(args: &EstimateArgs) -> Result<EstimateSummary> {
    info!("Running estimate command on {} paths", args.paths.len());

    if args.paths.is_empty() {
        anyhow::bail!("No paths specified");
    }

    // Apply models directory override if specified
    if let Some(ref models_dir) = args.models_dir {
        debug!("Using custom models directory: {}", models_dir.display());
        set_models_dir(Some(models_dir.clone()));
    }

    // The coefficient table is mandatory: a missing or malformed table aborts
    // the run rather than degrading to an empty mapping.
    let table_path = args.table_path();
    let table = CloTable::load(&table_path)?;
    let policy = build_policy(args);

    // Initialize image source
    let source = FsImageSource::new(args.paths.clone(), args.recursive);
    let total = source.count_hint();

    // Determine if we should show progress
    let show_progress = !args.quiet && (args.progress || std::io::stderr().is_terminal());
    let progress_bar = ProgressBar::new(total.map(|t| t as u64), args.quiet, show_progress);

    // Initialize output adapter
    let output = JsonOutput::stdout();

    // An empty batch never touches the detector, so missing model files only
    // matter when there is something to detect.
    if total == Some(0) {
        if matches!(args.format(), OutputFormat::Json) {
            output.write_array(&[], args.pretty)?;
        }
        output.flush()?;
        progress_bar.on_event(ProgressEvent::Finished {
            processed: 0,
            skipped: 0,
        });
        return Ok(EstimateSummary {
            processed: 0,
            skipped: 0,
            exit_code: ExitCode::Success,
        });
    }

    let detector = build_detector(args)?;

    process_images(&source, &detector, &table, &policy, &output, &progress_bar, args)
}

/// Build the garment detector from merged args (CLI + config).
fn build_detector(args: &EstimateArgs) -> Result<GarmentDetector> {
    let weights = model_path("garment_detector")
        .context("unknown model configuration for garment_detector")?;
    let labels = model_path("garment_labels")
        .context("unknown model configuration for garment_labels")?;

    for path in [&weights, &labels] {
        if !path.exists() {
            anyhow::bail!(
                "Detector model file not found: {}. Run `clo-scan models fetch`.",
                path.display()
            );
        }
    }

    let config = GarmentDetectorConfig {
        conf_threshold: args.conf_threshold(),
        iou_threshold: args.iou_threshold(),
        max_detections: args
            .config
            .as_ref()
            .and_then(|c| c.detector.max_detections)
            .unwrap_or(defaults::MAX_DETECTIONS),
        device: args.device.clone(),
        ..GarmentDetectorConfig::default()
    }
    .with_weights_path(weights)
    .with_labels_path(labels);

    debug!(
        "Detector configured: conf={}, iou={}",
        config.conf_threshold, config.iou_threshold
    );

    Ok(GarmentDetector::new(config))
}

/// Build the fallback policy from config, defaulting to pants/shorts/skirt.
fn build_policy(args: &EstimateArgs) -> FallbackPolicy {
    let default_policy = FallbackPolicy::default();
    let clo = args.config.as_ref().map(|c| &c.clo);

    let lower_body = clo
        .and_then(|c| c.lower_body_labels.clone())
        .unwrap_or_else(|| default_policy.lower_body_labels().to_vec());
    let fallback = clo
        .and_then(|c| c.fallback_label.clone())
        .unwrap_or_else(|| default_policy.fallback_label().to_string());

    FallbackPolicy::new(lower_body, fallback)
}

/// Process images through the detector and aggregator.
fn process_images(
    source: &FsImageSource,
    detector: &GarmentDetector,
    table: &CloTable,
    policy: &FallbackPolicy,
    output: &JsonOutput,
    progress: &ProgressBar,
    args: &EstimateArgs,
) -> Result<EstimateSummary> {
    let total = source.count_hint();
    let mut processed = 0usize;
    let mut skipped = 0usize;
    let mut all_results: Vec<EstimateResult> = Vec::new();

    for (index, image_result) in source.images().enumerate() {
        let image = match image_result {
            Ok(img) => img,
            Err(e) => {
                // Note: error message contains the path via anyhow context
                progress.on_event(ProgressEvent::Skipped {
                    path: format!("image {index}"),
                    reason: e.to_string(),
                });
                skipped += 1;
                continue;
            }
        };

        let path = image.path.clone();

        progress.on_event(ProgressEvent::Started {
            path: path.clone(),
            index,
            total,
        });

        let detections = match detector.detect(&image) {
            Ok(d) => d,
            Err(e) => {
                warn!("Detection failed for {}: {}", path, e);
                progress.on_event(ProgressEvent::Skipped {
                    path,
                    reason: e.to_string(),
                });
                skipped += 1;
                continue;
            }
        };

        let estimate = annotate(detections, table, policy);
        let result = EstimateResult::new(path, iso_timestamp(), image.dimensions(), estimate);

        progress.on_event(ProgressEvent::Completed {
            result: result.clone(),
        });

        // Output based on format
        match args.format() {
            OutputFormat::Jsonl => {
                output.write(&result)?;
            }
            OutputFormat::Json => {
                all_results.push(result);
            }
        }

        processed += 1;
    }

    // For JSON format, output all results as array via adapter
    if matches!(args.format(), OutputFormat::Json) {
        output.write_array(&all_results, args.pretty)?;
    }

    output.flush()?;

    progress.on_event(ProgressEvent::Finished { processed, skipped });

    Ok(EstimateSummary {
        processed,
        skipped,
        exit_code: ExitCode::Success,
    })
}

/// Generate ISO 8601 UTC timestamp (RFC 3339 format).
fn iso_timestamp() -> String {
    match time::OffsetDateTime::now_utc().format(&time::format_description::well_known::Rfc3339) {
        Ok(ts) => ts,
        Err(e) => {
            debug!("Timestamp format failed: {e}");
            String::from("1970-01-01T00:00:00Z")
        }
    }
}
