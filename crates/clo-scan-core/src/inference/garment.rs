//! Single-shot garment detector.
//!
//! A compact stride-32 detector over a 640x640 input: a small convolutional
//! backbone ending in a 20x20 grid, with per-cell box regression, objectness
//! and class score heads. Weights ship as safetensors; class names come from
//! a labels document alongside the weights.

// Allow common ML code patterns
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use candle_core::{Device, Module, Tensor};
use candle_nn::{conv2d, Conv2d, Conv2dConfig, VarBuilder};
use serde::Deserialize;
use tracing::debug;

use crate::domain::{Detection, ImageInfo};
use crate::ports::Detector;

use super::{load_weights, select_device};

/// Input image size for the detector.
pub const INPUT_SIZE: usize = 640;

/// Output grid size (stride 32 over the input).
const GRID_SIZE: usize = 20;

/// Number of grid cells, one candidate detection per cell.
const NUM_CELLS: usize = GRID_SIZE * GRID_SIZE;

/// Backbone stage channel progression, stem output first.
const STAGE_CHANNELS: [usize; 5] = [16, 32, 64, 128, 256];

/// Configuration for the garment detector.
#[derive(Debug, Clone)]
pub struct GarmentDetectorConfig {
    /// Minimum confidence (objectness x class probability) to keep a
    /// candidate.
    pub conf_threshold: f32,
    /// IoU threshold for same-class non-maximum suppression.
    pub iou_threshold: f32,
    /// Upper bound on detections per image.
    pub max_detections: usize,
    /// Device spec (`cpu`, `cuda[:n]`, `metal[:n]`); auto-detect when unset.
    pub device: Option<String>,
    /// Path to the safetensors weights.
    pub weights_path: Option<PathBuf>,
    /// Path to the class labels document.
    pub labels_path: Option<PathBuf>,
}

impl Default for GarmentDetectorConfig {
    fn default() -> Self {
        Self {
            conf_threshold: 0.25,
            iou_threshold: 0.45,
            max_detections: 1000,
            device: None,
            weights_path: None,
            labels_path: None,
        }
    }
}

impl GarmentDetectorConfig {
    /// Sets the path to the detector weights.
    #[must_use]
    pub fn with_weights_path(mut self, path: impl AsRef<Path>) -> Self {
        self.weights_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the path to the class labels document.
    #[must_use]
    pub fn with_labels_path(mut self, path: impl AsRef<Path>) -> Self {
        self.labels_path = Some(path.as_ref().to_path_buf());
        self
    }
}

/// Shape of the labels document: `names = ["jacket", ...]`.
#[derive(Debug, Deserialize)]
struct LabelsFile {
    names: Vec<String>,
}

/// Loads the ordered class name list for the detector.
fn load_labels(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read labels file: {}", path.display()))?;
    let labels: LabelsFile = toml::from_str(&text)
        .with_context(|| format!("Failed to parse labels file: {}", path.display()))?;
    if labels.names.is_empty() {
        anyhow::bail!("labels file {} lists no class names", path.display());
    }
    Ok(labels.names)
}

/// A decoded candidate in normalized `[0,1]` image coordinates.
#[derive(Debug, Clone)]
struct GridDetection {
    class_id: usize,
    confidence: f32,
    bbox: [f32; 4],
}

/// One backbone stage: stride-2 reduction followed by a refining conv.
struct StageBlock {
    reduce: Conv2d,
    refine: Conv2d,
}

impl StageBlock {
    fn new(in_channels: usize, out_channels: usize, vb: &VarBuilder) -> Result<Self> {
        let reduce = conv2d(
            in_channels,
            out_channels,
            3,
            Conv2dConfig {
                stride: 2,
                padding: 1,
                ..Conv2dConfig::default()
            },
            vb.pp("reduce"),
        )?;
        let refine = conv2d(
            out_channels,
            out_channels,
            3,
            Conv2dConfig {
                padding: 1,
                ..Conv2dConfig::default()
            },
            vb.pp("refine"),
        )?;
        Ok(Self { reduce, refine })
    }
}

impl Module for StageBlock {
    fn forward(&self, x: &Tensor) -> candle_core::Result<Tensor> {
        let h = self.reduce.forward(x)?.relu()?;
        self.refine.forward(&h)?.relu()
    }
}

/// The detector network.
struct GarmentNet {
    stem: Conv2d,
    stages: Vec<StageBlock>,
    box_head: Conv2d,
    obj_head: Conv2d,
    cls_head: Conv2d,
    num_classes: usize,
    device: Device,
}

impl GarmentNet {
    /// Builds the network from weights.
    fn new(vb: &VarBuilder, num_classes: usize) -> Result<Self> {
        if num_classes == 0 {
            anyhow::bail!("detector needs at least one class");
        }

        let device = vb.device().clone();

        // Stem: 3 -> 16 channels, stride 2 (640 -> 320).
        let stem = conv2d(
            3,
            STAGE_CHANNELS[0],
            3,
            Conv2dConfig {
                stride: 2,
                padding: 1,
                ..Conv2dConfig::default()
            },
            vb.pp("stem"),
        )?;

        // Four stride-2 stages: 320 -> 160 -> 80 -> 40 -> 20.
        let mut stages = Vec::with_capacity(STAGE_CHANNELS.len() - 1);
        for (i, pair) in STAGE_CHANNELS.windows(2).enumerate() {
            stages.push(StageBlock::new(pair[0], pair[1], &vb.pp(format!("stage{i}")))?);
        }

        let head_channels = STAGE_CHANNELS[STAGE_CHANNELS.len() - 1];
        let head_cfg = Conv2dConfig::default();
        let box_head = conv2d(head_channels, 4, 1, head_cfg, vb.pp("head.box"))?;
        let obj_head = conv2d(head_channels, 1, 1, head_cfg, vb.pp("head.obj"))?;
        let cls_head = conv2d(head_channels, num_classes, 1, head_cfg, vb.pp("head.cls"))?;

        Ok(Self {
            stem,
            stages,
            box_head,
            obj_head,
            cls_head,
            num_classes,
            device,
        })
    }

    /// Resizes and normalizes an image into a `(1, 3, 640, 640)` tensor.
    fn preprocess(&self, image: &image::DynamicImage) -> Result<Tensor> {
        let resized = image.resize_exact(
            INPUT_SIZE as u32,
            INPUT_SIZE as u32,
            image::imageops::FilterType::Triangle,
        );
        let rgb = resized.to_rgb8();

        let data: Vec<f32> = rgb
            .pixels()
            .flat_map(|p| {
                [
                    f32::from(p[0]) / 255.0,
                    f32::from(p[1]) / 255.0,
                    f32::from(p[2]) / 255.0,
                ]
            })
            .collect();

        let tensor = Tensor::from_vec(data, (1, INPUT_SIZE, INPUT_SIZE, 3), &self.device)?;
        tensor
            .permute((0, 3, 1, 2))
            .context("Failed to preprocess image")
    }

    /// Runs the backbone and heads, returning per-cell raw outputs.
    fn forward(&self, x: &Tensor) -> Result<(Vec<Vec<f32>>, Vec<Vec<f32>>, Vec<Vec<f32>>)> {
        let mut h = self.stem.forward(x)?.relu()?;
        for stage in &self.stages {
            h = stage.forward(&h)?;
        }

        let boxes = self
            .box_head
            .forward(&h)?
            .permute((0, 2, 3, 1))?
            .reshape((NUM_CELLS, 4))?
            .to_vec2::<f32>()?;
        let objectness = self
            .obj_head
            .forward(&h)?
            .permute((0, 2, 3, 1))?
            .reshape((NUM_CELLS, 1))?
            .to_vec2::<f32>()?;
        let classes = self
            .cls_head
            .forward(&h)?
            .permute((0, 2, 3, 1))?
            .reshape((NUM_CELLS, self.num_classes))?
            .to_vec2::<f32>()?;

        Ok((boxes, objectness, classes))
    }

    /// Detects garments, returning candidates in normalized coordinates.
    fn detect(&self, image: &image::DynamicImage, config: &GarmentDetectorConfig) -> Result<Vec<GridDetection>> {
        let input = self.preprocess(image)?;
        let (boxes, objectness, classes) = self.forward(&input)?;

        let candidates = decode_cells(&boxes, &objectness, &classes, config.conf_threshold);
        Ok(nms(candidates, config.iou_threshold, config.max_detections))
    }
}

/// Decodes raw per-cell outputs into thresholded candidates.
fn decode_cells(
    boxes: &[Vec<f32>],
    objectness: &[Vec<f32>],
    classes: &[Vec<f32>],
    conf_threshold: f32,
) -> Vec<GridDetection> {
    let grid = GRID_SIZE as f32;
    let mut candidates = Vec::new();

    for cell in 0..NUM_CELLS {
        let obj = sigmoid(objectness[cell][0]);
        if obj < conf_threshold {
            continue;
        }

        let probs = softmax(&classes[cell]);
        let (class_id, class_prob) = argmax(&probs);
        let confidence = obj * class_prob;
        if confidence < conf_threshold {
            continue;
        }

        let row = (cell / GRID_SIZE) as f32;
        let col = (cell % GRID_SIZE) as f32;
        let raw = &boxes[cell];

        // Anchor-free decode: center offset within the cell, size relative
        // to the whole image.
        let cx = (col + sigmoid(raw[0])) / grid;
        let cy = (row + sigmoid(raw[1])) / grid;
        let w = sigmoid(raw[2]);
        let h = sigmoid(raw[3]);

        candidates.push(GridDetection {
            class_id,
            confidence,
            bbox: [
                (cx - w / 2.0).clamp(0.0, 1.0),
                (cy - h / 2.0).clamp(0.0, 1.0),
                (cx + w / 2.0).clamp(0.0, 1.0),
                (cy + h / 2.0).clamp(0.0, 1.0),
            ],
        });
    }

    candidates
}

/// Same-class greedy non-maximum suppression, highest confidence first.
fn nms(
    mut candidates: Vec<GridDetection>,
    iou_threshold: f32,
    max_detections: usize,
) -> Vec<GridDetection> {
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<GridDetection> = Vec::new();
    for candidate in candidates {
        if keep.len() >= max_detections {
            break;
        }
        let suppressed = keep.iter().any(|kept| {
            kept.class_id == candidate.class_id
                && iou(&kept.bbox, &candidate.bbox) >= iou_threshold
        });
        if !suppressed {
            keep.push(candidate);
        }
    }

    keep
}

/// Intersection over Union for two `[x_min, y_min, x_max, y_max]` boxes.
fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let overlap_w = (a[2].min(b[2]) - a[0].max(b[0])).max(0.0);
    let overlap_h = (a[3].min(b[3]) - a[1].max(b[1])).max(0.0);
    let intersection = overlap_w * overlap_h;

    let area_a = (a[2] - a[0]) * (a[3] - a[1]);
    let area_b = (b[2] - b[0]) * (b[3] - b[1]);
    let union = area_a + area_b - intersection;

    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}

/// Sigmoid activation.
#[inline]
fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Numerically stable softmax over class logits.
fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Index and value of the largest element.
fn argmax(values: &[f32]) -> (usize, f32) {
    values
        .iter()
        .copied()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |best, (i, v)| {
            if v > best.1 {
                (i, v)
            } else {
                best
            }
        })
}

/// Scales a normalized bbox to pixel coordinates of the source image.
fn to_pixel_bbox(bbox: [f32; 4], width: u32, height: u32) -> [f32; 4] {
    let w = width as f32;
    let h = height as f32;
    [bbox[0] * w, bbox[1] * h, bbox[2] * w, bbox[3] * h]
}

/// Loaded network plus its class name list.
struct LoadedModel {
    net: GarmentNet,
    class_names: Vec<String>,
}

/// Garment detector behind lazy weight loading.
///
/// Construction is cheap; weights and labels load on first use and the
/// outcome is cached for the detector's lifetime.
pub struct GarmentDetector {
    config: GarmentDetectorConfig,
    loaded: OnceLock<Result<LoadedModel, String>>,
}

impl GarmentDetector {
    /// Creates a detector with the given configuration.
    #[must_use]
    pub const fn new(config: GarmentDetectorConfig) -> Self {
        Self {
            config,
            loaded: OnceLock::new(),
        }
    }

    /// Returns the detector configuration.
    #[must_use]
    pub const fn config(&self) -> &GarmentDetectorConfig {
        &self.config
    }

    /// Loads or returns the cached model.
    fn get_loaded(&self) -> Result<&LoadedModel> {
        let result = self
            .loaded
            .get_or_init(|| self.load_model().map_err(|e| format!("{e:#}")));

        result.as_ref().map_err(|e| anyhow::anyhow!("{e}"))
    }

    fn load_model(&self) -> Result<LoadedModel> {
        let weights_path = self
            .config
            .weights_path
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("detector weights path not configured"))?;
        let labels_path = self
            .config
            .labels_path
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("detector labels path not configured"))?;

        let class_names = load_labels(labels_path)?;
        debug!("Loaded {} class names", class_names.len());

        let device = select_device(self.config.device.as_deref())?;
        let vb = load_weights(weights_path, &device)
            .context("Failed to load garment detector weights")?;
        let net = GarmentNet::new(&vb, class_names.len())
            .context("Failed to create garment detector")?;

        Ok(LoadedModel { net, class_names })
    }
}

impl Default for GarmentDetector {
    fn default() -> Self {
        Self::new(GarmentDetectorConfig::default())
    }
}

impl Detector for GarmentDetector {
    fn name(&self) -> &'static str {
        "garment"
    }

    fn detect(&self, image: &ImageInfo) -> Result<Vec<Detection>> {
        let loaded = self.get_loaded()?;

        let raw = loaded
            .net
            .detect(&image.image, &self.config)
            .context("Garment detection failed")?;

        debug!("Found {} garments in {}", raw.len(), image.path);

        let detections = raw
            .into_iter()
            .map(|d| {
                let label = loaded
                    .class_names
                    .get(d.class_id)
                    .cloned()
                    .unwrap_or_else(|| format!("class_{}", d.class_id));
                Detection::new(
                    d.class_id,
                    label,
                    d.confidence,
                    to_pixel_bbox(d.bbox, image.width, image.height),
                )
            })
            .collect();

        Ok(detections)
    }
}
