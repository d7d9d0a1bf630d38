use js_sys::{Object, Reflect, Uint8Array};
use serde::Serialize;
use wasm_bindgen::prelude::*;

pub mod classify;
pub mod config;
pub mod error;
pub mod features;
pub mod grid;
pub mod kmeans;
pub mod mask;
pub mod pipeline;
pub mod render;
pub mod source;
pub mod stats;

pub use classify::{BrightnessPolicy, ClusterLabels, MaterialPolicy, Region, classify};
pub use config::SegmentConfig;
pub use error::{Result, SegmentError};
pub use features::{FeatureMatrix, extract_features};
pub use grid::PixelGrid;
pub use kmeans::{Clustering, KMeansParams, kmeans};
pub use mask::{BinaryMask, build_mask};
pub use pipeline::{Refinement, Segmentation, Segmenter};
pub use stats::{CoverageStats, coverage};

/// Summary of one segmented image, ready to hand to a viewer.
#[derive(Clone, Debug, Serialize)]
pub struct SegmentReport {
    pub width: usize,
    pub height: usize,
    pub stats: CoverageStats,
    pub material_centroid: [f32; 3],
    pub background_centroid: [f32; 3],
    /// One byte per pixel, 255 = material.
    #[serde(skip)]
    pub mask: Vec<u8>,
    /// PNG of original | material | background panels.
    #[serde(skip)]
    pub panels_png: Vec<u8>,
}

/// How [`segment_bytes`] renders its panel preview.
#[derive(Default)]
pub struct PanelOptions {
    /// Nearest-neighbour resize factor for the composite.
    pub scale: Option<f32>,
    /// Font for the title and percentage captions; no text without one.
    pub font: Option<ab_glyph::FontVec>,
}

/// Decode, segment and render an encoded image.
///
/// Steps performed:
/// 1. Decode the bytes within the configured source limits.
/// 2. Cluster pixel colors with k-means (`K = config.clusters`).
/// 3. Pick the material cluster with the configured brightness policy.
/// 4. Build the mask, coverage statistics and the three-panel preview.
pub fn segment_bytes(
    input: &[u8],
    config: &SegmentConfig,
    panel: &PanelOptions,
) -> Result<SegmentReport> {
    let grid = source::decode_image(input, &config.limits)?;
    let segmentation = Segmenter::new(config.clone())?.segment(&grid)?;
    let mut panels = render::compose_panels(&grid, &segmentation.mask, panel.scale)?;
    if let Some(font) = &panel.font {
        render::annotate_panels(&mut panels, &segmentation.stats, font);
    }

    Ok(SegmentReport {
        width: grid.width(),
        height: grid.height(),
        stats: segmentation.stats,
        material_centroid: segmentation.material_centroid(),
        background_centroid: segmentation.background_centroid(),
        mask: segmentation.mask.to_bytes(),
        panels_png: render::encode_png(&panels)?,
    })
}

/// Segment an encoded image into material and background.
///
/// `config_json` is an optional JSON [`SegmentConfig`]; omitted fields use
/// their defaults. The returned object carries `materialPct`,
/// `backgroundPct`, `width`, `height`, a per-pixel `mask` (255 = material)
/// and a PNG `panels` preview.
#[wasm_bindgen]
pub fn segment(input: Vec<u8>, config_json: Option<String>) -> std::result::Result<Object, JsValue> {
    let to_js = |e: SegmentError| JsValue::from_str(&e.to_string());

    let config = match config_json {
        Some(json) => SegmentConfig::from_json_str(&json).map_err(to_js)?,
        None => SegmentConfig::default(),
    };
    let report = segment_bytes(&input, &config, &PanelOptions::default()).map_err(to_js)?;

    let result = Object::new();
    Reflect::set(&result, &JsValue::from_str("materialPct"), &JsValue::from_f64(report.stats.material_pct))?;
    Reflect::set(&result, &JsValue::from_str("backgroundPct"), &JsValue::from_f64(report.stats.background_pct))?;
    Reflect::set(&result, &JsValue::from_str("width"), &JsValue::from_f64(report.width as f64))?;
    Reflect::set(&result, &JsValue::from_str("height"), &JsValue::from_f64(report.height as f64))?;
    Reflect::set(&result, &JsValue::from_str("mask"), &Uint8Array::from(report.mask.as_slice()))?;
    Reflect::set(&result, &JsValue::from_str("panels"), &Uint8Array::from(report.panels_png.as_slice()))?;

    Ok(result)
}
