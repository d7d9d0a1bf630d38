use image::ImageFormat;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SegmentError};
use crate::grid::PixelGrid;

/// 10 MB.
pub const DEFAULT_MAX_BYTES: usize = 10_000_000;

/// Upload constraints checked before an image is decoded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceLimits {
    pub max_bytes: usize,
    /// Lower-case format extensions, e.g. `"png"`, `"jpeg"`.
    pub formats: Vec<String>,
}

impl Default for SourceLimits {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_BYTES,
            formats: vec!["png".into(), "jpeg".into()],
        }
    }
}

impl SourceLimits {
    fn allows(&self, format: ImageFormat) -> bool {
        format
            .extensions_str()
            .iter()
            .any(|ext| self.formats.iter().any(|f| f.eq_ignore_ascii_case(ext)))
    }
}

/// Decode an encoded image into a [`PixelGrid`].
pub fn decode_image(input: &[u8], limits: &SourceLimits) -> Result<PixelGrid> {
    if input.is_empty() {
        return Err(SegmentError::ImageLoad("input is empty".into()));
    }
    if input.len() > limits.max_bytes {
        return Err(SegmentError::ImageLoad(format!(
            "input is {} bytes, limit is {}",
            input.len(),
            limits.max_bytes
        )));
    }

    let format = image::guess_format(input)
        .map_err(|e| SegmentError::ImageLoad(format!("unrecognised format: {e}")))?;
    if !limits.allows(format) {
        return Err(SegmentError::ImageLoad(format!(
            "format {format:?} is not allowed"
        )));
    }

    let img = image::load_from_memory_with_format(input, format)
        .map_err(|e| SegmentError::ImageLoad(format!("unable to decode image: {e}")))?;
    let grid = PixelGrid::from_dynamic(&img);
    if grid.is_empty() {
        return Err(SegmentError::ImageLoad(format!(
            "image has no pixels ({}x{})",
            grid.width(),
            grid.height()
        )));
    }
    Ok(grid)
}

#[cfg(not(target_arch = "wasm32"))]
pub fn open_image(path: impl AsRef<std::path::Path>, limits: &SourceLimits) -> Result<PixelGrid> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)
        .map_err(|e| SegmentError::ImageLoad(format!("{}: {e}", path.display())))?;
    decode_image(&bytes, limits)
}
