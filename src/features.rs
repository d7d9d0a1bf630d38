use crate::error::{Result, SegmentError};
use crate::grid::PixelGrid;

/// Per-pixel feature rows: one `[r, g, b]` row per pixel, row-major.
///
/// Row `i` belongs to pixel `(i / width, i % width)`. Later stages rely on
/// that ordering to fold cluster ids back into a 2-D mask.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureMatrix {
    width: usize,
    height: usize,
    rows: Vec<[f32; 3]>,
}

impl FeatureMatrix {
    /// Wrap precomputed rows. Mostly useful for clustering data that did not
    /// come from an image.
    pub fn from_rows(width: usize, height: usize, rows: Vec<[f32; 3]>) -> Result<Self> {
        if width.checked_mul(height) != Some(rows.len()) {
            return Err(SegmentError::InvalidInput(format!(
                "{} rows do not fill a {width}x{height} grid",
                rows.len()
            )));
        }
        Ok(Self {
            width,
            height,
            rows,
        })
    }

    pub fn rows(&self) -> &[[f32; 3]] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Reshape back into 8-bit samples. Values are rounded and clamped, so a
    /// matrix produced by [`extract_features`] converts back exactly.
    pub fn to_pixels(&self) -> Vec<[u8; 3]> {
        self.rows
            .iter()
            .map(|r| r.map(|v| v.round().clamp(0.0, 255.0) as u8))
            .collect()
    }
}

/// Flatten a grid into an N×3 feature matrix with no scaling.
pub fn extract_features(grid: &PixelGrid) -> Result<FeatureMatrix> {
    if grid.width() == 0 || grid.height() == 0 {
        return Err(SegmentError::InvalidInput(format!(
            "cannot extract features from a {}x{} grid",
            grid.width(),
            grid.height()
        )));
    }

    let rows = grid
        .pixels()
        .iter()
        .map(|&[r, g, b]| [r as f32, g as f32, b as f32])
        .collect();

    Ok(FeatureMatrix {
        width: grid.width(),
        height: grid.height(),
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_row_major_order() {
        let grid = PixelGrid::from_rows(&[
            vec![[0, 1, 2], [3, 4, 5], [6, 7, 8]],
            vec![[9, 10, 11], [12, 13, 14], [15, 16, 17]],
        ])
        .unwrap();
        let features = extract_features(&grid).unwrap();

        assert_eq!(features.len(), 6);
        for (i, row) in features.rows().iter().enumerate() {
            let px = grid.get(i / 3, i % 3).unwrap();
            assert_eq!(*row, [px[0] as f32, px[1] as f32, px[2] as f32]);
        }
    }

    #[test]
    fn reshaping_reproduces_the_grid() {
        let pixels: Vec<[u8; 3]> = (0..=255u8).map(|v| [v, 255 - v, v / 2]).collect();
        let grid = PixelGrid::from_pixels(16, 16, pixels).unwrap();
        let features = extract_features(&grid).unwrap();

        assert_eq!(features.to_pixels(), grid.pixels());
    }

    #[test]
    fn zero_area_grid_is_invalid_input() {
        let grid = PixelGrid::from_pixels(0, 4, Vec::new()).unwrap();
        assert!(matches!(
            extract_features(&grid),
            Err(SegmentError::InvalidInput(_))
        ));
    }
}
