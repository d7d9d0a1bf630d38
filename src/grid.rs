use image::{DynamicImage, RgbImage};

use crate::error::{Result, SegmentError};

/// An immutable H×W grid of RGB samples in row-major order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelGrid {
    width: usize,
    height: usize,
    pixels: Vec<[u8; 3]>,
}

impl PixelGrid {
    /// Build a grid from row-major RGB samples.
    ///
    /// Fails with [`SegmentError::InvalidInput`] when `pixels.len()` does not
    /// match `width * height`. A zero-area grid is accepted here and rejected
    /// by the feature extractor, so callers get the error from the stage that
    /// cannot work with it.
    pub fn from_pixels(width: usize, height: usize, pixels: Vec<[u8; 3]>) -> Result<Self> {
        let expected = width
            .checked_mul(height)
            .ok_or_else(|| SegmentError::InvalidInput(format!("{width}x{height} overflows")))?;
        if pixels.len() != expected {
            return Err(SegmentError::InvalidInput(format!(
                "expected {expected} pixels for a {width}x{height} grid, got {}",
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Build a grid from nested rows, e.g. `[[px, px], [px, px]]`.
    pub fn from_rows(rows: &[Vec<[u8; 3]>]) -> Result<Self> {
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        if let Some(bad) = rows.iter().position(|r| r.len() != width) {
            return Err(SegmentError::InvalidInput(format!(
                "row {bad} has {} columns, expected {width}",
                rows[bad].len()
            )));
        }
        Self::from_pixels(width, height, rows.concat())
    }

    pub fn from_rgb_image(img: &RgbImage) -> Self {
        let (w, h) = img.dimensions();
        let pixels = img.pixels().map(|p| p.0).collect();
        Self {
            width: w as usize,
            height: h as usize,
            pixels,
        }
    }

    /// Drops alpha; transparent pixels are clustered by their color like any other.
    pub fn from_dynamic(img: &DynamicImage) -> Self {
        Self::from_rgb_image(&img.to_rgb8())
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn pixels(&self) -> &[[u8; 3]] {
        &self.pixels
    }

    pub fn get(&self, row: usize, col: usize) -> Option<[u8; 3]> {
        if row < self.height && col < self.width {
            Some(self.pixels[row * self.width + col])
        } else {
            None
        }
    }

    pub fn to_rgb_image(&self) -> Option<RgbImage> {
        let raw: Vec<u8> = self.pixels.iter().flatten().copied().collect();
        RgbImage::from_raw(self.width as u32, self.height as u32, raw)
    }
}
