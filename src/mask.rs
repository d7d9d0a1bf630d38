use crate::classify::Region;
use crate::error::{Result, SegmentError};

/// H×W material mask, row-major. `true` marks material.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BinaryMask {
    width: usize,
    height: usize,
    cells: Vec<bool>,
}

impl BinaryMask {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cells(&self) -> &[bool] {
        &self.cells
    }

    pub fn get(&self, row: usize, col: usize) -> Option<bool> {
        (row < self.height && col < self.width).then(|| self.cells[row * self.width + col])
    }

    pub fn region(&self, row: usize, col: usize) -> Option<Region> {
        self.get(row, col).map(|m| {
            if m {
                Region::Material
            } else {
                Region::Background
            }
        })
    }

    pub fn material_count(&self) -> usize {
        self.cells.iter().filter(|&&m| m).count()
    }

    /// Mask as nested rows.
    pub fn to_rows(&self) -> Vec<Vec<bool>> {
        if self.width == 0 {
            return vec![Vec::new(); self.height];
        }
        self.cells.chunks(self.width).map(<[bool]>::to_vec).collect()
    }

    /// One byte per pixel, 255 for material and 0 for background.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.cells.iter().map(|&m| if m { 255 } else { 0 }).collect()
    }
}

/// Fold a flat cluster assignment back into an H×W mask.
///
/// `assignment` must be in the same row-major order the features were
/// extracted in; position `(i, j)` reads `assignment[i * width + j]`.
pub fn build_mask(
    assignment: &[usize],
    height: usize,
    width: usize,
    material: usize,
) -> Result<BinaryMask> {
    if height == 0 || width == 0 {
        return Err(SegmentError::InvalidInput(format!(
            "cannot build a {width}x{height} mask"
        )));
    }
    if height.checked_mul(width) != Some(assignment.len()) {
        return Err(SegmentError::InvalidInput(format!(
            "assignment has {} entries, expected {} for {width}x{height}",
            assignment.len(),
            height.saturating_mul(width)
        )));
    }

    let cells = assignment.iter().map(|&c| c == material).collect();
    Ok(BinaryMask {
        width,
        height,
        cells,
    })
}
