use serde::{Deserialize, Serialize};

use crate::error::{Result, SegmentError};
use crate::mask::BinaryMask;

/// Material vs. background coverage of a mask.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CoverageStats {
    pub material_count: usize,
    pub background_count: usize,
    pub material_pct: f64,
    pub background_pct: f64,
}

impl CoverageStats {
    pub fn total(&self) -> usize {
        self.material_count + self.background_count
    }
}

pub fn coverage(mask: &BinaryMask) -> Result<CoverageStats> {
    let total = mask.width() * mask.height();
    if total == 0 {
        return Err(SegmentError::InvalidInput(
            "coverage of a zero-area mask is undefined".into(),
        ));
    }

    let material_count = mask.material_count();
    let material_pct = 100.0 * material_count as f64 / total as f64;
    Ok(CoverageStats {
        material_count,
        background_count: total - material_count,
        material_pct,
        background_pct: 100.0 - material_pct,
    })
}
