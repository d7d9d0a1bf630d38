// ------------------------------------------------------------
// Panel rendering: original | material only | background only
// ------------------------------------------------------------

use ab_glyph::{FontVec, PxScale};
use image::{ImageFormat, Rgb, RgbImage, imageops, imageops::FilterType};
use imageproc::drawing::{draw_text_mut, text_size};

use crate::error::{Result, SegmentError};
use crate::grid::PixelGrid;
use crate::mask::BinaryMask;
use crate::stats::CoverageStats;

fn check_dimensions(grid: &PixelGrid, mask: &BinaryMask) -> Result<()> {
    if grid.width() != mask.width() || grid.height() != mask.height() {
        return Err(SegmentError::InvalidInput(format!(
            "mask is {}x{} but image is {}x{}",
            mask.width(),
            mask.height(),
            grid.width(),
            grid.height()
        )));
    }
    Ok(())
}

/// Copy of the image with every pixel whose mask value differs from `keep`
/// set to black.
fn masked_view(grid: &PixelGrid, mask: &BinaryMask, keep: bool) -> Result<RgbImage> {
    check_dimensions(grid, mask)?;
    let raw: Vec<u8> = grid
        .pixels()
        .iter()
        .zip(mask.cells())
        .flat_map(|(px, &m)| if m == keep { *px } else { [0; 3] })
        .collect();
    RgbImage::from_raw(grid.width() as u32, grid.height() as u32, raw)
        .ok_or_else(|| SegmentError::InvalidInput("failed to rebuild image buffer".into()))
}

/// Material pixels on black.
pub fn material_view(grid: &PixelGrid, mask: &BinaryMask) -> Result<RgbImage> {
    masked_view(grid, mask, true)
}

/// Background pixels on black.
pub fn background_view(grid: &PixelGrid, mask: &BinaryMask) -> Result<RgbImage> {
    masked_view(grid, mask, false)
}

/// Lay the original, material and background views side by side.
///
/// `scale` resizes the composite with nearest-neighbour sampling; very large
/// micrographs are unreadable at full size.
pub fn compose_panels(grid: &PixelGrid, mask: &BinaryMask, scale: Option<f32>) -> Result<RgbImage> {
    let original = grid
        .to_rgb_image()
        .ok_or_else(|| SegmentError::InvalidInput("failed to rebuild image buffer".into()))?;
    let material = material_view(grid, mask)?;
    let background = background_view(grid, mask)?;

    let (w, h) = original.dimensions();
    let mut combined = RgbImage::new(w * 3, h);
    imageops::replace(&mut combined, &original, 0, 0);
    imageops::replace(&mut combined, &material, i64::from(w), 0);
    imageops::replace(&mut combined, &background, 2 * i64::from(w), 0);

    match scale {
        Some(s) if !(s.is_finite() && s > 0.0) => Err(SegmentError::parameter(
            "panel_scale",
            format!("must be a positive number, got {s}"),
        )),
        Some(s) if s != 1.0 => {
            let (out_w, out_h) = scaled_size(combined.dimensions(), s)?;
            Ok(imageops::resize(&combined, out_w, out_h, FilterType::Nearest))
        }
        _ => Ok(combined),
    }
}

/// Largest composite we are willing to allocate, in pixels.
pub const MAX_PANEL_PIXELS: u64 = 100_000_000;

fn scaled_size((w, h): (u32, u32), scale: f32) -> Result<(u32, u32)> {
    let out_w = (f64::from(w) * f64::from(scale)).round().max(1.0);
    let out_h = (f64::from(h) * f64::from(scale)).round().max(1.0);
    if out_w * out_h > MAX_PANEL_PIXELS as f64 {
        return Err(SegmentError::parameter(
            "panel_scale",
            format!("{scale} would produce a {out_w}x{out_h} image, limit is {MAX_PANEL_PIXELS} pixels"),
        ));
    }
    Ok((out_w as u32, out_h as u32))
}

/// Caption lines drawn on the material and background panels.
pub fn panel_captions(stats: &CoverageStats) -> [String; 2] {
    [
        format!("Material: {:.2}%", stats.material_pct),
        format!("Background: {:.2}%", stats.background_pct),
    ]
}

/// Parse a TrueType/OpenType font for [`annotate_panels`].
pub fn load_font(bytes: Vec<u8>) -> Result<FontVec> {
    FontVec::try_from_vec(bytes).map_err(|e| SegmentError::parameter("font", e.to_string()))
}

/// Write titles and coverage percentages onto a composite from
/// [`compose_panels`], one title per panel and the captions under the
/// material and background titles.
pub fn annotate_panels(panels: &mut RgbImage, stats: &CoverageStats, font: &FontVec) {
    let panel_w = panels.width() / 3;
    let line_h = (panels.height() / 16).clamp(12, 48);
    let scale = PxScale::from(line_h as f32);
    let color = Rgb([0, 255, 0]);
    let [material, background] = panel_captions(stats);

    let columns = [
        ("Original Image", None),
        ("Material Segmentation", Some((&material, &background))),
        ("Background Segmentation", Some((&material, &background))),
    ];
    for (i, (title, captions)) in columns.into_iter().enumerate() {
        let left = (i as u32 * panel_w) as i32;
        let mut lines = vec![title];
        if let Some((m, b)) = captions {
            lines.push(m.as_str());
            lines.push(b.as_str());
        }
        for (row, line) in lines.into_iter().enumerate() {
            let (text_w, _) = text_size(scale, font, line);
            let x = left + (panel_w.saturating_sub(text_w) / 2) as i32;
            let y = 4 + (row as u32 * (line_h + 4)) as i32;
            draw_text_mut(panels, color, x, y, scale, font, line);
        }
    }
}

pub fn encode_png(img: &RgbImage) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    {
        let mut cursor = std::io::Cursor::new(&mut buf);
        img.write_to(&mut cursor, ImageFormat::Png)
            .map_err(|e| SegmentError::Encode(e.to_string()))?;
    }
    Ok(buf)
}
