//! Conversions between 8-bit RGBA images and cell grids.

use crate::{
    foundation::error::{FloodError, FloodResult},
    grid::CellGrid,
};

/// Channel of an RGBA8 image used as the mask.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaskSource {
    #[default]
    Alpha,
    /// Rec. 709 luma of the colour channels, alpha ignored.
    Luma,
}

/// Build a `[0, 1]` mask grid from tightly packed RGBA8 bytes.
pub fn mask_from_rgba8(
    bytes: &[u8],
    width: u32,
    height: u32,
    source: MaskSource,
) -> FloodResult<CellGrid<f32>> {
    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| FloodError::validation("image size overflow"))?;
    if bytes.len() != expected {
        return Err(FloodError::validation(format!(
            "rgba8 buffer for {width}x{height} must be {expected} bytes, got {}",
            bytes.len()
        )));
    }

    let cells = bytes
        .chunks_exact(4)
        .map(|px| {
            let v = match source {
                MaskSource::Alpha => px[3],
                MaskSource::Luma => {
                    let r = u16::from(px[0]);
                    let g = u16::from(px[1]);
                    let b = u16::from(px[2]);
                    ((r * 54 + g * 183 + b * 19 + 128) >> 8) as u8
                }
            };
            f32::from(v) / 255.0
        })
        .collect();
    CellGrid::from_vec(width, height, cells)
}

/// Quantise straight RGBA cells in `[0, 1]` to RGBA8 bytes.
pub fn rgba8_from_cells(grid: &CellGrid<[f32; 4]>) -> Vec<u8> {
    grid.cells()
        .iter()
        .flat_map(|&px| px.map(unit_to_u8))
        .collect()
}

/// Map a scalar field to 8-bit grey, `0 → 0` and `|v| >= max → 255`.
///
/// Non-finite cells (unreached sentinels) map to 255.
pub fn gray8_from_field(field: &CellGrid<f32>, max: f32) -> FloodResult<Vec<u8>> {
    if !(max.is_finite() && max > 0.0) {
        return Err(FloodError::validation(format!(
            "field normalisation max must be finite and > 0, got {max}"
        )));
    }
    Ok(field
        .cells()
        .iter()
        .map(|&v| {
            if v.is_finite() {
                unit_to_u8(v.abs() / max)
            } else {
                255
            }
        })
        .collect())
}

fn unit_to_u8(v: f32) -> u8 {
    if v.is_nan() {
        return 0;
    }
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}
