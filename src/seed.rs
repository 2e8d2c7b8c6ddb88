use crate::{
    dispatch::{CellDispatch, Kernel},
    foundation::{error::FloodResult, math::unit_threshold},
    grid::{CellGrid, Seed, ensure_same_dims},
};

/// Largest subpixel shift applied to a seed, in cells.
const MAX_SUBPIXEL_SHIFT: f32 = 0.5;

/// Gradients below this squared magnitude leave the seed on its cell.
const MIN_GRADIENT2: f32 = 1e-12;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SeedOpts {
    /// Cells with `mask >= threshold` become seeds.
    pub threshold: f32,
    /// Shift each seed towards the `threshold` iso-line using the 3×3 Sobel gradient.
    pub subpixel: bool,
}

impl Default for SeedOpts {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            subpixel: false,
        }
    }
}

/// Turn a 1-channel mask into a seed grid and return the number of seeds.
///
/// Seed cells store their own coordinate (optionally refined to subpixel precision); every other
/// cell stores [`Seed::NONE`].
pub fn encode_seeds(
    mask: &CellGrid<f32>,
    out: &mut CellGrid<Seed>,
    opts: &SeedOpts,
    dispatch: &CellDispatch,
) -> FloodResult<usize> {
    ensure_same_dims("encode_seeds", mask, out)?;
    let threshold = unit_threshold(opts.threshold);
    encode_where(mask, out, opts, dispatch, |x, y| mask.at(x, y) >= threshold)
}

/// Seed only the cells flagged in `boundary` (e.g. an extracted contour), taking subpixel
/// offsets from the gradient of the original `mask`.
pub fn encode_boundary_seeds(
    mask: &CellGrid<f32>,
    boundary: &CellGrid<f32>,
    out: &mut CellGrid<Seed>,
    opts: &SeedOpts,
    dispatch: &CellDispatch,
) -> FloodResult<usize> {
    ensure_same_dims("encode_boundary_seeds", mask, out)?;
    ensure_same_dims("encode_boundary_seeds", mask, boundary)?;
    encode_where(mask, out, opts, dispatch, |x, y| boundary.at(x, y) > 0.0)
}

fn encode_where<F>(
    mask: &CellGrid<f32>,
    out: &mut CellGrid<Seed>,
    opts: &SeedOpts,
    dispatch: &CellDispatch,
    is_seed: F,
) -> FloodResult<usize>
where
    F: Fn(u32, u32) -> bool + Sync,
{
    let threshold = unit_threshold(opts.threshold);
    dispatch.run(Kernel::EncodeSeeds, out, |x, y| {
        if !is_seed(x, y) {
            return Seed::NONE;
        }
        let (ox, oy) = if opts.subpixel {
            subpixel_offset(mask, x, y, threshold)
        } else {
            (0.0, 0.0)
        };
        Seed::at(x as f32 + ox, y as f32 + oy)
    });

    Ok(out.cells().iter().filter(|s| s.is_some()).count())
}

/// First-order estimate of where the mask crosses `threshold` near `(x, y)`.
///
/// Takes one Newton step along the Sobel gradient: `(t - v) * g / |g|²`, clamped per axis to half
/// a cell so seeds never leave their own cell.
fn subpixel_offset(mask: &CellGrid<f32>, x: u32, y: u32, threshold: f32) -> (f32, f32) {
    let (w, h) = mask.dims();
    let sample = |dx: i64, dy: i64| {
        let sx = (i64::from(x) + dx).clamp(0, i64::from(w) - 1) as u32;
        let sy = (i64::from(y) + dy).clamp(0, i64::from(h) - 1) as u32;
        mask.at(sx, sy)
    };

    let gx = ((sample(1, -1) + 2.0 * sample(1, 0) + sample(1, 1))
        - (sample(-1, -1) + 2.0 * sample(-1, 0) + sample(-1, 1)))
        / 8.0;
    let gy = ((sample(-1, 1) + 2.0 * sample(0, 1) + sample(1, 1))
        - (sample(-1, -1) + 2.0 * sample(0, -1) + sample(1, -1)))
        / 8.0;

    let g2 = gx * gx + gy * gy;
    if g2 <= MIN_GRADIENT2 {
        return (0.0, 0.0);
    }
    let k = (threshold - sample(0, 0)) / g2;
    (
        (k * gx).clamp(-MAX_SUBPIXEL_SHIFT, MAX_SUBPIXEL_SHIFT),
        (k * gy).clamp(-MAX_SUBPIXEL_SHIFT, MAX_SUBPIXEL_SHIFT),
    )
}
