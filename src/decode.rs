//! Turn a propagated seed grid into distance and direction fields.
//!
//! Decoders are pure: they read the seed grid (and optionally a mask) and write only `out`.

use crate::{
    dispatch::{CellDispatch, Kernel},
    foundation::{
        error::FloodResult,
        math::{clamp_scale, unit_threshold},
    },
    grid::{CellGrid, Seed, ensure_same_dims},
};

/// Relative squared-distance tolerance under which two seeds count as equidistant.
const TIE_TOLERANCE: f32 = 1e-5;

/// Subpixel seeds closer than this (in cells) give no usable direction.
const SUBPIXEL_MIN_LEN: f32 = 1.0 / 256.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DecodeOpts {
    /// Multiplier applied to every decoded distance, clamped to `[1e-6, 1e6]`.
    /// Non-finite values decode as `1.0`.
    pub distance_scale: f32,
    /// Value written where no seed was reached. Never scaled.
    pub sentinel: f32,
    /// Seeds were encoded with subpixel offsets.
    pub subpixel: bool,
}

impl Default for DecodeOpts {
    fn default() -> Self {
        Self {
            distance_scale: 1.0,
            sentinel: f32::INFINITY,
            subpixel: false,
        }
    }
}

impl DecodeOpts {
    fn scale(&self) -> f32 {
        clamp_scale(self.distance_scale)
    }

    fn sentinel(&self) -> f32 {
        if self.sentinel.is_nan() {
            f32::INFINITY
        } else {
            self.sentinel
        }
    }
}

/// `distance_scale * |seed - cell|`, or the sentinel where no seed was reached.
pub fn decode_distance(
    seeds: &CellGrid<Seed>,
    out: &mut CellGrid<f32>,
    opts: &DecodeOpts,
    dispatch: &CellDispatch,
) -> FloodResult<()> {
    ensure_same_dims("decode_distance", seeds, out)?;
    let sentinel = opts.sentinel();
    let scale = opts.scale();
    dispatch.run(Kernel::Distance, out, |x, y| {
        let seed = seeds.at(x, y);
        if seed.is_none() {
            return sentinel;
        }
        scale * seed.dist2(x as f32, y as f32).sqrt()
    });
    Ok(())
}

/// Like [`decode_distance`], negated for cells inside the `mask >= threshold` region.
///
/// `threshold` is clamped to `[0, 1]`, NaN reads as `0.5`. The sentinel is written unsigned.
pub fn decode_signed_distance(
    seeds: &CellGrid<Seed>,
    mask: &CellGrid<f32>,
    threshold: f32,
    out: &mut CellGrid<f32>,
    opts: &DecodeOpts,
    dispatch: &CellDispatch,
) -> FloodResult<()> {
    ensure_same_dims("decode_signed_distance", seeds, out)?;
    ensure_same_dims("decode_signed_distance", seeds, mask)?;
    let sentinel = opts.sentinel();
    let scale = opts.scale();
    let threshold = unit_threshold(threshold);
    dispatch.run(Kernel::SignedDistance, out, |x, y| {
        let seed = seeds.at(x, y);
        if seed.is_none() {
            return sentinel;
        }
        let d = scale * seed.dist2(x as f32, y as f32).sqrt();
        if mask.at(x, y) >= threshold { -d } else { d }
    });
    Ok(())
}

/// Unit vector from a cell towards its nearest seed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Direction {
    pub x: f32,
    pub y: f32,
    /// Smallest dot product between the unit directions of equidistant nearest seeds; `1.0`
    /// when the nearest seed is unique. Low values mark cells on a medial axis.
    pub spread: f32,
}

impl Direction {
    /// No direction: unreached cells, and cells that are their own seed.
    pub const NONE: Direction = Direction {
        x: 0.0,
        y: 0.0,
        spread: 1.0,
    };

    #[inline]
    pub fn is_defined(self) -> bool {
        self.x != 0.0 || self.y != 0.0
    }

    #[inline]
    pub fn dot(self, other: Direction) -> f32 {
        self.x * other.x + self.y * other.y
    }
}

impl Default for Direction {
    fn default() -> Self {
        Self::NONE
    }
}

/// Normalised `(seed - cell)` per cell.
///
/// Jump flooding stores one seed per cell even where several are equally near, and which one it
/// keeps depends on the enumeration order. To stay independent of that choice the decoder
/// gathers the distinct seeds stored in the cell's 3×3 neighbourhood, keeps those at the minimum
/// distance, and emits the normalised mean of their unit directions together with their
/// [`Direction::spread`]. Where the nearest seed is unique this is exactly the normalised
/// `(cx - x, cy - y)`.
///
/// The result can therefore disagree with the seed stored at the cell itself: when a neighbour
/// holds a strictly nearer seed, that one wins, and on ties the mean of all tied seeds is used.
pub fn decode_direction(
    seeds: &CellGrid<Seed>,
    out: &mut CellGrid<Direction>,
    opts: &DecodeOpts,
    dispatch: &CellDispatch,
) -> FloodResult<()> {
    ensure_same_dims("decode_direction", seeds, out)?;
    let min_len2 = if opts.subpixel {
        SUBPIXEL_MIN_LEN * SUBPIXEL_MIN_LEN
    } else {
        0.0
    };
    dispatch.run(Kernel::Direction, out, |x, y| {
        direction_at(seeds, x, y, min_len2)
    });
    Ok(())
}

fn direction_at(seeds: &CellGrid<Seed>, x: u32, y: u32, min_len2: f32) -> Direction {
    let (px, py) = (x as f32, y as f32);

    let mut found = [Seed::NONE; 9];
    let mut n = 0;
    let mut best = f32::INFINITY;
    for dy in -1i64..=1 {
        for dx in -1i64..=1 {
            let Some(seed) = seeds.get(i64::from(x) + dx, i64::from(y) + dy) else {
                continue;
            };
            if seed.is_none() || found[..n].contains(&seed) {
                continue;
            }
            best = best.min(seed.dist2(px, py));
            found[n] = seed;
            n += 1;
        }
    }
    if !best.is_finite() || best <= min_len2 {
        return Direction::NONE;
    }

    let tolerance = best.max(1.0) * TIE_TOLERANCE;
    let mut units = [(0.0f32, 0.0f32); 9];
    let mut m = 0;
    for seed in &found[..n] {
        let d2 = seed.dist2(px, py);
        if d2 - best > tolerance {
            continue;
        }
        let len = d2.sqrt();
        units[m] = ((seed.x - px) / len, (seed.y - py) / len);
        m += 1;
    }

    // Summed in f64: the rounded mean must not depend on scan order.
    let mut spread = 1.0f32;
    let (mut sx, mut sy) = (0.0f64, 0.0f64);
    for (i, &(ux, uy)) in units[..m].iter().enumerate() {
        sx += f64::from(ux);
        sy += f64::from(uy);
        for &(vx, vy) in &units[i + 1..m] {
            spread = spread.min(ux * vx + uy * vy);
        }
    }

    let len = (sx * sx + sy * sy).sqrt();
    if len <= 1e-6 {
        return Direction {
            x: 0.0,
            y: 0.0,
            spread,
        };
    }
    Direction {
        x: (sx / len) as f32,
        y: (sy / len) as f32,
        spread,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FloodError;

    fn seeds_all(width: u32, height: u32, seed: Seed) -> CellGrid<Seed> {
        CellGrid::new(width, height, seed).unwrap()
    }

    #[test]
    fn distance_is_scaled_euclidean() {
        let seeds = seeds_all(5, 5, Seed::at(1.0, 1.0));
        let mut out = CellGrid::new(5, 5, 0.0f32).unwrap();
        let opts = DecodeOpts {
            distance_scale: 2.0,
            ..DecodeOpts::default()
        };
        decode_distance(&seeds, &mut out, &opts, &CellDispatch::serial()).unwrap();
        assert_eq!(out.at(1, 1), 0.0);
        assert_eq!(out.at(4, 4), 2.0 * 18.0f32.sqrt());
        assert_eq!(out.at(1, 4), 6.0);
    }

    #[test]
    fn unreached_cells_get_the_sentinel() {
        let seeds = seeds_all(3, 3, Seed::NONE);
        let mut out = CellGrid::new(3, 3, 0.0f32).unwrap();
        let opts = DecodeOpts {
            sentinel: 1000.0,
            ..DecodeOpts::default()
        };
        decode_distance(&seeds, &mut out, &opts, &CellDispatch::serial()).unwrap();
        assert!(out.cells().iter().all(|&d| d == 1000.0));

        let nan = DecodeOpts {
            sentinel: f32::NAN,
            ..DecodeOpts::default()
        };
        decode_distance(&seeds, &mut out, &nan, &CellDispatch::serial()).unwrap();
        assert!(out.cells().iter().all(|&d| d == f32::INFINITY));
    }

    #[test]
    fn signed_distance_is_negative_inside_the_mask() {
        let seeds = seeds_all(4, 1, Seed::at(0.0, 0.0));
        let mask = CellGrid::from_vec(4, 1, vec![1.0, 1.0, 0.0, 0.0]).unwrap();
        let mut out = CellGrid::new(4, 1, 0.0f32).unwrap();
        decode_signed_distance(
            &seeds,
            &mask,
            0.5,
            &mut out,
            &DecodeOpts::default(),
            &CellDispatch::serial(),
        )
        .unwrap();
        assert_eq!(out.cells(), &[-0.0, -1.0, 2.0, 3.0]);
    }

    #[test]
    fn out_of_domain_scale_and_threshold_are_clamped() {
        let seeds = seeds_all(3, 1, Seed::at(0.0, 0.0));
        let mut out = CellGrid::new(3, 1, 0.0f32).unwrap();
        let negative = DecodeOpts {
            distance_scale: -2.0,
            ..DecodeOpts::default()
        };
        decode_distance(&seeds, &mut out, &negative, &CellDispatch::serial()).unwrap();
        assert!(out.cells().iter().all(|&d| d >= 0.0));
        assert_eq!(out.at(2, 0), 2e-6);

        let nan = DecodeOpts {
            distance_scale: f32::NAN,
            ..DecodeOpts::default()
        };
        decode_distance(&seeds, &mut out, &nan, &CellDispatch::serial()).unwrap();
        assert_eq!(out.cells(), &[0.0, 1.0, 2.0]);

        let mask = CellGrid::from_vec(3, 1, vec![1.0, 0.6, 0.4]).unwrap();
        decode_signed_distance(
            &seeds,
            &mask,
            f32::NAN,
            &mut out,
            &nan,
            &CellDispatch::serial(),
        )
        .unwrap();
        assert_eq!(out.cells(), &[-0.0, -1.0, 2.0]);
    }

    #[test]
    fn signed_distance_checks_mask_dims() {
        let seeds = seeds_all(4, 2, Seed::NONE);
        let mask = CellGrid::new(2, 4, 0.0f32).unwrap();
        let mut out = CellGrid::new(4, 2, 0.0f32).unwrap();
        let err = decode_signed_distance(
            &seeds,
            &mask,
            0.5,
            &mut out,
            &DecodeOpts::default(),
            &CellDispatch::serial(),
        )
        .unwrap_err();
        assert!(matches!(err, FloodError::DimensionMismatch { .. }));
    }

    #[test]
    fn direction_points_at_the_seed() {
        let seeds = seeds_all(5, 5, Seed::at(4.0, 0.0));
        let mut out = CellGrid::new(5, 5, Direction::NONE).unwrap();
        decode_direction(&seeds, &mut out, &DecodeOpts::default(), &CellDispatch::serial())
            .unwrap();
        let d = out.at(0, 4);
        assert!((d.x - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6);
        assert!((d.y + std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6);
        assert_eq!(d.spread, 1.0);
        assert!(!out.at(4, 0).is_defined());
    }

    #[test]
    fn equidistant_seeds_are_averaged_and_spread_is_reported() {
        // Column 2 is equidistant from seeds on columns 0 and 4; the propagated grid keeps only
        // one of them at (2, y), the neighbours hold the other.
        let seeds = CellGrid::from_fn(5, 3, |x, y| {
            if x <= 2 {
                Seed::at(0.0, y as f32)
            } else {
                Seed::at(4.0, y as f32)
            }
        })
        .unwrap();
        let mut out = CellGrid::new(5, 3, Direction::NONE).unwrap();
        decode_direction(&seeds, &mut out, &DecodeOpts::default(), &CellDispatch::serial())
            .unwrap();

        let mid = out.at(2, 1);
        assert!(!mid.is_defined());
        assert_eq!(mid.spread, -1.0);

        let left = out.at(1, 1);
        assert_eq!((left.x, left.y, left.spread), (-1.0, 0.0, 1.0));
    }

    #[test]
    fn subpixel_seed_cells_keep_a_direction() {
        let seeds = seeds_all(3, 3, Seed::at(1.5, 1.0));
        let mut out = CellGrid::new(3, 3, Direction::NONE).unwrap();
        let opts = DecodeOpts {
            subpixel: true,
            ..DecodeOpts::default()
        };
        decode_direction(&seeds, &mut out, &opts, &CellDispatch::serial()).unwrap();
        let d = out.at(1, 1);
        assert_eq!((d.x, d.y), (1.0, 0.0));
    }
}
