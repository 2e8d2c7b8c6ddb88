use super::{CellClass, Pipeline, SeedSource, SkeletonParams, Stage, colorize};
use crate::{
    decode::{DecodeOpts, decode_distance, decode_signed_distance},
    dispatch::Kernel,
    foundation::error::FloodResult,
    grid::CellGrid,
    seed::SeedOpts,
};

/// Opposite-neighbour pairs checked for a ridge: horizontal, vertical and both diagonals.
const RIDGE_AXES: [(i64, i64); 4] = [(1, 0), (0, 1), (1, 1), (1, -1)];

impl Pipeline {
    /// Medial-axis skeleton of the `mask >= threshold` region.
    ///
    /// A foreground cell is skeleton when its inside distance is a local ridge along at least one
    /// axis (no smaller than either opposite neighbour and larger than one of them) and is at
    /// least `min_distance` away from the outline.
    #[tracing::instrument(skip(self, mask, params), fields(width = mask.width(), height = mask.height()))]
    pub fn skeleton(
        &mut self,
        mask: &CellGrid<f32>,
        params: &SkeletonParams,
    ) -> FloodResult<&CellGrid<[f32; 4]>> {
        let p = params.clone().sanitized();
        let mut run = self.begin(mask)?;

        let seed_opts = SeedOpts {
            threshold: p.threshold,
            subpixel: false,
        };
        let source = if p.signed_distance {
            SeedSource::Boundary(p.connectivity)
        } else {
            SeedSource::Background
        };
        run.seed_and_flood(mask, source, &seed_opts)?;

        let decode = DecodeOpts {
            distance_scale: p.distance_scale,
            ..DecodeOpts::default()
        };
        let dispatch = run.dispatch;
        let bufs = &mut *run.bufs;
        if p.signed_distance {
            decode_signed_distance(
                bufs.flood.result(),
                mask,
                p.threshold,
                &mut bufs.field,
                &decode,
                dispatch,
            )?;
        } else {
            decode_distance(bufs.flood.result(), &mut bufs.field, &decode, dispatch)?;
        }
        run.advance(Stage::Decoded);

        let bufs = &mut *run.bufs;
        let field = &bufs.field;
        let signed = p.signed_distance;
        // Distance into the region, or None for background and out-of-grid cells.
        let inner = |x: i64, y: i64| -> Option<f32> {
            let v = mask.get(x, y)?;
            if v < p.threshold {
                return None;
            }
            let d = field.get(x, y)?;
            Some(if signed { -d } else { d })
        };

        dispatch.run(Kernel::Skeleton, &mut bufs.classes, |x, y| {
            let (x, y) = (i64::from(x), i64::from(y));
            let Some(d) = inner(x, y) else {
                return CellClass::Background;
            };
            if !d.is_finite() || d < p.min_distance {
                return CellClass::Foreground;
            }
            let ridge = RIDGE_AXES.iter().any(|&(dx, dy)| {
                let a = inner(x + dx, y + dy).unwrap_or(f32::NEG_INFINITY);
                let b = inner(x - dx, y - dy).unwrap_or(f32::NEG_INFINITY);
                d >= a && d >= b && d > a.min(b)
            });
            if ridge {
                CellClass::Skeleton
            } else {
                CellClass::Foreground
            }
        });

        colorize(
            &bufs.classes,
            &mut bufs.rgba,
            [p.background_color, p.foreground_color, p.skeleton_color],
            dispatch,
        );

        let bufs = run.finish(Stage::Classified);
        Ok(&bufs.rgba)
    }
}
