use super::{CellClass, Pipeline, Rgba, SeedSource, Stage, StraightSkeletonParams, colorize};
use crate::{
    decode::{DecodeOpts, decode_direction},
    dispatch::Kernel,
    foundation::error::FloodResult,
    grid::CellGrid,
    seed::SeedOpts,
};

const NEIGHBOURS: [(i64, i64); 4] = [(0, -1), (-1, 0), (1, 0), (0, 1)];

impl Pipeline {
    /// Straight skeleton of the `mask >= threshold` region.
    ///
    /// Foreground cells whose nearest-outline direction disagrees with a foreground neighbour's
    /// (dot product below `angle_threshold`), or that are themselves equidistant from outline
    /// points in such directions, are skeleton.
    #[tracing::instrument(skip(self, mask, params), fields(width = mask.width(), height = mask.height()))]
    pub fn straight_skeleton(
        &mut self,
        mask: &CellGrid<f32>,
        params: &StraightSkeletonParams,
    ) -> FloodResult<&CellGrid<Rgba>> {
        let p = params.clone().sanitized();
        let mut run = self.begin(mask)?;

        let seed_opts = SeedOpts {
            threshold: p.threshold,
            subpixel: p.subpixel,
        };
        run.seed_and_flood(mask, SeedSource::Boundary(p.connectivity), &seed_opts)?;

        let decode = DecodeOpts {
            subpixel: p.subpixel,
            ..DecodeOpts::default()
        };
        let dispatch = run.dispatch;
        let bufs = &mut *run.bufs;
        decode_direction(bufs.flood.result(), &mut bufs.directions, &decode, dispatch)?;
        run.advance(Stage::Decoded);

        let bufs = &mut *run.bufs;
        let directions = &bufs.directions;
        let inside = |x: i64, y: i64| mask.get(x, y).is_some_and(|v| v >= p.threshold);

        dispatch.run(Kernel::StraightSkeleton, &mut bufs.classes, |x, y| {
            let (xi, yi) = (i64::from(x), i64::from(y));
            if !inside(xi, yi) {
                return CellClass::Background;
            }
            let dir = directions.at(x, y);
            if dir.spread < p.angle_threshold {
                return CellClass::Skeleton;
            }
            if !dir.is_defined() {
                return CellClass::Foreground;
            }
            let disagrees = NEIGHBOURS.iter().any(|&(dx, dy)| {
                let (nx, ny) = (xi + dx, yi + dy);
                if !inside(nx, ny) {
                    return false;
                }
                directions
                    .get(nx, ny)
                    .is_some_and(|n| n.is_defined() && dir.dot(n) < p.angle_threshold)
            });
            if disagrees {
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

#[cfg(test)]
mod tests {
    use crate::{CellClass, CellGrid, EngineOpts, Pipeline, StraightSkeletonParams};

    fn rect(width: u32, height: u32, x0: u32, y0: u32, x1: u32, y1: u32) -> CellGrid<f32> {
        CellGrid::from_fn(width, height, |x, y| {
            if (x0..=x1).contains(&x) && (y0..=y1).contains(&y) { 1.0 } else { 0.0 }
        })
        .unwrap()
    }

    #[test]
    fn square_corners_produce_diagonal_skeleton() {
        let mask = rect(16, 16, 2, 2, 13, 13);
        let mut p = Pipeline::new(&EngineOpts::default()).unwrap();
        p.straight_skeleton(&mask, &StraightSkeletonParams::default())
            .unwrap();
        let classes = p.classes().unwrap();

        // Diagonal from the top-left corner: equidistant from the top and left edges.
        for i in 3..7 {
            assert_eq!(classes.at(i, i), CellClass::Skeleton, "({i},{i})");
            assert_eq!(classes.at(15 - i, i), CellClass::Skeleton, "({},{i})", 15 - i);
        }
        // Half way along an edge the nearest outline point is unique.
        assert_eq!(classes.at(8, 4), CellClass::Foreground);
        assert_eq!(classes.at(0, 0), CellClass::Background);
    }

    #[test]
    fn outline_cells_are_plain_foreground() {
        let mask = rect(12, 10, 1, 1, 10, 8);
        let mut p = Pipeline::new(&EngineOpts::default()).unwrap();
        let rgba = p
            .straight_skeleton(&mask, &StraightSkeletonParams::default())
            .unwrap();
        assert_eq!(rgba.at(5, 1), [0.5, 0.5, 0.5, 1.0]);
        assert_eq!(p.directions().unwrap().at(5, 1).spread, 1.0);
    }
}
