use super::{DistanceParams, Pipeline, SeedSource, Stage};
use crate::{
    decode::{DecodeOpts, decode_distance, decode_signed_distance},
    foundation::error::FloodResult,
    grid::CellGrid,
    seed::SeedOpts,
};

impl Pipeline {
    /// Distance from every cell to the `mask >= threshold` region.
    ///
    /// Unsigned: seeds are the region's cells, so they read `0`. Signed: seeds are the region's
    /// outline and inside cells read negative.
    #[tracing::instrument(skip(self, mask, params), fields(width = mask.width(), height = mask.height()))]
    pub fn distance_field(
        &mut self,
        mask: &CellGrid<f32>,
        params: &DistanceParams,
    ) -> FloodResult<&CellGrid<f32>> {
        let p = params.clone().sanitized();
        let mut run = self.begin(mask)?;

        let seed_opts = SeedOpts {
            threshold: p.threshold,
            subpixel: p.subpixel,
        };
        let source = if p.signed_distance {
            SeedSource::Boundary(p.connectivity)
        } else {
            SeedSource::Mask
        };
        run.seed_and_flood(mask, source, &seed_opts)?;

        let decode = DecodeOpts {
            distance_scale: p.distance_scale,
            sentinel: p.sentinel,
            subpixel: p.subpixel,
        };
        let bufs = &mut *run.bufs;
        if p.signed_distance {
            decode_signed_distance(
                bufs.flood.result(),
                mask,
                p.threshold,
                &mut bufs.field,
                &decode,
                run.dispatch,
            )?;
        } else {
            decode_distance(bufs.flood.result(), &mut bufs.field, &decode, run.dispatch)?;
        }

        let bufs = run.finish(Stage::Decoded);
        Ok(&bufs.field)
    }
}
