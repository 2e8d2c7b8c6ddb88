use super::{BevelParams, Pipeline, Rgba, SeedSource, Stage};
use crate::{
    decode::{DecodeOpts, decode_distance},
    dispatch::Kernel,
    foundation::{error::FloodResult, math::hash_unit},
    grid::CellGrid,
    seed::SeedOpts,
};

/// Normalised light vector for a direction in degrees, 45° above the surface.
///
/// Grid y points down, so a counter-clockwise screen angle flips the y component.
fn light_dir(angle_deg: f32) -> [f32; 3] {
    let a = angle_deg.to_radians();
    normalize([a.cos(), -a.sin(), 1.0])
}

fn normalize(v: [f32; 3]) -> [f32; 3] {
    let len = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    [v[0] / len, v[1] / len, v[2] / len]
}

impl Pipeline {
    /// Faux-3D bevel along the inside edge of the `mask >= threshold` region.
    ///
    /// The distance to the outside, capped at `width`, is treated as a height field. Its central
    /// difference gives a surface normal that is lit from `angle`: cells facing the light get
    /// `highlight_color`, cells facing away get `shadow_color`, with alpha proportional to the
    /// deviation from a flat surface. Cells outside the region are transparent.
    #[tracing::instrument(skip(self, mask, params), fields(width = mask.width(), height = mask.height()))]
    pub fn inner_bevel(
        &mut self,
        mask: &CellGrid<f32>,
        params: &BevelParams,
    ) -> FloodResult<&CellGrid<Rgba>> {
        let p = params.clone().sanitized();
        let mut run = self.begin(mask)?;

        let seed_opts = SeedOpts {
            threshold: p.threshold,
            subpixel: p.subpixel,
        };
        run.seed_and_flood(mask, SeedSource::Background, &seed_opts)?;

        let decode = DecodeOpts {
            distance_scale: p.distance_scale,
            subpixel: p.subpixel,
            ..DecodeOpts::default()
        };
        let dispatch = run.dispatch;
        let bufs = &mut *run.bufs;
        decode_distance(bufs.flood.result(), &mut bufs.field, &decode, dispatch)?;
        run.advance(Stage::Decoded);

        let bufs = &mut *run.bufs;
        let field = &bufs.field;
        let (w, h) = field.dims();
        let height = |x: i64, y: i64| {
            let cx = x.clamp(0, i64::from(w) - 1) as u32;
            let cy = y.clamp(0, i64::from(h) - 1) as u32;
            let d = field.at(cx, cy).min(p.width);
            let jitter = if p.noise > 0.0 {
                (hash_unit(p.noise_seed, cx, cy) - 0.5) * p.noise
            } else {
                0.0
            };
            (d + jitter).clamp(0.0, p.width)
        };
        let light = light_dir(p.angle);

        dispatch.run(Kernel::Bevel, &mut bufs.rgba, |x, y| {
            if mask.at(x, y) < p.threshold {
                return [0.0; 4];
            }
            let (xi, yi) = (i64::from(x), i64::from(y));
            let gx = 0.5 * (height(xi + 1, yi) - height(xi - 1, yi));
            let gy = 0.5 * (height(xi, yi + 1) - height(xi, yi - 1));
            let n = normalize([-gx, -gy, 1.0]);
            let shade = n[0] * light[0] + n[1] * light[1] + n[2] * light[2] - light[2];

            let (color, alpha) = if shade > 0.0 {
                (p.highlight_color, (shade / (1.0 - light[2])).min(1.0))
            } else {
                (p.shadow_color, (-shade / light[2]).min(1.0))
            };
            if alpha <= 0.0 {
                return [0.0; 4];
            }
            [color[0], color[1], color[2], color[3] * alpha]
        });

        let bufs = run.finish(Stage::Classified);
        Ok(&bufs.rgba)
    }
}

#[cfg(test)]
mod tests {
    use crate::{BevelParams, CellGrid, EngineOpts, Pipeline};

    fn square() -> CellGrid<f32> {
        CellGrid::from_fn(32, 32, |x, y| {
            if (4..=27).contains(&x) && (4..=27).contains(&y) { 1.0 } else { 0.0 }
        })
        .unwrap()
    }

    #[test]
    fn light_from_the_right_lifts_the_right_edge() {
        let mut p = Pipeline::new(&EngineOpts::default()).unwrap();
        let rgba = p.inner_bevel(&square(), &BevelParams::default()).unwrap();

        let right = rgba.at(26, 15);
        assert_eq!(&right[..3], &[1.0, 1.0, 1.0]);
        assert!(right[3] > 0.99, "{right:?}");

        let left = rgba.at(5, 15);
        assert_eq!(&left[..3], &[0.0, 0.0, 0.0]);
        assert!(left[3] > 0.99, "{left:?}");

        // Flat plateau beyond the bevel width and everything outside the mask.
        assert_eq!(rgba.at(15, 15), [0.0; 4]);
        assert_eq!(rgba.at(1, 1), [0.0; 4]);
    }

    #[test]
    fn subpixel_seeds_sit_on_the_mask_edge() {
        let mut p = Pipeline::new(&EngineOpts::default()).unwrap();
        p.inner_bevel(&square(), &BevelParams::default()).unwrap();
        let field = p.field().unwrap();
        assert!((field.at(4, 15) - 0.5).abs() < 1e-6);
        assert!((field.at(6, 15) - 2.5).abs() < 1e-6);
    }

    #[test]
    fn noise_is_deterministic_per_seed() {
        let params = BevelParams {
            noise: 1.0,
            noise_seed: 7,
            ..BevelParams::default()
        };
        let mut p = Pipeline::new(&EngineOpts::default()).unwrap();
        let a = p.inner_bevel(&square(), &params).unwrap().clone();
        let b = p.inner_bevel(&square(), &params).unwrap().clone();
        assert_eq!(a, b);

        let other = BevelParams {
            noise_seed: 8,
            ..params
        };
        let c = p.inner_bevel(&square(), &other).unwrap().clone();
        assert_ne!(a, c);
    }
}
