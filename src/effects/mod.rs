//! Effects built on top of jump flooding.
//!
//! Every effect runs through a [`Pipeline`], which owns the intermediate grids and the
//! [`JumpFlood`] buffers and reuses them across calls with the same mask dimensions.

mod bevel;
mod distance;
pub mod params;
mod skeleton;
mod straight_skeleton;

use crate::{
    contour::{Connectivity, extract_contour},
    decode::Direction,
    dispatch::{CellDispatch, Kernel, Threading},
    foundation::{
        error::{FloodError, FloodResult},
        math::unit_threshold,
    },
    grid::{CellGrid, Seed},
    propagate::{FloodStats, FloodVariant, JumpFlood},
    seed::{SeedOpts, encode_boundary_seeds, encode_seeds},
};

pub use params::{
    BevelParams, DistanceParams, EffectParams, EffectSpec, Rgba, SkeletonParams,
    StraightSkeletonParams, parse_effect, parse_effect_json,
};

#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(default)]
/// Engine-wide options shared by every effect run through one [`Pipeline`].
pub struct EngineOpts {
    pub variant: FloodVariant,
    pub threading: Threading,
}

/// Where a [`Pipeline`] is in its most recent run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Stage {
    /// No grids yet.
    #[default]
    Uninitialized,
    /// Grids sized for the current mask.
    Allocated,
    Propagated,
    Decoded,
    /// Cells classified or shaded into the RGBA output.
    Classified,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Times the grid set was (re)allocated.
    pub allocations: u64,
    /// Effect invocations.
    pub runs: u64,
}

/// Per-cell label written by the skeleton effects.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CellClass {
    #[default]
    Background,
    Foreground,
    Skeleton,
}

/// Output of [`Pipeline::apply`].
#[derive(Clone, Copy, Debug)]
pub enum EffectOutput<'a> {
    Field(&'a CellGrid<f32>),
    Rgba(&'a CellGrid<Rgba>),
}

struct Buffers {
    aux: CellGrid<f32>,
    seeds: CellGrid<Seed>,
    flood: JumpFlood,
    field: CellGrid<f32>,
    directions: CellGrid<Direction>,
    classes: CellGrid<CellClass>,
    rgba: CellGrid<Rgba>,
}

impl Buffers {
    fn new(width: u32, height: u32, variant: FloodVariant) -> FloodResult<Self> {
        Ok(Self {
            aux: CellGrid::new(width, height, 0.0)?,
            seeds: CellGrid::new(width, height, Seed::NONE)?,
            flood: JumpFlood::new(width, height, variant)?,
            field: CellGrid::new(width, height, 0.0)?,
            directions: CellGrid::new(width, height, Direction::NONE)?,
            classes: CellGrid::new(width, height, CellClass::Background)?,
            rgba: CellGrid::new(width, height, [0.0; 4])?,
        })
    }

    fn dims(&self) -> (u32, u32) {
        self.seeds.dims()
    }
}

/// Which cells of the mask become propagation seeds.
#[derive(Clone, Copy, Debug)]
enum SeedSource {
    /// Every `mask >= threshold` cell.
    Mask,
    /// The outline of the `mask >= threshold` region.
    Boundary(Connectivity),
    /// Every `mask < threshold` cell, so interior cells measure their distance to the outside.
    Background,
}

/// Buffers and dispatch borrowed for the duration of one effect invocation.
struct Run<'a> {
    dispatch: &'a CellDispatch,
    bufs: &'a mut Buffers,
    stage: &'a mut Stage,
}

impl<'a> Run<'a> {
    fn advance(&mut self, stage: Stage) {
        tracing::trace!(?stage, "pipeline stage");
        *self.stage = stage;
    }

    /// Record the final stage and release the buffers for the caller's output.
    fn finish(mut self, stage: Stage) -> &'a mut Buffers {
        self.advance(stage);
        self.bufs
    }

    /// Encode seeds from `mask` and propagate them. Returns the seed count.
    fn seed_and_flood(
        &mut self,
        mask: &CellGrid<f32>,
        source: SeedSource,
        opts: &SeedOpts,
    ) -> FloodResult<usize> {
        let dispatch = self.dispatch;
        let bufs = &mut *self.bufs;
        let threshold = unit_threshold(opts.threshold);

        let count = match source {
            SeedSource::Mask => encode_seeds(mask, &mut bufs.seeds, opts, dispatch)?,
            SeedSource::Boundary(connectivity) => {
                extract_contour(mask, &mut bufs.aux, threshold, connectivity, dispatch)?;
                encode_boundary_seeds(mask, &bufs.aux, &mut bufs.seeds, opts, dispatch)?
            }
            SeedSource::Background => {
                dispatch.run(Kernel::Invert, &mut bufs.aux, |x, y| {
                    if mask.at(x, y) < threshold { 1.0 } else { 0.0 }
                });
                encode_boundary_seeds(mask, &bufs.aux, &mut bufs.seeds, opts, dispatch)?
            }
        };
        tracing::debug!(?source, seeds = count, "encoded seeds");

        bufs.flood.propagate(&bufs.seeds, dispatch)?;
        self.advance(Stage::Propagated);
        Ok(count)
    }
}

/// Owns every grid an effect needs and reallocates them only when the mask size changes.
///
/// ```no_run
/// use floodfx::{CellGrid, EngineOpts, Pipeline, SkeletonParams};
///
/// let mask = CellGrid::from_fn(64, 64, |x, y| {
///     if (8..56).contains(&x) && (16..48).contains(&y) { 1.0 } else { 0.0 }
/// })?;
/// let mut pipeline = Pipeline::new(&EngineOpts::default())?;
/// let rgba = pipeline.skeleton(&mask, &SkeletonParams::default())?;
/// assert_eq!(rgba.dims(), (64, 64));
/// # Ok::<(), floodfx::FloodError>(())
/// ```
pub struct Pipeline {
    variant: FloodVariant,
    dispatch: CellDispatch,
    stage: Stage,
    stats: PipelineStats,
    buffers: Option<Buffers>,
}

impl Pipeline {
    pub fn new(opts: &EngineOpts) -> FloodResult<Self> {
        Ok(Self::with_dispatch(
            opts.variant,
            CellDispatch::new(&opts.threading)?,
        ))
    }

    pub fn with_dispatch(variant: FloodVariant, dispatch: CellDispatch) -> Self {
        Self {
            variant,
            dispatch,
            stage: Stage::Uninitialized,
            stats: PipelineStats::default(),
            buffers: None,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    pub fn dims(&self) -> Option<(u32, u32)> {
        self.buffers.as_ref().map(Buffers::dims)
    }

    pub fn dispatch(&self) -> &CellDispatch {
        &self.dispatch
    }

    /// Pass counters of the last propagation.
    pub fn flood_stats(&self) -> Option<&FloodStats> {
        self.buffers.as_ref().map(|b| b.flood.stats())
    }

    /// Nearest-seed grid of the last propagation.
    pub fn nearest_seeds(&self) -> Option<&CellGrid<Seed>> {
        self.buffers.as_ref().map(|b| b.flood.result())
    }

    /// Decoded scalar field of the last distance, skeleton or bevel run.
    pub fn field(&self) -> Option<&CellGrid<f32>> {
        self.buffers.as_ref().map(|b| &b.field)
    }

    /// Decoded directions of the last straight-skeleton run.
    pub fn directions(&self) -> Option<&CellGrid<Direction>> {
        self.buffers.as_ref().map(|b| &b.directions)
    }

    /// Cell labels of the last skeleton or straight-skeleton run.
    pub fn classes(&self) -> Option<&CellGrid<CellClass>> {
        self.buffers.as_ref().map(|b| &b.classes)
    }

    /// Drop all grids. The next run allocates again.
    pub fn reset(&mut self) {
        self.buffers = None;
        self.stage = Stage::Uninitialized;
    }

    /// Run whichever effect `params` describes.
    pub fn apply(
        &mut self,
        mask: &CellGrid<f32>,
        params: &EffectParams,
    ) -> FloodResult<EffectOutput<'_>> {
        match params {
            EffectParams::Distance(p) => self.distance_field(mask, p).map(EffectOutput::Field),
            EffectParams::Skeleton(p) => self.skeleton(mask, p).map(EffectOutput::Rgba),
            EffectParams::StraightSkeleton(p) => {
                self.straight_skeleton(mask, p).map(EffectOutput::Rgba)
            }
            EffectParams::InnerBevel(p) => self.inner_bevel(mask, p).map(EffectOutput::Rgba),
        }
    }

    fn begin(&mut self, mask: &CellGrid<f32>) -> FloodResult<Run<'_>> {
        let (width, height) = mask.dims();
        if self
            .buffers
            .as_ref()
            .is_none_or(|b| b.dims() != (width, height))
        {
            tracing::debug!(width, height, "allocating pipeline grids");
            self.buffers = None;
            self.buffers = Some(Buffers::new(width, height, self.variant)?);
            self.stats.allocations += 1;
        }
        self.stats.runs += 1;
        self.stage = Stage::Allocated;

        let bufs = self
            .buffers
            .as_mut()
            .ok_or_else(|| FloodError::evaluation("pipeline grids missing after allocation"))?;
        Ok(Run {
            dispatch: &self.dispatch,
            bufs,
            stage: &mut self.stage,
        })
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("variant", &self.variant)
            .field("dispatch", &self.dispatch)
            .field("stage", &self.stage)
            .field("stats", &self.stats)
            .field("dims", &self.dims())
            .finish()
    }
}

/// Paint each cell with the colour of its class.
fn colorize(
    classes: &CellGrid<CellClass>,
    out: &mut CellGrid<Rgba>,
    colors: [Rgba; 3],
    dispatch: &CellDispatch,
) {
    let [background, foreground, skeleton] = colors;
    dispatch.run(Kernel::Colorize, out, |x, y| match classes.at(x, y) {
        CellClass::Background => background,
        CellClass::Foreground => foreground,
        CellClass::Skeleton => skeleton,
    });
}
