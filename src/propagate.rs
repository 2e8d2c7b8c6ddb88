//! Jump-flood nearest-seed propagation.
//!
//! Two seed grids are used as ping-pong buffers: every pass reads `current` and writes `next`,
//! then the buffers swap. A pass never reads a cell written by itself, so the per-cell kernel can
//! run in any order (or in parallel) and still produce the same grid.

use crate::{
    dispatch::{CellDispatch, Kernel},
    foundation::{
        error::{FloodError, FloodResult},
        math::ceil_log2,
    },
    grid::{CellGrid, Seed, ensure_same_dims},
};

/// Candidate offsets, in enumeration order.
///
/// Ties between equidistant candidates keep the earliest entry in this list (and the cell's own
/// record beats all of them), which makes the result independent of execution order.
const OFFSETS: [(i64, i64); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// Step schedule flavour.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FloodVariant {
    /// Plain halving schedule.
    #[default]
    Jfa,
    /// One trailing `step = 1` refinement pass.
    OnePlusJfa,
    /// Two trailing `step = 1` refinement passes.
    OnePlusOnePlusJfa,
}

impl FloodVariant {
    pub fn refinement_passes(self) -> u32 {
        match self {
            Self::Jfa => 0,
            Self::OnePlusJfa => 1,
            Self::OnePlusOnePlusJfa => 2,
        }
    }
}

/// Steps `2^k` for `k = ⌈log2(max(w, h))⌉ - 1 ..= 0`, plus the variant's refinement passes.
pub fn step_schedule(width: u32, height: u32, variant: FloodVariant) -> Vec<u32> {
    let levels = ceil_log2(width.max(height));
    let mut steps = Vec::with_capacity((levels + variant.refinement_passes()) as usize);
    for k in (0..levels).rev() {
        steps.push(1u32 << k);
    }
    for _ in 0..variant.refinement_passes() {
        steps.push(1);
    }
    steps
}

/// Counters for the most recent propagation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FloodStats {
    /// Passes executed (one per scheduled step).
    pub passes: u32,
    /// Step size of each executed pass, in order.
    pub steps: Vec<u32>,
}

/// Owns the ping-pong seed grids for one `(width, height)` and runs jump flooding over them.
#[derive(Debug)]
pub struct JumpFlood {
    current: CellGrid<Seed>,
    next: CellGrid<Seed>,
    variant: FloodVariant,
    stats: FloodStats,
}

impl JumpFlood {
    pub fn new(width: u32, height: u32, variant: FloodVariant) -> FloodResult<Self> {
        Ok(Self {
            current: CellGrid::new(width, height, Seed::NONE)?,
            next: CellGrid::new(width, height, Seed::NONE)?,
            variant,
            stats: FloodStats::default(),
        })
    }

    pub fn dims(&self) -> (u32, u32) {
        self.current.dims()
    }

    pub fn stats(&self) -> &FloodStats {
        &self.stats
    }

    /// Propagate `seeds` and return the final nearest-seed grid.
    ///
    /// Dimensions are validated before any pass runs.
    #[tracing::instrument(skip(self, seeds, dispatch), fields(width = seeds.width(), height = seeds.height()))]
    pub fn propagate(
        &mut self,
        seeds: &CellGrid<Seed>,
        dispatch: &CellDispatch,
    ) -> FloodResult<&CellGrid<Seed>> {
        ensure_same_dims("JumpFlood::propagate", &self.current, seeds)?;
        self.current.copy_from(seeds)?;

        let (width, height) = self.dims();
        let steps = step_schedule(width, height, self.variant);
        for (pass, &step) in steps.iter().enumerate() {
            tracing::debug!(pass, step, "jump flood pass");
            flood_pass(&self.current, &mut self.next, step, dispatch)?;
            std::mem::swap(&mut self.current, &mut self.next);
        }

        self.stats = FloodStats {
            passes: u32::try_from(steps.len())
                .map_err(|_| FloodError::evaluation("pass count overflow"))?,
            steps,
        };
        Ok(&self.current)
    }

    /// Nearest-seed grid from the last propagation (the loaded seeds before any run).
    pub fn result(&self) -> &CellGrid<Seed> {
        &self.current
    }
}

/// One jump-flood pass with offset `step`: `next[c]` becomes the closest of `current[c]` and the
/// seeds stored at the eight cells `step` away. Out-of-grid candidates are skipped.
pub fn flood_pass(
    current: &CellGrid<Seed>,
    next: &mut CellGrid<Seed>,
    step: u32,
    dispatch: &CellDispatch,
) -> FloodResult<()> {
    ensure_same_dims("flood_pass", current, next)?;
    if step == 0 {
        return Err(FloodError::validation("flood_pass step must be >= 1"));
    }
    let s = i64::from(step);

    dispatch.run(Kernel::Flood { step }, next, |x, y| {
        let (px, py) = (x as f32, y as f32);
        let mut best = current.at(x, y);
        let mut best_d2 = best.dist2(px, py);

        for &(dx, dy) in &OFFSETS {
            let Some(cand) = current.get(i64::from(x) + dx * s, i64::from(y) + dy * s) else {
                continue;
            };
            if cand.is_none() {
                continue;
            }
            let d2 = cand.dist2(px, py);
            if d2 < best_d2 {
                best = cand;
                best_d2 = d2;
            }
        }
        best
    });
    Ok(())
}
