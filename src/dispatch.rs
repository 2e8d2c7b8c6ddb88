use rayon::prelude::*;

use crate::{
    foundation::error::{FloodError, FloodResult},
    grid::CellGrid,
};

/// Per-cell kernels run by [`CellDispatch`].
///
/// The tag only names the dispatch for logging; the kernel body is the closure passed to
/// [`CellDispatch::run`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kernel {
    Invert,
    Contour,
    EncodeSeeds,
    Flood { step: u32 },
    Distance,
    SignedDistance,
    Direction,
    Skeleton,
    StraightSkeleton,
    Bevel,
    Colorize,
}

impl Kernel {
    pub fn name(self) -> &'static str {
        match self {
            Self::Invert => "invert",
            Self::Contour => "contour",
            Self::EncodeSeeds => "encode_seeds",
            Self::Flood { .. } => "flood",
            Self::Distance => "distance",
            Self::SignedDistance => "signed_distance",
            Self::Direction => "direction",
            Self::Skeleton => "skeleton",
            Self::StraightSkeleton => "straight_skeleton",
            Self::Bevel => "bevel",
            Self::Colorize => "colorize",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(default)]
/// Threading controls for per-cell dispatch.
pub struct Threading {
    /// Run kernels over a rayon pool when `true`.
    pub parallel: bool,
    /// Optional explicit worker thread count (parallel mode only).
    pub threads: Option<usize>,
}

/// Runs a kernel once per output cell.
///
/// [`CellDispatch::run`] returns only after every cell has been written, which is the barrier
/// between consecutive passes. Kernels only read their captured inputs and write their own cell,
/// so serial and parallel execution produce identical grids.
pub struct CellDispatch {
    pool: Option<rayon::ThreadPool>,
}

impl CellDispatch {
    pub fn serial() -> Self {
        Self { pool: None }
    }

    pub fn new(threading: &Threading) -> FloodResult<Self> {
        if !threading.parallel {
            return Ok(Self::serial());
        }
        Ok(Self {
            pool: Some(build_thread_pool(threading.threads)?),
        })
    }

    pub fn is_parallel(&self) -> bool {
        self.pool.is_some()
    }

    /// Invoke `f(x, y)` for every cell of `out`, storing the result in that cell.
    pub fn run<T, F>(&self, kernel: Kernel, out: &mut CellGrid<T>, f: F)
    where
        T: Copy + Send,
        F: Fn(u32, u32) -> T + Sync,
    {
        let (width, height) = out.dims();
        tracing::trace!(kernel = kernel.name(), width, height, "dispatch");

        let w = width as usize;
        let fill_row = |y: usize, row: &mut [T]| {
            for (x, cell) in row.iter_mut().enumerate() {
                *cell = f(x as u32, y as u32);
            }
        };

        match &self.pool {
            None => {
                for (y, row) in out.cells_mut().chunks_exact_mut(w).enumerate() {
                    fill_row(y, row);
                }
            }
            Some(pool) => pool.install(|| {
                out.cells_mut()
                    .par_chunks_exact_mut(w)
                    .enumerate()
                    .for_each(|(y, row)| fill_row(y, row));
            }),
        }
    }
}

impl Default for CellDispatch {
    fn default() -> Self {
        Self::serial()
    }
}

impl std::fmt::Debug for CellDispatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CellDispatch")
            .field(
                "threads",
                &self.pool.as_ref().map(rayon::ThreadPool::current_num_threads),
            )
            .finish()
    }
}

fn build_thread_pool(threads: Option<usize>) -> FloodResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(FloodError::validation(
            "dispatch threading 'threads' must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| FloodError::evaluation(format!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_dispatch_visits_every_cell_once() {
        let mut out = CellGrid::new(5, 3, (0u32, 0u32)).unwrap();
        CellDispatch::serial().run(Kernel::Invert, &mut out, |x, y| (x, y));
        for y in 0..3 {
            for x in 0..5 {
                assert_eq!(out.at(x, y), (x, y));
            }
        }
    }

    #[test]
    fn parallel_matches_serial() {
        let threading = Threading {
            parallel: true,
            threads: Some(3),
        };
        let par = CellDispatch::new(&threading).unwrap();
        assert!(par.is_parallel());

        let f = |x: u32, y: u32| ((x * 31 + y * 17) % 13) as f32 * 0.25;
        let mut a = CellGrid::new(37, 11, 0.0f32).unwrap();
        let mut b = CellGrid::new(37, 11, 0.0f32).unwrap();
        CellDispatch::serial().run(Kernel::Distance, &mut a, f);
        par.run(Kernel::Distance, &mut b, f);
        assert_eq!(a, b);
    }

    #[test]
    fn zero_threads_is_rejected() {
        let threading = Threading {
            parallel: true,
            threads: Some(0),
        };
        assert!(matches!(
            CellDispatch::new(&threading),
            Err(FloodError::Validation(_))
        ));
    }
}
