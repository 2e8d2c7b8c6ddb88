use crate::foundation::error::{FloodError, FloodResult};

/// Dense row-major `width × height` array of fixed-size cell records.
///
/// Every grid is non-empty; constructors reject zero dimensions.
#[derive(Clone, Debug, PartialEq)]
pub struct CellGrid<T> {
    width: u32,
    height: u32,
    cells: Vec<T>,
}

impl<T: Copy> CellGrid<T> {
    /// Allocate a grid with every cell set to `fill`.
    pub fn new(width: u32, height: u32, fill: T) -> FloodResult<Self> {
        let len = cell_count(width, height)?;
        Ok(Self {
            width,
            height,
            cells: vec![fill; len],
        })
    }

    /// Wrap an existing row-major cell vector.
    pub fn from_vec(width: u32, height: u32, cells: Vec<T>) -> FloodResult<Self> {
        let len = cell_count(width, height)?;
        if cells.len() != len {
            return Err(FloodError::validation(format!(
                "grid {width}x{height} expects {len} cells, got {}",
                cells.len()
            )));
        }
        Ok(Self {
            width,
            height,
            cells,
        })
    }

    /// Build a grid by evaluating `f(x, y)` for every cell in row-major order.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> T) -> FloodResult<Self> {
        let len = cell_count(width, height)?;
        let mut cells = Vec::with_capacity(len);
        for y in 0..height {
            for x in 0..width {
                cells.push(f(x, y));
            }
        }
        Ok(Self {
            width,
            height,
            cells,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dims(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn cells(&self) -> &[T] {
        &self.cells
    }

    pub fn cells_mut(&mut self) -> &mut [T] {
        &mut self.cells
    }

    /// Cell at `(x, y)`. Panics when out of bounds.
    #[inline]
    pub fn at(&self, x: u32, y: u32) -> T {
        debug_assert!(x < self.width && y < self.height);
        self.cells[(y as usize) * (self.width as usize) + (x as usize)]
    }

    /// Bounds-checked access with signed coordinates; out-of-grid reads return `None`.
    #[inline]
    pub fn get(&self, x: i64, y: i64) -> Option<T> {
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            return None;
        }
        Some(self.cells[(y as usize) * (self.width as usize) + (x as usize)])
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, value: T) {
        let idx = (y as usize) * (self.width as usize) + (x as usize);
        self.cells[idx] = value;
    }

    /// Copy every cell of `src` into `self`.
    pub fn copy_from(&mut self, src: &CellGrid<T>) -> FloodResult<()> {
        ensure_same_dims("CellGrid::copy_from", self, src)?;
        self.cells.copy_from_slice(&src.cells);
        Ok(())
    }

    /// Horizontal reflection (`x → width - 1 - x`).
    pub fn mirrored_x(&self) -> Self {
        let w = self.width as usize;
        let mut cells = Vec::with_capacity(self.cells.len());
        for row in self.cells.chunks_exact(w) {
            cells.extend(row.iter().rev().copied());
        }
        Self {
            width: self.width,
            height: self.height,
            cells,
        }
    }

    /// Vertical reflection (`y → height - 1 - y`).
    pub fn mirrored_y(&self) -> Self {
        let w = self.width as usize;
        let mut cells = Vec::with_capacity(self.cells.len());
        for row in self.cells.chunks_exact(w).rev() {
            cells.extend_from_slice(row);
        }
        Self {
            width: self.width,
            height: self.height,
            cells,
        }
    }
}

/// Fail with [`FloodError::DimensionMismatch`] unless both grids share `(width, height)`.
pub fn ensure_same_dims<A, B>(
    context: &'static str,
    expected: &CellGrid<A>,
    actual: &CellGrid<B>,
) -> FloodResult<()> {
    let e = (expected.width, expected.height);
    let a = (actual.width, actual.height);
    if e != a {
        return Err(FloodError::dimension_mismatch(context, e, a));
    }
    Ok(())
}

fn cell_count(width: u32, height: u32) -> FloodResult<usize> {
    if width == 0 || height == 0 {
        return Err(FloodError::validation(format!(
            "grid dimensions must be > 0, got {width}x{height}"
        )));
    }
    (width as usize)
        .checked_mul(height as usize)
        .ok_or_else(|| FloodError::validation("grid size overflow"))
}

/// Nearest-known-seed record stored per cell during propagation.
///
/// Coordinates live in the grid's own cell space; with subpixel encoding they carry a
/// fractional offset of at most half a cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Seed {
    pub x: f32,
    pub y: f32,
}

impl Seed {
    /// No seed reachable yet.
    pub const NONE: Seed = Seed {
        x: f32::NEG_INFINITY,
        y: f32::NEG_INFINITY,
    };

    pub fn at(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn is_none(self) -> bool {
        !self.x.is_finite()
    }

    #[inline]
    pub fn is_some(self) -> bool {
        self.x.is_finite()
    }

    /// Squared distance from cell position `(px, py)`; `+∞` for [`Seed::NONE`].
    #[inline]
    pub fn dist2(self, px: f32, py: f32) -> f32 {
        if self.is_none() {
            return f32::INFINITY;
        }
        let dx = self.x - px;
        let dy = self.y - py;
        dx * dx + dy * dy
    }
}

impl Default for Seed {
    fn default() -> Self {
        Self::NONE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sized_grids_are_rejected() {
        assert!(matches!(
            CellGrid::new(0, 4, 0.0f32),
            Err(FloodError::Validation(_))
        ));
        assert!(matches!(
            CellGrid::new(4, 0, 0.0f32),
            Err(FloodError::Validation(_))
        ));
    }

    #[test]
    fn from_vec_checks_length() {
        assert!(CellGrid::from_vec(2, 2, vec![0u8; 3]).is_err());
        let g = CellGrid::from_vec(2, 2, vec![1u8, 2, 3, 4]).unwrap();
        assert_eq!(g.at(1, 1), 4);
        assert_eq!(g.at(0, 1), 3);
    }

    #[test]
    fn get_returns_none_outside_bounds() {
        let g = CellGrid::new(3, 2, 7u8).unwrap();
        assert_eq!(g.get(2, 1), Some(7));
        assert_eq!(g.get(-1, 0), None);
        assert_eq!(g.get(3, 0), None);
        assert_eq!(g.get(0, 2), None);
    }

    #[test]
    fn copy_from_rejects_mismatched_dims() {
        let mut a = CellGrid::new(3, 2, 0u8).unwrap();
        let b = CellGrid::new(2, 3, 1u8).unwrap();
        assert!(matches!(
            a.copy_from(&b),
            Err(FloodError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn mirrors_reverse_the_right_axis() {
        let g = CellGrid::from_fn(3, 2, |x, y| x + 10 * y).unwrap();
        assert_eq!(g.mirrored_x().cells(), &[2, 1, 0, 12, 11, 10]);
        assert_eq!(g.mirrored_y().cells(), &[10, 11, 12, 0, 1, 2]);
    }

    #[test]
    fn none_seed_is_infinitely_far() {
        assert!(Seed::NONE.is_none());
        assert_eq!(Seed::NONE.dist2(0.0, 0.0), f32::INFINITY);
        assert_eq!(Seed::at(3.0, 4.0).dist2(0.0, 0.0), 25.0);
    }
}
