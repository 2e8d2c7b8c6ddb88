use crate::{
    dispatch::{CellDispatch, Kernel},
    foundation::{error::FloodResult, math::unit_threshold},
    grid::{CellGrid, ensure_same_dims},
};

/// Neighbourhood used to decide whether a foreground cell touches the background.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Connectivity {
    /// Edge neighbours only; yields thin, 8-connected outlines.
    #[default]
    Four,
    /// Edge and corner neighbours; yields thicker, 4-connected outlines.
    Eight,
}

const FOUR: [(i64, i64); 4] = [(0, -1), (-1, 0), (1, 0), (0, 1)];
const EIGHT: [(i64, i64); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

impl Connectivity {
    fn offsets(self) -> &'static [(i64, i64)] {
        match self {
            Self::Four => &FOUR,
            Self::Eight => &EIGHT,
        }
    }
}

/// Keep only the boundary of the `mask >= threshold` region and return its cell count.
///
/// Writes `1.0` for foreground cells with at least one background neighbour and `0.0` elsewhere.
/// Cells outside the grid count as background, so foreground touching the border is boundary.
pub fn extract_contour(
    mask: &CellGrid<f32>,
    out: &mut CellGrid<f32>,
    threshold: f32,
    connectivity: Connectivity,
    dispatch: &CellDispatch,
) -> FloodResult<usize> {
    ensure_same_dims("extract_contour", mask, out)?;
    let threshold = unit_threshold(threshold);
    let offsets = connectivity.offsets();
    let is_fg = |x: i64, y: i64| mask.get(x, y).is_some_and(|v| v >= threshold);

    dispatch.run(Kernel::Contour, out, |x, y| {
        let (x, y) = (i64::from(x), i64::from(y));
        if !is_fg(x, y) {
            return 0.0;
        }
        let boundary = offsets.iter().any(|&(dx, dy)| !is_fg(x + dx, y + dy));
        if boundary { 1.0 } else { 0.0 }
    });

    Ok(out.cells().iter().filter(|&&v| v > 0.0).count())
}
