#![forbid(unsafe_code)]
//! Jump-flood distance transforms and the effects built on them.
//!
//! A mask becomes a grid of seed coordinates ([`seed`], [`contour`]), jump flooding spreads the
//! nearest seed to every cell ([`propagate`]), and decoders turn that into distance or direction
//! fields ([`decode`]). [`Pipeline`] chains these into distance-field, skeleton, straight-skeleton
//! and inner-bevel effects and reuses its grids across calls.

mod foundation;

pub mod contour;
pub mod convert;
pub mod decode;
pub mod dispatch;
pub mod effects;
pub mod grid;
pub mod propagate;
pub mod seed;

pub use contour::{Connectivity, extract_contour};
pub use convert::{MaskSource, gray8_from_field, mask_from_rgba8, rgba8_from_cells};
pub use decode::{
    DecodeOpts, Direction, decode_direction, decode_distance, decode_signed_distance,
};
pub use dispatch::{CellDispatch, Kernel, Threading};
pub use effects::{
    BevelParams, CellClass, DistanceParams, EffectOutput, EffectParams, EffectSpec, EngineOpts,
    Pipeline, PipelineStats, Rgba, SkeletonParams, Stage, StraightSkeletonParams, parse_effect,
    parse_effect_json,
};
pub use foundation::error::{FloodError, FloodResult};
pub use grid::{CellGrid, Seed, ensure_same_dims};
pub use propagate::{FloodStats, FloodVariant, JumpFlood, flood_pass, step_schedule};
pub use seed::{SeedOpts, encode_boundary_seeds, encode_seeds};
