//! Tiled anti-aliased path rasterizer and sparse coverage mask algebra.
//!
//! Main features:
//!  - Paths made of lines, quadratic and cubic curves rendered with non-zero or even-odd fill rule
//!  - Exact area coverage accumulated in 24.8 fixed point, split into tiles and processed in parallel
//!  - Dense 8-bit masks and sparse masks made of 4x4 patch runs
//!  - Boolean operations (and, or, xor, and-not) on sparse masks without going through dense bitmaps
//!
#![deny(warnings)]

mod allocator;
mod color;
mod config;
mod curve;
mod error;
mod fixed;
mod geometry;
mod image;
mod linearizer;
mod lines;
mod mask;
mod path;
mod rasterize;
mod sparse;
mod threads;
mod tile;
mod utils;

pub use allocator::{
    ARENA_CHUNK_SIZE, BlockArena, BlockId, LINES_PER_BLOCK, LineBlock, LineBlockAllocator,
    LineList, LineTable,
};
pub use color::{ImageCompositor, RGBA};
pub use config::{MAX_THREAD_COUNT, RasterizerConfig};
pub use curve::{
    Axis, Cubic, Curve, CurveCuts, CurveFlattenIter, FLATNESS_TOLERANCE, FLATTEN_MAX_DEPTH, Line,
    Quad, Segment,
};
pub use error::{Error, Result};
pub use fixed::{
    F24DOT8_MASK, F24DOT8_ONE, F24DOT8_SHIFT, F24Dot8, F24Dot8Point, f24dot8_ceil, f24dot8_floor,
    f24dot8_to_scalar, scaled_to_f24dot8, to_f24dot8,
};
pub use geometry::{BBox, EPSILON, IntRect, Matrix, MatrixComplexity, Point, Scalar, scalar_fmt};
pub use image::{Image, ImageIter, ImageMut, ImageOwned, ImageRows, Shape};
pub use linearizer::StartCoverTable;
pub use lines::{LineLayout, LineRecord, LineX16Y16, LineX32Y16, NARROW_MAX_WIDTH};
pub use mask::{DenseMask, MaskCompositor};
pub use path::{FillRule, Path, PathBuilder, PathSegmentsIter, PathTag};
pub use rasterize::{
    Compositor, Geometry, MAX_RASTER_SIZE, Rasterizer, Span, area_to_alpha,
    area_to_alpha_even_odd, area_to_alpha_non_zero,
};
pub use sparse::{
    MaskOp, PATCH_SIZE, Patch, PatchData, PatchList, PatchMerger, SparseMask, mask_op,
    sparse_mask_from_dense,
};
pub use threads::{FrameMemory, TaskMemory, ThreadMemory, Threads};
pub use tile::{MAX_TILE_SIZE, MIN_TILE_SIZE, TileBounds, TileDescriptor, TileIndex};
pub use utils::{Array, ArrayIter, PARAM_EPSILON, Roots, quadratic_solve, unit_roots};
