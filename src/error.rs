use std::collections::TryReserveError;

/// Errors produced while rasterizing paths or combining masks
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Raster target is larger than the supported maximum on its longest side
    #[error("geometry too large: {width}x{height} exceeds the limit of {limit}px")]
    GeometryTooLarge {
        width: usize,
        height: usize,
        limit: usize,
    },
    /// Transformed path contains NaN or infinite coordinate
    #[error("path point {index} is not finite after transformation")]
    NonFiniteCoordinate { index: usize },
    /// Path tags and points do not agree with each other
    #[error("invalid path: {reason}")]
    InvalidPath { reason: String },
    /// Tile dimensions must be powers of two in the supported range
    #[error("invalid tile size {width}x{height}")]
    InvalidTileSize { width: u32, height: u32 },
    /// Failed to reserve memory for arenas, scratch buffers or mask storage
    #[error("out of memory: {0}")]
    OutOfMemory(#[from] TryReserveError),
    /// Failed to spawn worker threads
    #[error("failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[cfg(feature = "png")]
    #[error("failed to encode png: {0}")]
    Png(#[from] png::EncodingError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
