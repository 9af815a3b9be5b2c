use crate::{LineLayout, NARROW_MAX_WIDTH, TileBounds, TileDescriptor};

/// Upper bound on the number of rasterization threads
pub const MAX_THREAD_COUNT: usize = 128;

/// Rasterizer settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RasterizerConfig {
    /// Tile size used to partition the raster
    pub tile: TileDescriptor,
    /// Number of worker threads, `None` uses available parallelism
    pub thread_count: Option<usize>,
    /// Force specific line layout instead of picking one from the raster size
    pub layout: Option<LineLayout>,
    /// Minimal number of tile columns for which tiled layout is picked
    pub tiled_min_columns: u32,
}

impl Default for RasterizerConfig {
    fn default() -> Self {
        Self {
            tile: TileDescriptor::default(),
            thread_count: None,
            layout: None,
            tiled_min_columns: 32,
        }
    }
}

impl RasterizerConfig {
    /// Configuration which never spawns worker threads
    pub fn single_threaded() -> Self {
        Self {
            thread_count: Some(1),
            ..Self::default()
        }
    }

    /// Resolved number of threads, always in `[1, MAX_THREAD_COUNT]`
    pub fn thread_count(&self) -> usize {
        let count = self.thread_count.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|count| count.get())
                .unwrap_or(1)
        });
        count.clamp(1, MAX_THREAD_COUNT)
    }

    /// Line layout used to rasterize the provided tile bounds
    pub fn select_layout(&self, bounds: &TileBounds) -> LineLayout {
        // narrow records can not hold wider rasters even when forced
        match self.layout {
            Some(LineLayout::Narrow) if bounds.width > NARROW_MAX_WIDTH => LineLayout::Wide,
            Some(layout) => layout,
            None if bounds.width <= NARROW_MAX_WIDTH => LineLayout::Narrow,
            None if bounds.columns >= self.tiled_min_columns => LineLayout::Tiled,
            None => LineLayout::Wide,
        }
    }
}
