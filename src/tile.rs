//! Tile grid covering the raster area
use crate::{Error, IntRect};

/// Index of a tile column or a tile row
pub type TileIndex = u32;

pub const MIN_TILE_SIZE: u32 = 4;
/// Tile-local 24.8 coordinates must fit into `u16` including the far edge
pub const MAX_TILE_SIZE: u32 = 128;

/// Tile dimensions in pixels, both are powers of two
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "(u32, u32)", into = "(u32, u32)"))]
pub struct TileDescriptor {
    width: u32,
    height: u32,
}

impl TileDescriptor {
    pub const T8X8: Self = Self::new_unchecked(8, 8);
    pub const T8X16: Self = Self::new_unchecked(8, 16);
    pub const T8X32: Self = Self::new_unchecked(8, 32);
    pub const T16X8: Self = Self::new_unchecked(16, 8);
    pub const T64X16: Self = Self::new_unchecked(64, 16);

    const fn new_unchecked(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Create tile descriptor, sizes must be powers of two in `[4, 128]`
    pub fn new(width: u32, height: u32) -> Result<Self, Error> {
        let valid = |size: u32| {
            size.is_power_of_two() && (MIN_TILE_SIZE..=MAX_TILE_SIZE).contains(&size)
        };
        if valid(width) && valid(height) {
            Ok(Self { width, height })
        } else {
            Err(Error::InvalidTileSize { width, height })
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn width_shift(&self) -> u32 {
        self.width.trailing_zeros()
    }

    #[inline]
    pub fn height_shift(&self) -> u32 {
        self.height.trailing_zeros()
    }
}

impl Default for TileDescriptor {
    fn default() -> Self {
        Self::T8X16
    }
}

impl TryFrom<(u32, u32)> for TileDescriptor {
    type Error = Error;

    fn try_from((width, height): (u32, u32)) -> Result<Self, Self::Error> {
        Self::new(width, height)
    }
}

impl From<TileDescriptor> for (u32, u32) {
    fn from(tile: TileDescriptor) -> Self {
        (tile.width, tile.height)
    }
}

/// Tiles covering a raster area, tile `(0, 0)` has its top-left corner at `(x, y)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileBounds {
    /// Device pixel coordinate of the left edge of the first column
    pub x: i32,
    /// Device pixel coordinate of the top edge of the first row
    pub y: i32,
    /// Raster width in pixels
    pub width: u32,
    /// Raster height in pixels
    pub height: u32,
    pub columns: TileIndex,
    pub rows: TileIndex,
    pub tile: TileDescriptor,
}

impl TileBounds {
    pub fn new(raster: IntRect, tile: TileDescriptor) -> Self {
        let width = raster.width() as u32;
        let height = raster.height() as u32;
        Self {
            x: raster.x0,
            y: raster.y0,
            width,
            height,
            columns: width.div_ceil(tile.width()),
            rows: height.div_ceil(tile.height()),
            tile,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.columns == 0 || self.rows == 0
    }

    /// Number of pixel rows in the tile row, the last row might be partial
    pub fn row_height(&self, row: TileIndex) -> u32 {
        let top = row * self.tile.height();
        self.height.saturating_sub(top).min(self.tile.height())
    }

    /// Number of pixel columns in the tile column, the last column might be partial
    pub fn column_width(&self, column: TileIndex) -> u32 {
        let left = column * self.tile.width();
        self.width.saturating_sub(left).min(self.tile.width())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor() {
        assert!(TileDescriptor::new(8, 16).is_ok());
        assert!(TileDescriptor::new(64, 16).is_ok());
        assert!(matches!(
            TileDescriptor::new(12, 16),
            Err(Error::InvalidTileSize { width: 12, .. })
        ));
        assert!(TileDescriptor::new(256, 8).is_err());
        assert!(TileDescriptor::new(8, 2).is_err());
        assert_eq!(TileDescriptor::T16X8.width_shift(), 4);
        assert_eq!(TileDescriptor::T16X8.height_shift(), 3);
    }

    #[test]
    fn test_bounds() {
        let bounds = TileBounds::new(IntRect::new(-5, 3, 20, 40), TileDescriptor::T8X16);
        assert_eq!(bounds.x, -5);
        assert_eq!(bounds.width, 25);
        assert_eq!(bounds.columns, 4);
        assert_eq!(bounds.rows, 3);
        assert_eq!(bounds.column_width(3), 1);
        assert_eq!(bounds.row_height(2), 5);
        assert_eq!(bounds.row_height(0), 16);
        assert!(TileBounds::new(IntRect::default(), TileDescriptor::T8X8).is_empty());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde() -> Result<(), Box<dyn std::error::Error>> {
        let tile: TileDescriptor = serde_json::from_str("[16, 8]")?;
        assert_eq!(tile, TileDescriptor::T16X8);
        assert_eq!(serde_json::to_string(&TileDescriptor::T64X16)?, "[64,16]");
        assert!(serde_json::from_str::<TileDescriptor>("[3, 8]").is_err());
        Ok(())
    }
}
