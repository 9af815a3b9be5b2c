//! Fixed point line records stored in tile line lists
use crate::{F24Dot8, LineBlockAllocator, LineTable};

/// Storage layout of the linearized lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LineLayout {
    /// `LineX16Y16` records per tile row, raster width must not exceed `NARROW_MAX_WIDTH`
    Narrow,
    /// `LineX32Y16` records per tile row
    Wide,
    /// `LineX16Y16` records per tile with tile-local `x`, plus start cover tables
    Tiled,
}

/// Widest raster for which 24.8 `x` coordinates fit into `u16`
pub const NARROW_MAX_WIDTH: u32 = 255;

/// Line record with end points in 24.8 fixed point
///
/// `y` is relative to the top of the tile row, direction of the line
/// (up or down) is preserved.
pub trait LineRecord: Copy + Default + Send + Sync + 'static {
    fn new(x0: F24Dot8, y0: F24Dot8, x1: F24Dot8, y1: F24Dot8) -> Self;

    /// End points as `[x0, y0, x1, y1]`
    fn points(&self) -> [F24Dot8; 4];

    /// Table holding line lists of this record type
    fn table(allocator: &LineBlockAllocator) -> &LineTable<Self>;

    fn table_mut(allocator: &mut LineBlockAllocator) -> &mut LineTable<Self>;
}

/// Line with both coordinates stored as `u16`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(C)]
pub struct LineX16Y16 {
    pub x0: u16,
    pub y0: u16,
    pub x1: u16,
    pub y1: u16,
}

impl LineRecord for LineX16Y16 {
    #[inline]
    fn new(x0: F24Dot8, y0: F24Dot8, x1: F24Dot8, y1: F24Dot8) -> Self {
        debug_assert!([x0, y0, x1, y1].iter().all(|v| (0..=u16::MAX as i32).contains(v)));
        Self {
            x0: x0 as u16,
            y0: y0 as u16,
            x1: x1 as u16,
            y1: y1 as u16,
        }
    }

    #[inline]
    fn points(&self) -> [F24Dot8; 4] {
        [
            self.x0 as F24Dot8,
            self.y0 as F24Dot8,
            self.x1 as F24Dot8,
            self.y1 as F24Dot8,
        ]
    }

    fn table(allocator: &LineBlockAllocator) -> &LineTable<Self> {
        &allocator.x16y16
    }

    fn table_mut(allocator: &mut LineBlockAllocator) -> &mut LineTable<Self> {
        &mut allocator.x16y16
    }
}

/// Line with `x` stored as `i32` and `y` as `u16`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(C)]
pub struct LineX32Y16 {
    pub x0: i32,
    pub x1: i32,
    pub y0: u16,
    pub y1: u16,
}

impl LineRecord for LineX32Y16 {
    #[inline]
    fn new(x0: F24Dot8, y0: F24Dot8, x1: F24Dot8, y1: F24Dot8) -> Self {
        debug_assert!([y0, y1].iter().all(|v| (0..=u16::MAX as i32).contains(v)));
        Self {
            x0,
            x1,
            y0: y0 as u16,
            y1: y1 as u16,
        }
    }

    #[inline]
    fn points(&self) -> [F24Dot8; 4] {
        [self.x0, self.y0 as F24Dot8, self.x1, self.y1 as F24Dot8]
    }

    fn table(allocator: &LineBlockAllocator) -> &LineTable<Self> {
        &allocator.x32y16
    }

    fn table_mut(allocator: &mut LineBlockAllocator) -> &mut LineTable<Self> {
        &mut allocator.x32y16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records() {
        let line = LineX16Y16::new(0, 4096, 65280, 0);
        assert_eq!(line.points(), [0, 4096, 65280, 0]);
        let line = LineX32Y16::new(-1, 17, 1 << 30, 4096);
        assert_eq!(line.points(), [-1, 17, 1 << 30, 4096]);
        assert_eq!(std::mem::size_of::<LineX16Y16>(), 8);
        assert_eq!(std::mem::size_of::<LineX32Y16>(), 12);
    }
}
