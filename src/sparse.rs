//! Sparse coverage masks stored as runs of 4x4 patches, and boolean algebra over them
//!
//! A sparse mask is either a literal rectangle or a [`PatchList`]: a sequence of
//! horizontal runs of identical 4x4 coverage blocks sorted by `(y, x)` in the
//! patch grid. All-zero blocks are never stored, so combining masks only ever
//! touches the blocks that carry coverage.
use crate::{BBox, DenseMask, Error, IntRect, Scalar};
use bytemuck::{Pod, Zeroable};
use std::{cmp::Ordering, fmt};

/// Size of the side of a patch in pixels
pub const PATCH_SIZE: i32 = 4;

/// Coverage of a 4x4 block of pixels in row-major order
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Pod, Zeroable)]
#[repr(C, align(8))]
pub struct PatchData(pub [u8; 16]);

impl PatchData {
    pub const ZERO: Self = Self([0; 16]);
    pub const FULL: Self = Self([255; 16]);

    pub fn is_zero(&self) -> bool {
        let words: [u64; 2] = bytemuck::cast(self.0);
        words == [0, 0]
    }

    /// Coverage of the pixel at `(x, y)` relative to the patch corner
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.0[y * PATCH_SIZE as usize + x]
    }

    /// Combine coverage of two blocks pixel by pixel
    pub fn combine(&self, other: &Self, op: MaskOp) -> Self {
        Self(std::array::from_fn(|index| {
            op.coverage_op(self.0[index], other.0[index])
        }))
    }
}

impl fmt::Debug for PatchData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PatchData(")?;
        for (index, row) in self.0.chunks(PATCH_SIZE as usize).enumerate() {
            if index != 0 {
                write!(f, " ")?;
            }
            for value in row {
                write!(f, "{:02x}", value)?;
            }
        }
        write!(f, ")")
    }
}

/// Run of `len` identical patches starting at `(x, y)` in the patch grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Patch {
    pub x: i32,
    pub y: i32,
    pub len: u32,
    /// Index of the patch data inside of the owning [`PatchList`]
    pub data: u32,
}

impl Patch {
    #[inline]
    fn x_end(&self) -> i32 {
        self.x + self.len as i32
    }
}

/// Patch runs sorted by `(y, x)`, never overlapping and never holding all-zero data
#[derive(Clone, Default)]
pub struct PatchList {
    patches: Vec<Patch>,
    data: Vec<PatchData>,
    /// Bounds in patch units
    bounds: IntRect,
}

impl PatchList {
    pub fn patches(&self) -> &[Patch] {
        &self.patches
    }

    /// Coverage data of the run
    pub fn data(&self, patch: &Patch) -> &PatchData {
        &self.data[patch.data as usize]
    }

    /// Number of distinct data entries stored
    pub fn data_len(&self) -> usize {
        self.data.len()
    }

    /// Bounds in patch units
    pub fn bounds(&self) -> IntRect {
        self.bounds
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    /// Iterate over individual patches as `(x, y, data)`
    pub fn blocks(&self) -> impl Iterator<Item = (i32, i32, &PatchData)> + '_ {
        self.patches.iter().flat_map(move |patch| {
            let data = self.data(patch);
            (patch.x..patch.x_end()).map(move |x| (x, patch.y, data))
        })
    }
}

impl PartialEq for PatchList {
    fn eq(&self, other: &Self) -> bool {
        self.bounds == other.bounds && self.blocks().eq(other.blocks())
    }
}

impl Eq for PatchList {}

impl fmt::Debug for PatchList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "PatchList {:?}", self.bounds)?;
        for patch in self.patches.iter() {
            writeln!(
                f,
                "  x={} y={} len={} {:?}",
                patch.x,
                patch.y,
                patch.len,
                self.data(patch)
            )?;
        }
        Ok(())
    }
}

/// Builds [`PatchList`] from runs added in `(y, x)` order
///
/// Runs adjacent to the previous one with identical data extend it instead
/// of starting a new run, and the previous data entry is reused when equal.
#[derive(Debug, Default)]
pub struct PatchMerger {
    list: PatchList,
}

impl PatchMerger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add run of `len` patches at `(x, y)`, all-zero data is skipped
    pub fn add(&mut self, x: i32, y: i32, len: u32, data: PatchData) -> Result<(), Error> {
        if len == 0 || data.is_zero() {
            return Ok(());
        }
        let list = &mut self.list;
        let rect = IntRect::new(x, y, x + len as i32, y + 1);
        if let Some(last) = list.patches.last_mut() {
            debug_assert!(
                (last.y, last.x_end()) <= (y, x),
                "patches must be added in (y, x) order: ({}, {}) after ({}, {})",
                y,
                x,
                last.y,
                last.x_end(),
            );
            if last.y == y && last.x_end() == x && list.data[last.data as usize] == data {
                last.len += len;
                list.bounds = list.bounds.union(rect);
                return Ok(());
            }
        }
        let index = match list.data.last() {
            Some(last) if *last == data => list.data.len() - 1,
            _ => {
                list.data.try_reserve(1)?;
                list.data.push(data);
                list.data.len() - 1
            }
        };
        list.patches.try_reserve(1)?;
        list.patches.push(Patch {
            x,
            y,
            len,
            data: index as u32,
        });
        list.bounds = list.bounds.union(rect);
        Ok(())
    }

    /// Copy all runs of the list
    pub fn extend(&mut self, list: &PatchList) -> Result<(), Error> {
        for patch in list.patches() {
            self.add(patch.x, patch.y, patch.len, *list.data(patch))?;
        }
        Ok(())
    }

    pub fn finish(self) -> PatchList {
        self.list
    }
}

/// Coverage mask which is either a literal rectangle or a list of patch runs
#[derive(Debug, Clone)]
pub enum SparseMask {
    Rect(BBox),
    Patches(PatchList),
}

impl Default for SparseMask {
    fn default() -> Self {
        Self::empty()
    }
}

impl SparseMask {
    pub fn empty() -> Self {
        Self::Patches(PatchList::default())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Rect(bbox) => bbox.is_empty(),
            Self::Patches(list) => list.is_empty(),
        }
    }

    /// Bounds in device pixels
    pub fn bounds(&self) -> IntRect {
        match self {
            Self::Rect(bbox) if bbox.is_empty() => IntRect::default(),
            Self::Rect(bbox) => bbox.round_out(),
            Self::Patches(list) => {
                let IntRect { x0, y0, x1, y1 } = list.bounds();
                IntRect::new(
                    x0 * PATCH_SIZE,
                    y0 * PATCH_SIZE,
                    x1 * PATCH_SIZE,
                    y1 * PATCH_SIZE,
                )
            }
        }
    }

    /// Convert to patch representation
    ///
    /// Rectangle pixel coverage is the area of overlap with the pixel.
    pub fn to_sparse(&self) -> Result<PatchList, Error> {
        let bbox = match self {
            Self::Patches(list) => return Ok(list.clone()),
            Self::Rect(bbox) if bbox.is_empty() => return Ok(PatchList::default()),
            Self::Rect(bbox) => *bbox,
        };
        let mut merger = PatchMerger::new();
        let IntRect { x0, y0, x1, y1 } = patch_grid(bbox.round_out());
        for y in y0..y1 {
            for x in x0..x1 {
                let data = PatchData(std::array::from_fn(|index| {
                    let index = index as i32;
                    rect_coverage(
                        bbox,
                        x * PATCH_SIZE + index % PATCH_SIZE,
                        y * PATCH_SIZE + index / PATCH_SIZE,
                    )
                }));
                merger.add(x, y, 1, data)?;
            }
        }
        Ok(merger.finish())
    }

    /// Materialize the part of the mask inside `bounds` as a dense mask
    pub fn to_dense(&self, bounds: IntRect) -> Result<DenseMask, Error> {
        let mut mask = DenseMask::new(bounds)?;
        match self {
            Self::Rect(bbox) => {
                if let Some(rect) = bbox.round_out().intersect(bounds) {
                    for y in rect.y0..rect.y1 {
                        for x in rect.x0..rect.x1 {
                            mask.set(x, y, rect_coverage(*bbox, x, y));
                        }
                    }
                }
            }
            Self::Patches(list) => {
                let grid = patch_grid(bounds);
                for (x, y, data) in list.blocks() {
                    if !grid.contains(x, y) {
                        continue;
                    }
                    for row in 0..PATCH_SIZE {
                        for col in 0..PATCH_SIZE {
                            mask.set(
                                x * PATCH_SIZE + col,
                                y * PATCH_SIZE + row,
                                data.get(col as usize, row as usize),
                            );
                        }
                    }
                }
            }
        }
        Ok(mask)
    }
}

impl From<BBox> for SparseMask {
    fn from(bbox: BBox) -> Self {
        Self::Rect(bbox)
    }
}

impl From<PatchList> for SparseMask {
    fn from(list: PatchList) -> Self {
        Self::Patches(list)
    }
}

impl PartialEq for SparseMask {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Patches(left), Self::Patches(right)) => left == right,
            (Self::Rect(left), Self::Rect(right)) if left == right => true,
            _ => match (self.to_sparse(), other.to_sparse()) {
                (Ok(left), Ok(right)) => left == right,
                _ => false,
            },
        }
    }
}

/// Patch grid cells overlapping pixel rectangle
fn patch_grid(rect: IntRect) -> IntRect {
    if rect.is_empty() {
        return IntRect::default();
    }
    IntRect::new(
        rect.x0.div_euclid(PATCH_SIZE),
        rect.y0.div_euclid(PATCH_SIZE),
        (rect.x1 - 1).div_euclid(PATCH_SIZE) + 1,
        (rect.y1 - 1).div_euclid(PATCH_SIZE) + 1,
    )
}

/// Coverage of the pixel `(x, y)` by the rectangle, area of overlap scaled to 255
fn rect_coverage(bbox: BBox, x: i32, y: i32) -> u8 {
    let overlap = |p: i32, min: Scalar, max: Scalar| {
        let p = p as Scalar;
        ((p + 1.0).min(max) - p.max(min)).max(0.0)
    };
    let area =
        overlap(x, bbox.min().x(), bbox.max().x()) * overlap(y, bbox.min().y(), bbox.max().y());
    (area * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Convert dense mask into patch runs
///
/// The mask is scanned in 4x4 blocks aligned to the global 4 pixel grid,
/// pixels outside of the mask bounds are treated as transparent.
pub fn sparse_mask_from_dense(mask: &DenseMask) -> Result<SparseMask, Error> {
    let bounds = mask.bounds();
    let grid = patch_grid(bounds);
    let mut merger = PatchMerger::new();
    for y in grid.y0..grid.y1 {
        let rows: [Option<&[u8]>; PATCH_SIZE as usize] =
            std::array::from_fn(|row| mask.row(y * PATCH_SIZE + row as i32));
        for x in grid.x0..grid.x1 {
            let data = PatchData(std::array::from_fn(|index| {
                let index = index as i32;
                let px = x * PATCH_SIZE + index % PATCH_SIZE;
                if px < bounds.x0 || px >= bounds.x1 {
                    return 0;
                }
                rows[(index / PATCH_SIZE) as usize]
                    .and_then(|row| row.get((px - bounds.x0) as usize).copied())
                    .unwrap_or(0)
            }));
            merger.add(x, y, 1, data)?;
        }
    }
    let list = merger.finish();
    tracing::debug!(
        "[sparse_mask_from_dense] {}x{} -> {} runs, {} blocks",
        bounds.width(),
        bounds.height(),
        list.patches().len(),
        list.data_len(),
    );
    Ok(SparseMask::Patches(list))
}

/// Boolean operator combining two masks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MaskOp {
    And,
    Or,
    Xor,
    AndNot,
}

impl MaskOp {
    /// Operator applied to pixel membership
    pub fn apply(self, left: bool, right: bool) -> bool {
        match self {
            MaskOp::And => left && right,
            MaskOp::Or => left || right,
            MaskOp::Xor => left != right,
            MaskOp::AndNot => left && !right,
        }
    }

    /// Operator applied to pixel coverage
    pub fn coverage_op(self, left: u8, right: u8) -> u8 {
        match self {
            MaskOp::And => left.min(right),
            MaskOp::Or => left.max(right),
            MaskOp::Xor => left.abs_diff(right),
            MaskOp::AndNot => left.saturating_sub(right),
        }
    }

    /// Regions covered only by the left operand are kept
    fn single_left(self) -> bool {
        self.apply(true, false)
    }

    /// Regions covered only by the right operand are kept
    fn single_right(self) -> bool {
        self.apply(false, true)
    }
}

/// Combine two masks with boolean operator
pub fn mask_op(op: MaskOp, left: &SparseMask, right: &SparseMask) -> Result<SparseMask, Error> {
    if left.is_empty() && right.is_empty() {
        return Ok(SparseMask::empty());
    }
    match (left, right) {
        (SparseMask::Rect(l), SparseMask::Rect(r)) => {
            if let Some(result) = rect_op(op, *l, *r) {
                return Ok(result);
            }
            let left = SparseMask::Patches(left.to_sparse()?);
            let right = SparseMask::Patches(right.to_sparse()?);
            mask_op(op, &left, &right)
        }
        (SparseMask::Rect(_), _) => mask_op(op, &SparseMask::Patches(left.to_sparse()?), right),
        (_, SparseMask::Rect(_)) => mask_op(op, left, &SparseMask::Patches(right.to_sparse()?)),
        (SparseMask::Patches(l), SparseMask::Patches(r)) => {
            let list = if left.bounds().intersect(right.bounds()).is_none() {
                disjoint_op(op, l, r)?
            } else {
                patch_op(op, l, r)?
            };
            Ok(SparseMask::Patches(list))
        }
    }
}

/// Combine masks without any common patches
fn disjoint_op(op: MaskOp, left: &PatchList, right: &PatchList) -> Result<PatchList, Error> {
    match (op.single_left(), op.single_right()) {
        (false, false) => Ok(PatchList::default()),
        (true, false) => Ok(left.clone()),
        (false, true) => Ok(right.clone()),
        (true, true) => {
            // rows can interleave even if bounds do not intersect
            if right.bounds().y0 < left.bounds().y1 && left.bounds().y0 < right.bounds().y1 {
                return patch_op(op, left, right);
            }
            let (first, second) = if left.bounds().y0 < right.bounds().y0 {
                (left, right)
            } else {
                (right, left)
            };
            let mut merger = PatchMerger::new();
            merger.extend(first)?;
            merger.extend(second)?;
            Ok(merger.finish())
        }
    }
}

/// Cursor over the remaining part of the patch runs
struct RunCursor<'a> {
    list: &'a PatchList,
    index: usize,
    offset: u32,
}

impl<'a> RunCursor<'a> {
    fn new(list: &'a PatchList) -> Self {
        Self {
            list,
            index: 0,
            offset: 0,
        }
    }

    /// Remaining part of the current run as `(x, y, len, data)`
    fn current(&self) -> Option<(i32, i32, u32, &'a PatchData)> {
        let patch = self.list.patches.get(self.index)?;
        Some((
            patch.x + self.offset as i32,
            patch.y,
            patch.len - self.offset,
            self.list.data(patch),
        ))
    }

    fn advance(&mut self, len: u32) {
        if let Some(patch) = self.list.patches.get(self.index) {
            self.offset += len;
            if self.offset >= patch.len {
                self.index += 1;
                self.offset = 0;
            }
        }
    }
}

/// Merge-join of two patch lists
fn patch_op(op: MaskOp, left: &PatchList, right: &PatchList) -> Result<PatchList, Error> {
    let single_left = op.single_left();
    let single_right = op.single_right();
    let mut merger = PatchMerger::new();
    let mut lefts = RunCursor::new(left);
    let mut rights = RunCursor::new(right);
    loop {
        match (lefts.current(), rights.current()) {
            (None, None) => break,
            (Some((x, y, len, data)), None) => {
                if !single_left {
                    break;
                }
                merger.add(x, y, len, *data)?;
                lefts.advance(len);
            }
            (None, Some((x, y, len, data))) => {
                if !single_right {
                    break;
                }
                merger.add(x, y, len, *data)?;
                rights.advance(len);
            }
            (Some((lx, ly, llen, ldata)), Some((rx, ry, rlen, rdata))) => {
                match (ly, lx).cmp(&(ry, rx)) {
                    Ordering::Less => {
                        // left only part ends where the right run starts
                        let len = if ly == ry {
                            llen.min((rx - lx) as u32)
                        } else {
                            llen
                        };
                        if single_left {
                            merger.add(lx, ly, len, *ldata)?;
                        }
                        lefts.advance(len);
                    }
                    Ordering::Greater => {
                        let len = if ly == ry {
                            rlen.min((lx - rx) as u32)
                        } else {
                            rlen
                        };
                        if single_right {
                            merger.add(rx, ry, len, *rdata)?;
                        }
                        rights.advance(len);
                    }
                    Ordering::Equal => {
                        let len = llen.min(rlen);
                        merger.add(lx, ly, len, ldata.combine(rdata, op))?;
                        lefts.advance(len);
                        rights.advance(len);
                    }
                }
            }
        }
    }
    Ok(merger.finish())
}

/// Closed form operation on two rectangles, `None` if the result is not a rectangle
fn rect_op(op: MaskOp, left: BBox, right: BBox) -> Option<SparseMask> {
    let keep = |keep: bool, bbox: BBox| {
        if keep {
            SparseMask::Rect(bbox)
        } else {
            SparseMask::empty()
        }
    };
    match (left.is_empty(), right.is_empty()) {
        (true, true) => return Some(SparseMask::empty()),
        (true, false) => return Some(keep(op.single_right(), right)),
        (false, true) => return Some(keep(op.single_left(), left)),
        (false, false) => {}
    }
    // partial coverage does not compose as area
    if !left.is_pixel_aligned() || !right.is_pixel_aligned() {
        return None;
    }
    let overlap = left.intersect(right).filter(|bbox| !bbox.is_empty());
    match op {
        MaskOp::And => Some(overlap.map_or_else(SparseMask::empty, SparseMask::Rect)),
        MaskOp::Or => {
            if left.contains_bbox(right) {
                Some(SparseMask::Rect(left))
            } else if right.contains_bbox(left) {
                Some(SparseMask::Rect(right))
            } else {
                rect_union(left, right).map(SparseMask::Rect)
            }
        }
        MaskOp::Xor => match overlap {
            None => rect_union(left, right).map(SparseMask::Rect),
            Some(_) => rect_xor(left, right),
        },
        MaskOp::AndNot => match overlap {
            None => Some(SparseMask::Rect(left)),
            Some(overlap) => rect_difference(left, overlap),
        },
    }
}

/// Union of rectangles sharing a full side and touching or overlapping along the other axis
fn rect_union(left: BBox, right: BBox) -> Option<BBox> {
    let (lmin, lmax) = (left.min(), left.max());
    let (rmin, rmax) = (right.min(), right.max());
    let same_x = lmin.x() == rmin.x() && lmax.x() == rmax.x();
    let same_y = lmin.y() == rmin.y() && lmax.y() == rmax.y();
    let touch_y = lmin.y() <= rmax.y() && rmin.y() <= lmax.y();
    let touch_x = lmin.x() <= rmax.x() && rmin.x() <= lmax.x();
    ((same_x && touch_y) || (same_y && touch_x)).then(|| left.union(right))
}

/// Symmetric difference of overlapping rectangles, if it consists of at most one rectangle
fn rect_xor(left: BBox, right: BBox) -> Option<SparseMask> {
    let (lmin, lmax) = (left.min(), left.max());
    let (rmin, rmax) = (right.min(), right.max());
    // pieces left after removing the common interval
    let pieces = |l0: Scalar, l1: Scalar, r0: Scalar, r1: Scalar| {
        [(l0.min(r0), l0.max(r0)), (l1.min(r1), l1.max(r1))]
    };
    let rect_from = |pieces: [(Scalar, Scalar); 2], build: &dyn Fn(Scalar, Scalar) -> BBox| {
        let mut pieces = pieces.into_iter().filter(|(lo, hi)| hi > lo);
        match (pieces.next(), pieces.next()) {
            (None, _) => Some(SparseMask::empty()),
            (Some((lo, hi)), None) => Some(SparseMask::Rect(build(lo, hi))),
            (Some(_), Some(_)) => None,
        }
    };
    if lmin.x() == rmin.x() && lmax.x() == rmax.x() {
        let pieces = pieces(lmin.y(), lmax.y(), rmin.y(), rmax.y());
        rect_from(pieces, &|y0, y1| BBox::new((lmin.x(), y0), (lmax.x(), y1)))
    } else if lmin.y() == rmin.y() && lmax.y() == rmax.y() {
        let pieces = pieces(lmin.x(), lmax.x(), rmin.x(), rmax.x());
        rect_from(pieces, &|x0, x1| BBox::new((x0, lmin.y()), (x1, lmax.y())))
    } else {
        None
    }
}

/// Remove `overlap`, which lies inside of `left`, if the rest is a single rectangle
fn rect_difference(left: BBox, overlap: BBox) -> Option<SparseMask> {
    let (lmin, lmax) = (left.min(), left.max());
    let (omin, omax) = (overlap.min(), overlap.max());
    let full_x = omin.x() == lmin.x() && omax.x() == lmax.x();
    let full_y = omin.y() == lmin.y() && omax.y() == lmax.y();
    match (full_x, full_y) {
        (true, true) => Some(SparseMask::empty()),
        (true, false) if omin.y() == lmin.y() => {
            Some(SparseMask::Rect(BBox::new((lmin.x(), omax.y()), lmax)))
        }
        (true, false) if omax.y() == lmax.y() => {
            Some(SparseMask::Rect(BBox::new(lmin, (lmax.x(), omin.y()))))
        }
        (false, true) if omin.x() == lmin.x() => {
            Some(SparseMask::Rect(BBox::new((omax.x(), lmin.y()), lmax)))
        }
        (false, true) if omax.x() == lmax.x() => {
            Some(SparseMask::Rect(BBox::new(lmin, (omin.x(), lmax.y()))))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        FillRule, Matrix, Rasterizer, RasterizerConfig, rasterize::tests::random_path,
        utils::tests::init_tracing,
    };
    use rand::{SeedableRng, rngs::StdRng};

    const OPS: [MaskOp; 4] = [MaskOp::And, MaskOp::Or, MaskOp::Xor, MaskOp::AndNot];

    fn random_masks(seed: u64, count: usize) -> Result<Vec<DenseMask>, Error> {
        let rasterizer = Rasterizer::new(RasterizerConfig::single_threaded());
        let mut rng = StdRng::seed_from_u64(seed);
        let clip = BBox::new((-100.0, -100.0), (100.0, 100.0));
        (0..count)
            .map(|index| {
                let path = random_path(&mut rng, 40.0);
                // odd masks are shifted off the patch grid and into negative coordinates
                let matrix = if index % 2 == 1 {
                    Matrix::identity().translate(-13.0, -7.0)
                } else {
                    Matrix::identity()
                };
                rasterizer.rasterize_path(&path, matrix, FillRule::NonZero, clip)
            })
            .collect()
    }

    fn rect(x0: Scalar, y0: Scalar, x1: Scalar, y1: Scalar) -> SparseMask {
        SparseMask::Rect(BBox::new((x0, y0), (x1, y1)))
    }

    fn patch(value: u8) -> PatchData {
        PatchData([value; 16])
    }

    #[test]
    fn test_patch_data() {
        assert!(PatchData::ZERO.is_zero());
        assert!(!PatchData::FULL.is_zero());
        let mut data = PatchData::ZERO;
        data.0[15] = 1;
        assert!(!data.is_zero());
        assert_eq!(data.get(3, 3), 1);
        assert_eq!(std::mem::align_of::<PatchData>(), 8);
        assert_eq!(patch(100).combine(&patch(30), MaskOp::AndNot), patch(70));
        assert_eq!(patch(100).combine(&patch(230), MaskOp::AndNot), PatchData::ZERO);
        assert_eq!(patch(100).combine(&patch(100), MaskOp::AndNot), PatchData::ZERO);
        assert_eq!(patch(100).combine(&patch(30), MaskOp::Xor), patch(70));
    }

    #[test]
    fn test_patch_merger() -> Result<(), Error> {
        let mut merger = PatchMerger::new();
        merger.add(0, 0, 1, patch(1))?;
        merger.add(1, 0, 1, patch(1))?;
        merger.add(2, 0, 1, PatchData::ZERO)?;
        merger.add(3, 0, 1, patch(1))?;
        merger.add(4, 0, 2, patch(2))?;
        merger.add(0, 1, 1, patch(2))?;
        let list = merger.finish();
        assert_eq!(
            list.patches(),
            &[
                Patch { x: 0, y: 0, len: 2, data: 0 },
                Patch { x: 3, y: 0, len: 1, data: 0 },
                Patch { x: 4, y: 0, len: 2, data: 1 },
                Patch { x: 0, y: 1, len: 1, data: 1 },
            ]
        );
        assert_eq!(list.data_len(), 2);
        assert_eq!(list.bounds(), IntRect::new(0, 0, 6, 2));
        assert_eq!(list.blocks().count(), 6);
        Ok(())
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "(y, x) order")]
    fn test_patch_merger_order() {
        let mut merger = PatchMerger::new();
        let _ = merger.add(0, 1, 1, patch(1));
        let _ = merger.add(0, 0, 1, patch(1));
    }

    #[test]
    fn test_dense_round_trip() -> Result<(), Error> {
        init_tracing();
        for mask in random_masks(3, 8)? {
            let sparse = sparse_mask_from_dense(&mask)?;
            assert_eq!(sparse.to_dense(mask.bounds())?, mask);
        }

        // uniform regions collapse into long runs
        let mut mask = DenseMask::new(IntRect::new(0, 0, 64, 8))?;
        for y in 0..8 {
            for x in 0..64 {
                mask.set(x, y, 255);
            }
        }
        let SparseMask::Patches(list) = sparse_mask_from_dense(&mask)? else {
            panic!("patches expected");
        };
        assert_eq!(list.patches().len(), 2);
        assert_eq!(list.data_len(), 1);
        assert_eq!(sparse_mask_from_dense(&DenseMask::empty())?, SparseMask::empty());
        Ok(())
    }

    #[test]
    fn test_rect_to_sparse() -> Result<(), Error> {
        let mask = rect(0.5, 0.0, 2.0, 1.0);
        let dense = mask.to_dense(IntRect::new(0, 0, 4, 4))?;
        assert_eq!(dense.get(0, 0), 128);
        assert_eq!(dense.get(1, 0), 255);
        assert_eq!(dense.get(2, 0), 0);
        assert_eq!(dense.get(1, 1), 0);

        let list = rect(2.0, 2.0, 30.0, 6.0).to_sparse()?;
        assert_eq!(list.bounds(), IntRect::new(0, 0, 8, 2));
        let bounds = IntRect::new(0, 0, 32, 8);
        assert_eq!(
            SparseMask::Patches(list).to_dense(bounds)?,
            rect(2.0, 2.0, 30.0, 6.0).to_dense(bounds)?
        );
        assert_eq!(rect(2.0, 2.0, 30.0, 6.0).bounds(), IntRect::new(2, 2, 30, 6));
        assert!(rect(1.0, 1.0, 1.0, 5.0).is_empty());
        Ok(())
    }

    #[test]
    fn test_identities() -> Result<(), Error> {
        let empty = SparseMask::empty();
        for mask in random_masks(5, 6)? {
            let a = sparse_mask_from_dense(&mask)?;
            assert_eq!(mask_op(MaskOp::And, &a, &a)?, a);
            assert_eq!(mask_op(MaskOp::Or, &a, &a)?, a);
            assert!(mask_op(MaskOp::Xor, &a, &a)?.is_empty());
            assert!(mask_op(MaskOp::AndNot, &a, &a)?.is_empty());
            assert_eq!(mask_op(MaskOp::Or, &a, &empty)?, a);
            assert_eq!(mask_op(MaskOp::Or, &empty, &a)?, a);
            assert_eq!(mask_op(MaskOp::Xor, &a, &empty)?, a);
            assert_eq!(mask_op(MaskOp::AndNot, &a, &empty)?, a);
            assert!(mask_op(MaskOp::And, &a, &empty)?.is_empty());
            assert!(mask_op(MaskOp::AndNot, &empty, &a)?.is_empty());
        }
        assert!(mask_op(MaskOp::Or, &empty, &empty)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_dense_agreement() -> Result<(), Error> {
        let masks = random_masks(7, 6)?;
        for (left, right) in masks.iter().zip(masks.iter().skip(1)) {
            let sparse_left = sparse_mask_from_dense(left)?;
            let sparse_right = sparse_mask_from_dense(right)?;
            let bounds = left.bounds().union(right.bounds());
            for op in OPS {
                let result = mask_op(op, &sparse_left, &sparse_right)?.to_dense(bounds)?;
                for y in bounds.y0..bounds.y1 {
                    for x in bounds.x0..bounds.x1 {
                        assert_eq!(
                            result.get(x, y),
                            op.coverage_op(left.get(x, y), right.get(x, y)),
                            "{:?} at ({}, {})",
                            op,
                            x,
                            y
                        );
                    }
                }
            }
            assert_eq!(
                mask_op(MaskOp::And, &sparse_left, &sparse_right)?,
                mask_op(MaskOp::And, &sparse_right, &sparse_left)?
            );
        }
        Ok(())
    }

    #[test]
    fn test_rect_ops() -> Result<(), Error> {
        let a = rect(0.0, 0.0, 8.0, 8.0);
        let below = rect(0.0, 8.0, 8.0, 12.0);
        let inner = rect(2.0, 2.0, 4.0, 4.0);
        let top = rect(0.0, 0.0, 8.0, 3.0);
        let shifted = rect(4.0, 4.0, 12.0, 12.0);

        let check = |op, left: &SparseMask, right: &SparseMask, expected: Option<SparseMask>| {
            let result = mask_op(op, left, right)?;
            if let Some(expected) = expected {
                assert!(
                    matches!(result, SparseMask::Rect(_)) || result.is_empty(),
                    "{:?} {:?}",
                    op,
                    result
                );
                assert_eq!(result, expected, "{:?}", op);
            }
            // closed forms agree with the patch algebra
            let bounds = IntRect::new(-4, -4, 16, 16);
            let expected = patch_op(op, &left.to_sparse()?, &right.to_sparse()?)?;
            assert_eq!(
                result.to_dense(bounds)?,
                SparseMask::Patches(expected).to_dense(bounds)?,
                "{:?}",
                op
            );
            Ok::<_, Error>(())
        };

        check(MaskOp::And, &a, &shifted, Some(rect(4.0, 4.0, 8.0, 8.0)))?;
        check(MaskOp::And, &a, &below, Some(SparseMask::empty()))?;
        check(MaskOp::Or, &a, &below, Some(rect(0.0, 0.0, 8.0, 12.0)))?;
        check(MaskOp::Or, &a, &inner, Some(a.clone()))?;
        check(MaskOp::Or, &a, &shifted, None)?;
        check(MaskOp::Xor, &a, &top, Some(rect(0.0, 3.0, 8.0, 8.0)))?;
        check(MaskOp::Xor, &a, &below, Some(rect(0.0, 0.0, 8.0, 12.0)))?;
        check(MaskOp::Xor, &a, &inner, None)?;
        check(MaskOp::AndNot, &a, &top, Some(rect(0.0, 3.0, 8.0, 8.0)))?;
        check(MaskOp::AndNot, &a, &below, Some(a.clone()))?;
        check(MaskOp::AndNot, &inner, &a, Some(SparseMask::empty()))?;
        check(MaskOp::AndNot, &a, &inner, None)?;
        check(MaskOp::AndNot, &a, &shifted, None)?;

        // partially covered pixels go through patches
        let half = rect(0.5, 0.0, 8.0, 8.0);
        let result = mask_op(MaskOp::And, &half, &a)?;
        assert!(matches!(result, SparseMask::Patches(_)));
        assert_eq!(result, half);
        Ok(())
    }

    #[test]
    fn test_disjoint() -> Result<(), Error> {
        let left = SparseMask::Patches(rect(0.0, 0.0, 8.0, 8.0).to_sparse()?);
        let right = SparseMask::Patches(rect(16.0, 4.0, 24.0, 12.0).to_sparse()?);
        let under = SparseMask::Patches(rect(0.0, 16.0, 8.0, 20.0).to_sparse()?);
        assert!(mask_op(MaskOp::And, &left, &right)?.is_empty());
        assert_eq!(mask_op(MaskOp::AndNot, &left, &right)?, left);
        for op in [MaskOp::Or, MaskOp::Xor] {
            for other in [&right, &under] {
                let bounds = IntRect::new(0, 0, 24, 20);
                let result = mask_op(op, other, &left)?.to_dense(bounds)?;
                let (left, other) = (left.to_dense(bounds)?, other.to_dense(bounds)?);
                for y in bounds.y0..bounds.y1 {
                    for x in bounds.x0..bounds.x1 {
                        let expected = left.get(x, y).max(other.get(x, y));
                        assert_eq!(result.get(x, y), expected);
                    }
                }
            }
        }
        Ok(())
    }
}
