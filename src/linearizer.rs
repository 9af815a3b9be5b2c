//! Conversion of path geometry into monotonic 24.8 fixed point lines
//!
//! Lines are distributed into per tile-row lists (narrow and wide layouts) or
//! per tile lists (tiled layout). The tiled layout additionally records how much
//! cover every line contributes to the tiles on its right in a `StartCoverTable`.
use crate::{
    Curve, Error, F24Dot8, FrameMemory, Geometry, LineBlockAllocator, LineLayout, LineRecord,
    LineX16Y16, LineX32Y16, Matrix, MatrixComplexity, Point, Scalar, Segment, TileBounds,
    fixed::{F24DOT8_ONE, F24DOT8_SHIFT, scaled_to_f24dot8},
    path::PathSegmentsIter,
};

/// Magnitude (in raster 24.8 units) at which transformed coordinates are clamped
const COORD_LIMIT: Scalar = (1u64 << 40) as Scalar;

/// Per tile-row table of cover deltas entering each tile
///
/// Row tables are allocated lazily, so memory is only spent on tile rows
/// actually crossed by a line. Layout of a row table is `[column][pixel_row]`.
#[derive(Debug, Default)]
pub struct StartCoverTable {
    rows: Vec<Option<usize>>,
    covers: Vec<i32>,
    columns: usize,
    tile_height: usize,
}

impl StartCoverTable {
    /// Drop all tables and prepare for `rows` tile rows
    pub fn reset(&mut self, rows: usize, columns: usize, tile_height: usize) -> Result<(), Error> {
        self.clear();
        self.rows.try_reserve(rows)?;
        self.rows.resize(rows, None);
        self.columns = columns;
        self.tile_height = tile_height;
        Ok(())
    }

    fn row_mut(&mut self, row: usize) -> Result<&mut [i32], Error> {
        let row_len = self.columns * self.tile_height;
        let offset = match self.rows[row] {
            Some(offset) => offset,
            None => {
                let offset = self.covers.len();
                self.covers.try_reserve(row_len)?;
                self.covers.resize(offset + row_len, 0);
                self.rows[row] = Some(offset);
                offset
            }
        };
        Ok(&mut self.covers[offset..offset + row_len])
    }

    /// Add signed cover of the segment `[y0, y1]` (tile-row local 24.8) to the column
    pub fn add(
        &mut self,
        row: usize,
        column: usize,
        y0: F24Dot8,
        y1: F24Dot8,
    ) -> Result<(), Error> {
        if y0 == y1 {
            return Ok(());
        }
        let (sign, ya, yb) = if y0 < y1 { (1, y0, y1) } else { (-1, y1, y0) };
        let tile_height = self.tile_height;
        let table = &mut self.row_mut(row)?[column * tile_height..(column + 1) * tile_height];
        let first = (ya >> F24DOT8_SHIFT) as usize;
        let last = ((yb - 1) >> F24DOT8_SHIFT) as usize;
        for (py, cover) in table.iter_mut().enumerate().take(last + 1).skip(first) {
            let top = (py as i32) << F24DOT8_SHIFT;
            let dy = yb.min(top + F24DOT8_ONE) - ya.max(top);
            *cover += sign * dy;
        }
        Ok(())
    }

    /// Cover deltas entering the tile, `None` if nothing crossed the tile row
    pub fn column(&self, row: usize, column: usize) -> Option<&[i32]> {
        let offset = (*self.rows.get(row)?)? + column * self.tile_height;
        Some(&self.covers[offset..offset + self.tile_height])
    }

    pub fn clear(&mut self) {
        self.rows.clear();
        self.covers.clear();
    }
}

/// Index of the first point which is not finite after transformation
pub(crate) fn first_non_finite(points: &[Point], matrix: Matrix) -> Option<usize> {
    points
        .iter()
        .position(|point| !matrix.apply(*point).is_finite())
}

/// Transform points into raster local space scaled by 256
///
/// The fast path is picked once from the complexity of the matrix.
fn transform_points(
    points: &[Point],
    matrix: Matrix,
    origin: Point,
    output: &mut Vec<Point>,
) -> Result<(), Error> {
    let one = F24DOT8_ONE as Scalar;
    let Matrix([m00, m01, m02, m10, m11, m12]) = matrix;
    output.clear();
    output.try_reserve(points.len())?;
    match matrix.complexity() {
        MatrixComplexity::Identity => output.extend(
            points
                .iter()
                .map(|Point([x, y])| Point([(x - origin.x()) * one, (y - origin.y()) * one])),
        ),
        MatrixComplexity::TranslationOnly => {
            let (tx, ty) = ((m02 - origin.x()) * one, (m12 - origin.y()) * one);
            output.extend(
                points
                    .iter()
                    .map(|Point([x, y])| Point([x * one + tx, y * one + ty])),
            )
        }
        MatrixComplexity::ScaleOnly | MatrixComplexity::TranslationScale => {
            let (sx, sy) = (m00 * one, m11 * one);
            let (tx, ty) = ((m02 - origin.x()) * one, (m12 - origin.y()) * one);
            output.extend(
                points
                    .iter()
                    .map(|Point([x, y])| Point([x * sx + tx, y * sy + ty])),
            )
        }
        MatrixComplexity::Complex => output.extend(points.iter().map(|Point([x, y])| {
            Point([
                (x * m00 + y * m01 + m02 - origin.x()) * one,
                (x * m10 + y * m11 + m12 - origin.y()) * one,
            ])
        })),
    }
    for (index, point) in output.iter_mut().enumerate() {
        if !point.is_finite() {
            return Err(Error::NonFiniteCoordinate { index });
        }
        for value in point.0.iter_mut() {
            *value = value.clamp(-COORD_LIMIT, COORD_LIMIT);
        }
    }
    Ok(())
}

/// Linearize geometry into the line tables of the frame memory
///
/// Tables for the selected `layout` are reset to cover `tiles` before any
/// line is pushed.
pub(crate) fn linearize(
    geometry: &Geometry<'_>,
    tiles: &TileBounds,
    layout: LineLayout,
    frame: &mut FrameMemory,
) -> Result<(), Error> {
    let mut points = std::mem::take(&mut frame.points);
    let result = transform_points(
        geometry.path.points(),
        geometry.matrix,
        Point::new(tiles.x as Scalar, tiles.y as Scalar),
        &mut points,
    )
    .and_then(|_| {
        let mut linearizer = Linearizer::new(tiles, layout, frame)?;
        for segment in PathSegmentsIter::new(geometry.path.tags(), &points) {
            linearizer.add_segment(segment)?;
        }
        tracing::debug!(
            "[linearize:lines] {} layout={:?} tiles={}x{}",
            linearizer.count,
            layout,
            tiles.columns,
            tiles.rows
        );
        Ok(())
    });
    points.clear();
    frame.points = points;
    result
}

struct Linearizer<'a> {
    tiles: &'a TileBounds,
    layout: LineLayout,
    lines: &'a mut LineBlockAllocator,
    covers: &'a mut StartCoverTable,
    /// Raster width in 24.8 units
    width: F24Dot8,
    /// Raster height in 24.8 units
    height: F24Dot8,
    /// Number of line records produced
    count: usize,
}

impl<'a> Linearizer<'a> {
    fn new(
        tiles: &'a TileBounds,
        layout: LineLayout,
        frame: &'a mut FrameMemory,
    ) -> Result<Self, Error> {
        let rows = tiles.rows as usize;
        let columns = tiles.columns as usize;
        match layout {
            LineLayout::Narrow => frame.lines.table_mut::<LineX16Y16>().reset(rows)?,
            LineLayout::Wide => frame.lines.table_mut::<LineX32Y16>().reset(rows)?,
            LineLayout::Tiled => {
                frame.lines.table_mut::<LineX16Y16>().reset(rows * columns)?;
                frame
                    .covers
                    .reset(rows, columns, tiles.tile.height() as usize)?;
            }
        }
        Ok(Self {
            tiles,
            layout,
            lines: &mut frame.lines,
            covers: &mut frame.covers,
            width: (tiles.width as F24Dot8) << F24DOT8_SHIFT,
            height: (tiles.height as F24Dot8) << F24DOT8_SHIFT,
            count: 0,
        })
    }

    fn add_segment(&mut self, segment: Segment) -> Result<(), Error> {
        if let Segment::Line(line) = segment {
            return self.add_line(line.start(), line.end());
        }
        let width = self.width as Scalar;
        let height = self.height as Scalar;
        let points = segment.points();
        if points.iter().all(|p| p.y() <= 0.0) || points.iter().all(|p| p.y() >= height) {
            return Ok(());
        }
        if points.iter().all(|p| p.x() >= width) {
            return Ok(());
        }
        if points.iter().all(|p| p.x() <= 0.0) {
            let (start, end) = (segment.start(), segment.end());
            return self.add_line(Point::new(0.0, start.y()), Point::new(0.0, end.y()));
        }
        for piece in segment.cut_at_y_extrema() {
            for line in piece.flatten() {
                self.add_line(line.start(), line.end())?;
            }
        }
        Ok(())
    }

    /// Clip float line to the raster and add the visible part
    fn add_line(&mut self, p0: Point, p1: Point) -> Result<(), Error> {
        let width = self.width as Scalar;
        let height = self.height as Scalar;
        let Point([mut x0, mut y0]) = p0;
        let Point([mut x1, mut y1]) = p1;
        if y0 == y1 {
            return Ok(());
        }
        if (y0 <= 0.0 && y1 <= 0.0) || (y0 >= height && y1 >= height) {
            return Ok(());
        }
        if x0 >= width && x1 >= width {
            return Ok(());
        }

        // clip vertically
        let x_at = |y: Scalar| p0.x() + (p1.x() - p0.x()) * (y - p0.y()) / (p1.y() - p0.y());
        if y0 < 0.0 {
            x0 = x_at(0.0);
            y0 = 0.0;
        } else if y0 > height {
            x0 = x_at(height);
            y0 = height;
        }
        if y1 < 0.0 {
            x1 = x_at(0.0);
            y1 = 0.0;
        } else if y1 > height {
            x1 = x_at(height);
            y1 = height;
        }

        // part on the left of the raster is projected onto `x = 0`
        if x0 <= 0.0 && x1 <= 0.0 {
            return self.add_fixed_line(0.0, y0, 0.0, y1);
        }
        if x0 >= width && x1 >= width {
            return Ok(());
        }
        if x0 < 0.0 || x1 < 0.0 {
            let y = y0 + (y1 - y0) * (0.0 - x0) / (x1 - x0);
            if x0 < 0.0 {
                self.add_fixed_line(0.0, y0, 0.0, y)?;
                x0 = 0.0;
                y0 = y;
            } else {
                self.add_fixed_line(0.0, y, 0.0, y1)?;
                x1 = 0.0;
                y1 = y;
            }
        }
        // part on the right of the raster does not affect coverage
        if x0 > width || x1 > width {
            let y = y0 + (y1 - y0) * (width - x0) / (x1 - x0);
            if x0 > width {
                x0 = width;
                y0 = y;
            } else {
                x1 = width;
                y1 = y;
            }
        }
        self.add_fixed_line(x0, y0, x1, y1)
    }

    fn add_fixed_line(
        &mut self,
        x0: Scalar,
        y0: Scalar,
        x1: Scalar,
        y1: Scalar,
    ) -> Result<(), Error> {
        let x0 = scaled_to_f24dot8(x0).clamp(0, self.width);
        let y0 = scaled_to_f24dot8(y0).clamp(0, self.height);
        let x1 = scaled_to_f24dot8(x1).clamp(0, self.width);
        let y1 = scaled_to_f24dot8(y1).clamp(0, self.height);
        if y0 == y1 {
            return Ok(());
        }
        self.split_rows(x0, y0, x1, y1)
    }

    /// Distribute fixed point line into tile rows, `y` becomes row local
    fn split_rows(
        &mut self,
        x0: F24Dot8,
        y0: F24Dot8,
        x1: F24Dot8,
        y1: F24Dot8,
    ) -> Result<(), Error> {
        let row_height = (self.tiles.tile.height() as F24Dot8) << F24DOT8_SHIFT;
        let (ya, yb) = if y0 < y1 { (y0, y1) } else { (y1, y0) };
        let first = ya / row_height;
        let last = (yb - 1) / row_height;
        if first == last {
            let top = first * row_height;
            return self.push_row(first as usize, x0, y0 - top, x1, y1 - top);
        }
        for row in first..=last {
            let top = row * row_height;
            let row_y0 = ya.max(top);
            let row_y1 = yb.min(top + row_height);
            let row_x0 = interpolate(y0, x0, y1, x1, row_y0);
            let row_x1 = interpolate(y0, x0, y1, x1, row_y1);
            if y0 < y1 {
                self.push_row(row as usize, row_x0, row_y0 - top, row_x1, row_y1 - top)?;
            } else {
                self.push_row(row as usize, row_x1, row_y1 - top, row_x0, row_y0 - top)?;
            }
        }
        Ok(())
    }

    fn push_row(
        &mut self,
        row: usize,
        x0: F24Dot8,
        y0: F24Dot8,
        x1: F24Dot8,
        y1: F24Dot8,
    ) -> Result<(), Error> {
        match self.layout {
            LineLayout::Narrow => self.push::<LineX16Y16>(row, [x0, y0, x1, y1]),
            LineLayout::Wide => self.push::<LineX32Y16>(row, [x0, y0, x1, y1]),
            LineLayout::Tiled => self.split_columns(row, x0, y0, x1, y1),
        }
    }

    #[inline]
    fn push<L: LineRecord>(
        &mut self,
        list: usize,
        [x0, y0, x1, y1]: [F24Dot8; 4],
    ) -> Result<(), Error> {
        self.count += 1;
        self.lines
            .table_mut::<L>()
            .push(list, L::new(x0, y0, x1, y1))
    }

    /// Distribute row line into tiles, `x` becomes tile local
    ///
    /// Non-vertical lines are cut at pixel rows first and then at tile columns,
    /// the same way `accumulate_line` cuts row lines, so every layout
    /// accumulates identical pieces.
    fn split_columns(
        &mut self,
        row: usize,
        x0: F24Dot8,
        y0: F24Dot8,
        x1: F24Dot8,
        y1: F24Dot8,
    ) -> Result<(), Error> {
        if x0 == x1 {
            return self.push_vertical(row, x0, y0, y1);
        }
        let columns = self.tiles.columns as usize;
        let column_width = (self.tiles.tile.width() as F24Dot8) << F24DOT8_SHIFT;
        let down = y0 < y1;
        let line = if down { [x0, y0, x1, y1] } else { [x1, y1, x0, y0] };
        for pixel_row in pixel_rows(line) {
            let [rx0, ry0, rx1, ry1] = pixel_row;
            if rx0 == rx1 {
                let (ya, yb) = if down { (ry0, ry1) } else { (ry1, ry0) };
                self.push_vertical(row, rx0, ya, yb)?;
                continue;
            }
            for (column, [px0, py0, px1, py1]) in column_pieces(pixel_row, column_width) {
                let column = column.min(columns - 1);
                let left = column as F24Dot8 * column_width;
                let piece = if down {
                    [px0 - left, py0, px1 - left, py1]
                } else {
                    [px1 - left, py1, px0 - left, py0]
                };
                self.push::<LineX16Y16>(row * columns + column, piece)?;
                if column + 1 < columns {
                    self.covers.add(row, column + 1, piece[1], piece[3])?;
                }
            }
        }
        Ok(())
    }

    /// Vertical line goes to the tile on its right, unless it is the last one
    fn push_vertical(
        &mut self,
        row: usize,
        x: F24Dot8,
        y0: F24Dot8,
        y1: F24Dot8,
    ) -> Result<(), Error> {
        let columns = self.tiles.columns as usize;
        let column_width = (self.tiles.tile.width() as F24Dot8) << F24DOT8_SHIFT;
        let column = ((x / column_width) as usize).min(columns - 1);
        let left = column as F24Dot8 * column_width;
        self.push::<LineX16Y16>(row * columns + column, [x - left, y0, x - left, y1])?;
        if column + 1 < columns {
            self.covers.add(row, column + 1, y0, y1)?;
        }
        Ok(())
    }
}

/// Value at `t` of the linear function passing through `(t0, v0)` and `(t1, v1)`
///
/// Exact at both end points, computed in 64 bits to avoid overflow.
#[inline]
pub(crate) fn interpolate(
    t0: F24Dot8,
    v0: F24Dot8,
    t1: F24Dot8,
    v1: F24Dot8,
    t: F24Dot8,
) -> F24Dot8 {
    if t == t0 {
        v0
    } else if t == t1 {
        v1
    } else {
        let dt = t1 as i64 - t0 as i64;
        (v0 as i64 + (v1 as i64 - v0 as i64) * (t as i64 - t0 as i64) / dt) as F24Dot8
    }
}

/// Split line going down (`y0 < y1`) at pixel row boundaries
///
/// Pieces keep the direction of the line and never cross a pixel row.
pub(crate) fn pixel_rows([x0, y0, x1, y1]: [F24Dot8; 4]) -> impl Iterator<Item = [F24Dot8; 4]> {
    debug_assert!(y0 < y1);
    let first = y0 >> F24DOT8_SHIFT;
    let last = (y1 - 1) >> F24DOT8_SHIFT;
    (first..=last).map(move |row| {
        let top = row << F24DOT8_SHIFT;
        let row_y0 = y0.max(top);
        let row_y1 = y1.min(top + F24DOT8_ONE);
        [
            interpolate(y0, x0, y1, x1, row_y0),
            row_y0,
            interpolate(y0, x0, y1, x1, row_y1),
            row_y1,
        ]
    })
}

/// Split non-vertical line with `x >= 0` at multiples of `column_width`
///
/// Yields column index and the piece inside of it, pieces keep the direction
/// of the line, horizontal pieces are skipped.
pub(crate) fn column_pieces(
    [x0, y0, x1, y1]: [F24Dot8; 4],
    column_width: F24Dot8,
) -> impl Iterator<Item = (usize, [F24Dot8; 4])> {
    debug_assert!(x0 != x1 && x0 >= 0 && x1 >= 0);
    let (xl, xr) = if x0 < x1 { (x0, x1) } else { (x1, x0) };
    let first = xl / column_width;
    let last = (xr - 1) / column_width;
    (first..=last).filter_map(move |column| {
        let left = column * column_width;
        let piece_l = xl.max(left);
        let piece_r = xr.min(left + column_width);
        let y_l = interpolate(x0, y0, x1, y1, piece_l);
        let y_r = interpolate(x0, y0, x1, y1, piece_r);
        if y_l == y_r {
            return None;
        }
        let piece = if x0 < x1 {
            [piece_l, y_l, piece_r, y_r]
        } else {
            [piece_r, y_r, piece_l, y_l]
        };
        Some((column as usize, piece))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FillRule, IntRect, Path, RGBA, TileDescriptor};

    fn geometry(path: &Path) -> Geometry<'_> {
        Geometry::new(path, Matrix::identity(), RGBA::default(), FillRule::NonZero)
    }

    fn lines<L: LineRecord>(frame: &FrameMemory, list: usize) -> Vec<[F24Dot8; 4]> {
        frame
            .lines
            .table::<L>()
            .lines(list)
            .map(|line| line.points())
            .collect()
    }

    #[test]
    fn test_interpolate() {
        assert_eq!(interpolate(0, 0, 256, 512, 128), 256);
        assert_eq!(interpolate(0, 7, 3, 11, 3), 11);
        assert_eq!(interpolate(10, 7, 0, 11, 10), 7);
        assert_eq!(interpolate(0, 0, 1 << 30, 1 << 30, 1 << 29), 1 << 29);
    }

    #[test]
    fn test_transform_points() -> Result<(), Error> {
        let points = [Point::new(1.0, 2.0), Point::new(-3.5, 0.25)];
        let origin = Point::new(1.0, 1.0);
        let matrices = [
            Matrix::identity(),
            Matrix::translation(2.0, -1.0),
            Matrix::scaling(2.0, 3.0),
            Matrix::scaling(2.0, 3.0).translate(1.0, 1.0),
            Matrix::identity().rotate(0.3),
        ];
        let mut output = Vec::new();
        for matrix in matrices {
            transform_points(&points, matrix, origin, &mut output)?;
            for (point, result) in points.iter().zip(&output) {
                let expected = 256.0 * (matrix.apply(*point) - origin);
                assert!((expected.x() - result.x()).abs() < 1e-9);
                assert!((expected.y() - result.y()).abs() < 1e-9);
            }
        }

        let points = [Point::new(0.0, 0.0), Point::new(Scalar::NAN, 0.0)];
        let result = transform_points(&points, Matrix::identity(), origin, &mut output);
        assert!(matches!(result, Err(Error::NonFiniteCoordinate { index: 1 })));
        assert_eq!(first_non_finite(&points, Matrix::identity()), Some(1));
        Ok(())
    }

    #[test]
    fn test_row_split() -> Result<(), Error> {
        let path = Path::builder()
            .move_to((1.0, 1.0))
            .line_to((3.0, 33.0))
            .line_to((1.0, 33.0))
            .build();
        let tiles = TileBounds::new(IntRect::new(0, 0, 8, 40), TileDescriptor::T8X16);
        let mut frame = FrameMemory::default();
        linearize(&geometry(&path), &tiles, LineLayout::Narrow, &mut frame)?;
        // downward line crosses rows 0, 1, 2, the closing line goes back up
        assert_eq!(
            lines::<LineX16Y16>(&frame, 0),
            vec![[256, 256, 496, 4096], [256, 4096, 256, 256]]
        );
        assert_eq!(
            lines::<LineX16Y16>(&frame, 1),
            vec![[496, 0, 752, 4096], [256, 4096, 256, 0]]
        );
        assert_eq!(
            lines::<LineX16Y16>(&frame, 2),
            vec![[752, 0, 768, 256], [256, 256, 256, 0]]
        );
        Ok(())
    }

    #[test]
    fn test_clipping() -> Result<(), Error> {
        // triangle sticking out on every side of a 16x16 raster
        let path = Path::builder()
            .move_to((-8.0, -8.0))
            .line_to((24.0, 8.0))
            .line_to((-8.0, 24.0))
            .close()
            .build();
        let tiles = TileBounds::new(IntRect::new(0, 0, 16, 16), TileDescriptor::T8X16);
        let mut frame = FrameMemory::default();
        linearize(&geometry(&path), &tiles, LineLayout::Wide, &mut frame)?;
        let lines = lines::<LineX32Y16>(&frame, 0);
        assert!(!lines.is_empty());
        for [x0, y0, x1, y1] in lines.iter().copied() {
            assert!((0..=4096).contains(&x0) && (0..=4096).contains(&x1));
            assert!((0..=4096).contains(&y0) && (0..=4096).contains(&y1));
            assert_ne!(y0, y1);
        }
        // closing edge is entirely on the left and becomes vertical at zero
        assert!(lines.contains(&[0, 4096, 0, 0]));
        // lines leaving through the right side are cut at the raster edge
        assert!(lines.iter().all(|line| line[0] <= 4096 && line[2] <= 4096));
        Ok(())
    }

    #[test]
    fn test_curve_culling() -> Result<(), Error> {
        let path = Path::builder()
            .move_to((-10.0, 2.0))
            .quad_to((-20.0, 8.0), (-10.0, 14.0))
            .move_to((20.0, 2.0))
            .cubic_to((30.0, 4.0), (30.0, 8.0), (20.0, 14.0))
            .move_to((2.0, -10.0))
            .quad_to((8.0, -20.0), (14.0, -10.0))
            .build();
        let tiles = TileBounds::new(IntRect::new(0, 0, 16, 16), TileDescriptor::T8X16);
        let mut frame = FrameMemory::default();
        linearize(&geometry(&path), &tiles, LineLayout::Wide, &mut frame)?;
        // left curve becomes a pair of vertical lines at zero, the rest is dropped
        assert_eq!(
            lines::<LineX32Y16>(&frame, 0),
            vec![[0, 512, 0, 3584], [0, 3584, 0, 512]]
        );
        Ok(())
    }

    #[test]
    fn test_tiled_start_covers() -> Result<(), Error> {
        let path = Path::builder()
            .move_to((2.0, 0.0))
            .line_to((2.0, 4.0))
            .line_to((30.0, 4.0))
            .line_to((30.0, 0.0))
            .close()
            .build();
        let tiles = TileBounds::new(IntRect::new(0, 0, 32, 8), TileDescriptor::T8X8);
        let mut frame = FrameMemory::default();
        linearize(&geometry(&path), &tiles, LineLayout::Tiled, &mut frame)?;
        assert_eq!(lines::<LineX16Y16>(&frame, 0), vec![[512, 0, 512, 1024]]);
        assert!(frame.lines.table::<LineX16Y16>().is_empty(1));
        assert_eq!(lines::<LineX16Y16>(&frame, 3), vec![[1536, 1024, 1536, 0]]);
        let deltas = frame.covers.column(0, 1).map(|deltas| deltas.to_vec());
        assert_eq!(deltas, Some(vec![256, 256, 256, 256, 0, 0, 0, 0]));
        assert!(frame.covers.column(0, 2).is_some_and(|d| d.iter().all(|v| *v == 0)));
        assert!(frame.covers.column(1, 0).is_none());
        Ok(())
    }
}
