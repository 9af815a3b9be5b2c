//! Signed area coverage accumulation and the rasterizer entry point
use crate::{
    BBox, Error, F24Dot8, FillRule, FrameMemory, IntRect, LineLayout, LineRecord, LineX16Y16,
    LineX32Y16, Matrix, Path, RGBA, RasterizerConfig, TileBounds, Threads,
    fixed::{F24DOT8_ONE, F24DOT8_SHIFT},
    linearizer::{column_pieces, first_non_finite, interpolate, linearize, pixel_rows},
    threads::zeroed,
};
use std::{fmt, sync::Arc};

/// Longest side of the raster target in pixels
pub const MAX_RASTER_SIZE: usize = 16384;

/// Horizontal run `[x, x_end)` of pixels at row `y` sharing the same coverage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub x: i32,
    pub x_end: i32,
    pub y: i32,
    /// Coverage in `[0, 255]`, spans passed to a compositor are never transparent
    pub alpha: u8,
}

impl Span {
    /// Number of pixels in the span
    pub fn len(&self) -> usize {
        (self.x_end - self.x).max(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.x_end <= self.x
    }
}

/// Rasterization request
///
/// Borrows the path for the duration of the call, bounds are computed once
/// on construction.
#[derive(Clone, Copy)]
pub struct Geometry<'a> {
    pub path: &'a Path,
    /// Bounding box of the transformed path, `None` for empty paths
    pub bounds: Option<BBox>,
    pub matrix: Matrix,
    /// Premultiplied fill color
    pub color: RGBA,
    pub fill_rule: FillRule,
}

impl<'a> Geometry<'a> {
    pub fn new(path: &'a Path, matrix: Matrix, color: RGBA, fill_rule: FillRule) -> Self {
        Self {
            path,
            bounds: path.bbox(matrix),
            matrix,
            color,
            fill_rule,
        }
    }
}

impl fmt::Debug for Geometry<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Geometry")
            .field("bounds", &self.bounds)
            .field("color", &self.color)
            .field("fill_rule", &self.fill_rule)
            .field("segments", &self.path.tags().len())
            .finish()
    }
}

/// Receiver of the rasterized spans
///
/// Spans of different pixel rows may be delivered concurrently from worker
/// threads, spans of a single pixel row always arrive ordered by `x`.
pub trait Compositor: Sync {
    fn composite(&self, span: Span, geometry: &Geometry<'_>);
}

impl<F> Compositor for F
where
    F: Fn(Span, &Geometry<'_>) + Sync,
{
    fn composite(&self, span: Span, geometry: &Geometry<'_>) {
        self(span, geometry)
    }
}

/// Convert accumulated area to alpha using non-zero fill rule
#[inline]
pub fn area_to_alpha_non_zero(value: i64) -> u8 {
    (value >> 9).unsigned_abs().min(255) as u8
}

/// Convert accumulated area to alpha using even-odd fill rule
#[inline]
pub fn area_to_alpha_even_odd(value: i64) -> u8 {
    let mut alpha = (value >> 9).unsigned_abs() & 511;
    if alpha > 256 {
        alpha = 512 - alpha;
    }
    alpha.min(255) as u8
}

#[inline]
pub fn area_to_alpha(fill_rule: FillRule, value: i64) -> u8 {
    match fill_rule {
        FillRule::NonZero => area_to_alpha_non_zero(value),
        FillRule::EvenOdd => area_to_alpha_even_odd(value),
    }
}

/// Accumulate line into `cover` and `area` cells
///
/// Cells are laid out row by row with `stride` cells per pixel row, the line
/// is expected to lie inside of the cells (`x` up to `stride - 1` pixels).
/// Lines are cut at multiples of `column_width` before being accumulated.
pub(crate) fn accumulate_line(
    cover: &mut [i32],
    area: &mut [i32],
    stride: usize,
    column_width: F24Dot8,
    [x0, y0, x1, y1]: [F24Dot8; 4],
) {
    if y0 == y1 {
        return;
    }
    let (sign, line) = if y0 < y1 {
        (1, [x0, y0, x1, y1])
    } else {
        (-1, [x1, y1, x0, y0])
    };
    for pixel_row in pixel_rows(line) {
        let [row_x0, row_y0, row_x1, row_y1] = pixel_row;
        let row = (row_y0 >> F24DOT8_SHIFT) as usize;
        let top = (row as F24Dot8) << F24DOT8_SHIFT;
        let cells = row * stride..(row + 1) * stride;
        let (cover, area) = (&mut cover[cells.clone()], &mut area[cells]);
        if row_x0 == row_x1 {
            accumulate_cells(cover, area, sign, [row_x0, row_y0 - top, row_x1, row_y1 - top]);
            continue;
        }
        // cut at tile columns, so tiled and row layouts accumulate the same pieces
        for (_, [px0, py0, px1, py1]) in column_pieces(pixel_row, column_width) {
            accumulate_cells(cover, area, sign, [px0, py0 - top, px1, py1 - top]);
        }
    }
}

/// Accumulate line crossing single pixel row, `0 <= y0 < y1 <= 256`
#[inline]
fn accumulate_cells(
    cover: &mut [i32],
    area: &mut [i32],
    sign: i32,
    [x0, y0, x1, y1]: [F24Dot8; 4],
) {
    if x0 == x1 {
        let cell = x0 >> F24DOT8_SHIFT;
        let fx = x0 - (cell << F24DOT8_SHIFT);
        let dy = sign * (y1 - y0);
        cover[cell as usize] = cover[cell as usize].wrapping_add(dy);
        area[cell as usize] = area[cell as usize].wrapping_add(dy * 2 * fx);
        return;
    }
    let (xl, xr) = if x0 < x1 { (x0, x1) } else { (x1, x0) };
    let first = xl >> F24DOT8_SHIFT;
    let last = ((xr + F24DOT8_ONE - 1) >> F24DOT8_SHIFT) - 1;
    for cell in first..=last {
        let left = cell << F24DOT8_SHIFT;
        let cell_x0 = xl.max(left);
        let cell_x1 = xr.min(left + F24DOT8_ONE);
        let dy = interpolate(x0, y0, x1, y1, cell_x1) - interpolate(x0, y0, x1, y1, cell_x0);
        let dy = sign * dy.abs();
        let fx = (cell_x0 - left) + (cell_x1 - left);
        cover[cell as usize] = cover[cell as usize].wrapping_add(dy);
        area[cell as usize] = area[cell as usize].wrapping_add(dy * fx);
    }
}

/// Resolve accumulated cells of a pixel row into spans of equal non-zero alpha
///
/// `start` is the cover entering the row from the left, `emit` receives
/// `(x, x_end, alpha)` relative to the first cell.
pub(crate) fn sweep_row(
    cover: &[i32],
    area: &[i32],
    width: usize,
    start: i32,
    fill_rule: FillRule,
    mut emit: impl FnMut(usize, usize, u8),
) {
    let mut acc = start;
    let mut span_x = 0;
    let mut span_alpha = 0;
    for (x, (cover, area)) in cover.iter().zip(area).take(width).enumerate() {
        acc = acc.wrapping_add(*cover);
        let value = acc as i64 * 512 - *area as i64;
        let alpha = area_to_alpha(fill_rule, value);
        if alpha != span_alpha {
            if span_alpha != 0 {
                emit(span_x, x, span_alpha);
            }
            span_x = x;
            span_alpha = alpha;
        }
    }
    if span_alpha != 0 {
        emit(span_x, width, span_alpha);
    }
}

/// Extend `pending` span with `span` if they touch and have the same alpha,
/// otherwise flush `pending`
#[inline]
fn merge_span<C: Compositor + ?Sized>(
    pending: &mut Span,
    span: Span,
    compositor: &C,
    geometry: &Geometry<'_>,
) {
    if pending.alpha == span.alpha && pending.x_end == span.x && !pending.is_empty() {
        pending.x_end = span.x_end;
        return;
    }
    if pending.alpha != 0 && !pending.is_empty() {
        compositor.composite(*pending, geometry);
    }
    *pending = span;
}

/// Tiled scanline rasterizer
///
/// Holds configuration and the thread pool used to process tile rows, the
/// pool is shared between rasterizers cloned from each other.
#[derive(Debug, Clone)]
pub struct Rasterizer {
    config: RasterizerConfig,
    threads: Arc<Threads>,
}

impl Default for Rasterizer {
    fn default() -> Self {
        Self::new(RasterizerConfig::default())
    }
}

impl Rasterizer {
    pub fn new(config: RasterizerConfig) -> Self {
        let threads = Arc::new(Threads::from_config(&config));
        Self { config, threads }
    }

    /// Create rasterizer using existing thread pool
    pub fn with_threads(config: RasterizerConfig, threads: Arc<Threads>) -> Self {
        Self { config, threads }
    }

    pub fn config(&self) -> &RasterizerConfig {
        &self.config
    }

    pub fn threads(&self) -> &Arc<Threads> {
        &self.threads
    }

    /// Rasterize geometry clipped to `target` and pass resulting spans to the compositor
    ///
    /// Geometry not intersecting `target` produces no spans. Fails if the
    /// transformed path has non-finite coordinates, or if the visible part of
    /// the geometry is larger than `MAX_RASTER_SIZE` on either side.
    pub fn rasterize<C: Compositor + ?Sized>(
        &self,
        geometry: &Geometry<'_>,
        target: IntRect,
        compositor: &C,
    ) -> Result<(), Error> {
        if let Some(index) = first_non_finite(geometry.path.points(), geometry.matrix) {
            return Err(Error::NonFiniteCoordinate { index });
        }
        let Some(bounds) = geometry.bounds else {
            return Ok(());
        };
        let Some(raster) = bounds.round_out().intersect(target) else {
            return Ok(());
        };
        if raster.width() > MAX_RASTER_SIZE || raster.height() > MAX_RASTER_SIZE {
            return Err(Error::GeometryTooLarge {
                width: raster.width(),
                height: raster.height(),
                limit: MAX_RASTER_SIZE,
            });
        }
        let tiles = TileBounds::new(raster, self.config.tile);
        if tiles.is_empty() {
            return Ok(());
        }
        let layout = self.config.select_layout(&tiles);

        self.threads.with_frame_memory(|frame| {
            let result = tracing::debug_span!("[linearize]")
                .in_scope(|| linearize(geometry, &tiles, layout, frame))
                .and_then(|_| {
                    tracing::debug_span!("[rasterize]").in_scope(|| match layout {
                        LineLayout::Narrow => {
                            self.rasterize_rows::<LineX16Y16, C>(geometry, &tiles, frame, compositor)
                        }
                        LineLayout::Wide => {
                            self.rasterize_rows::<LineX32Y16, C>(geometry, &tiles, frame, compositor)
                        }
                        LineLayout::Tiled => {
                            self.rasterize_tiles(geometry, &tiles, frame, compositor)
                        }
                    })
                });
            frame.clear();
            result
        })
    }

    /// Rasterize line lists stored per tile row
    fn rasterize_rows<L: LineRecord, C: Compositor + ?Sized>(
        &self,
        geometry: &Geometry<'_>,
        tiles: &TileBounds,
        frame: &FrameMemory,
        compositor: &C,
    ) -> Result<(), Error> {
        let table = frame.lines.table::<L>();
        let width = tiles.width as usize;
        let stride = width + 1;
        let column_width = (tiles.tile.width() as F24Dot8) << F24DOT8_SHIFT;
        self.threads.parallel_for(tiles.rows as usize, |row, task| {
            if table.is_empty(row) {
                return Ok(());
            }
            let height = tiles.row_height(row as u32) as usize;
            let cover = zeroed(&mut task.cover, stride * height)?;
            let area = zeroed(&mut task.area, stride * height)?;
            for line in table.lines(row) {
                accumulate_line(cover, area, stride, column_width, line.points());
            }
            let y = tiles.y + (row as u32 * tiles.tile.height()) as i32;
            for py in 0..height {
                let cells = py * stride..(py + 1) * stride;
                sweep_row(
                    &cover[cells.clone()],
                    &area[cells],
                    width,
                    0,
                    geometry.fill_rule,
                    |x, x_end, alpha| {
                        let span = Span {
                            x: tiles.x + x as i32,
                            x_end: tiles.x + x_end as i32,
                            y: y + py as i32,
                            alpha,
                        };
                        compositor.composite(span, geometry)
                    },
                );
            }
            Ok(())
        })
    }

    /// Rasterize line lists stored per tile, carrying cover between tiles of a row
    fn rasterize_tiles<C: Compositor + ?Sized>(
        &self,
        geometry: &Geometry<'_>,
        tiles: &TileBounds,
        frame: &FrameMemory,
        compositor: &C,
    ) -> Result<(), Error> {
        let table = frame.lines.table::<LineX16Y16>();
        let covers = &frame.covers;
        let columns = tiles.columns as usize;
        let tile_width = tiles.tile.width() as usize;
        // extra cell catches vertical lines on the right edge of the tile
        let stride = tile_width + 1;
        let column_width = (tile_width as F24Dot8) << F24DOT8_SHIFT;
        self.threads.parallel_for(tiles.rows as usize, |row, task| {
            let lists = row * columns..(row + 1) * columns;
            if covers.column(row, 0).is_none() && lists.clone().all(|list| table.is_empty(list)) {
                return Ok(());
            }
            let height = tiles.row_height(row as u32) as usize;
            let y = tiles.y + (row as u32 * tiles.tile.height()) as i32;
            let cover = zeroed(&mut task.cover, stride * height)?;
            let area = zeroed(&mut task.area, stride * height)?;
            let row_cover = zeroed(&mut task.row_cover, height)?;
            let pending = &mut task.spans;
            pending.clear();
            pending.try_reserve(height)?;
            pending.resize(height, Span::default());

            for (column, list) in lists.enumerate() {
                if let Some(deltas) = covers.column(row, column) {
                    for (acc, delta) in row_cover.iter_mut().zip(deltas) {
                        *acc = acc.wrapping_add(*delta);
                    }
                }
                let x = tiles.x + (column * tile_width) as i32;
                let width = tiles.column_width(column as u32) as i32;

                if table.is_empty(list) {
                    // nothing crosses the tile, coverage is constant per pixel row
                    for (py, (acc, pending)) in row_cover.iter().zip(pending.iter_mut()).enumerate()
                    {
                        let alpha = area_to_alpha(geometry.fill_rule, *acc as i64 * 512);
                        if alpha != 0 {
                            let span = Span {
                                x,
                                x_end: x + width,
                                y: y + py as i32,
                                alpha,
                            };
                            merge_span(pending, span, compositor, geometry);
                        }
                    }
                    continue;
                }

                for line in table.lines(list) {
                    accumulate_line(cover, area, stride, column_width, line.points());
                }
                for (py, pending) in pending.iter_mut().enumerate() {
                    let cells = py * stride..(py + 1) * stride;
                    sweep_row(
                        &cover[cells.clone()],
                        &area[cells],
                        width as usize,
                        row_cover[py],
                        geometry.fill_rule,
                        |x0, x1, alpha| {
                            let span = Span {
                                x: x + x0 as i32,
                                x_end: x + x1 as i32,
                                y: y + py as i32,
                                alpha,
                            };
                            merge_span(pending, span, compositor, geometry)
                        },
                    );
                }
                cover.fill(0);
                area.fill(0);
            }

            for span in pending.iter() {
                if span.alpha != 0 && !span.is_empty() {
                    compositor.composite(*span, geometry);
                }
            }
            Ok(())
        })
    }
}
