//! Dense 8-bit coverage masks
use crate::{
    BBox, Compositor, Error, FillRule, Geometry, Image, ImageMut, ImageRows, IntRect, Matrix,
    Path, RGBA, Rasterizer, Shape, Span, rasterize::MAX_RASTER_SIZE,
    linearizer::first_non_finite,
};
use std::fmt;

/// Alignment of the mask stride and storage height, matches the patch size
const MASK_ALIGN: usize = 4;

/// 8-bit per pixel coverage bitmap covering `bounds` in device space
///
/// Stride and the number of stored rows are rounded up to a multiple of 4
/// and the padding is kept zeroed, so any 4x4 block overlapping the mask can
/// be read without bounds checks.
#[derive(Clone)]
pub struct DenseMask {
    bounds: IntRect,
    stride: usize,
    data: Vec<u8>,
}

impl DenseMask {
    /// Create transparent mask
    pub fn new(bounds: IntRect) -> Result<Self, Error> {
        let stride = bounds.width().next_multiple_of(MASK_ALIGN);
        let rows = bounds.height().next_multiple_of(MASK_ALIGN);
        let mut data = Vec::new();
        data.try_reserve_exact(stride * rows)?;
        data.resize(stride * rows, 0);
        Ok(Self {
            bounds,
            stride,
            data,
        })
    }

    /// Mask without any pixels
    pub fn empty() -> Self {
        Self {
            bounds: IntRect::default(),
            stride: 0,
            data: Vec::new(),
        }
    }

    pub fn bounds(&self) -> IntRect {
        self.bounds
    }

    /// Distance in bytes between the starts of two consecutive rows
    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }

    /// Coverage of the pixel at `(x, y)` in device space, zero outside of the bounds
    pub fn get(&self, x: i32, y: i32) -> u8 {
        if !self.bounds.contains(x, y) {
            return 0;
        }
        let offset = self.offset(x, y);
        self.data[offset]
    }

    /// Set coverage of the pixel at `(x, y)` in device space, ignored outside of the bounds
    pub fn set(&mut self, x: i32, y: i32, value: u8) {
        if self.bounds.contains(x, y) {
            let offset = self.offset(x, y);
            self.data[offset] = value;
        }
    }

    #[inline]
    fn offset(&self, x: i32, y: i32) -> usize {
        (y - self.bounds.y0) as usize * self.stride + (x - self.bounds.x0) as usize
    }

    /// Pixels of the row `y` in device space, including the padding
    pub(crate) fn row(&self, y: i32) -> Option<&[u8]> {
        if !(self.bounds.y0..self.bounds.y1).contains(&y) {
            return None;
        }
        let start = (y - self.bounds.y0) as usize * self.stride;
        self.data.get(start..start + self.stride)
    }

    /// Encode mask as 8-bit grayscale PNG image
    #[cfg(feature = "png")]
    pub fn write_png(&self, w: impl std::io::Write) -> Result<(), Error> {
        let width = self.bounds.width();
        let height = self.bounds.height();
        let mut encoder = png::Encoder::new(w, width as u32, height as u32);
        encoder.set_color(png::ColorType::Grayscale);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        let mut pixels = Vec::new();
        pixels.try_reserve_exact(width * height)?;
        for row in self.data.chunks(self.stride.max(1)).take(height) {
            pixels.extend_from_slice(&row[..width]);
        }
        writer.write_image_data(&pixels)?;
        Ok(())
    }
}

impl Image for DenseMask {
    type Pixel = u8;

    fn shape(&self) -> Shape {
        Shape {
            width: self.bounds.width(),
            height: self.bounds.height(),
            row_stride: self.stride,
            col_stride: 1,
        }
    }

    fn data(&self) -> &[Self::Pixel] {
        &self.data
    }
}

impl ImageMut for DenseMask {
    fn data_mut(&mut self) -> &mut [Self::Pixel] {
        &mut self.data
    }
}

impl PartialEq for DenseMask {
    fn eq(&self, other: &Self) -> bool {
        if self.bounds != other.bounds {
            return false;
        }
        let width = self.bounds.width();
        (self.bounds.y0..self.bounds.y1).all(|y| match (self.row(y), other.row(y)) {
            (Some(left), Some(right)) => left[..width] == right[..width],
            _ => false,
        })
    }
}

impl Eq for DenseMask {}

impl fmt::Debug for DenseMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "DenseMask {:?}", self.bounds)?;
        let width = self.bounds.width();
        for y in self.bounds.y0..self.bounds.y1 {
            if let Some(row) = self.row(y) {
                for value in &row[..width] {
                    write!(f, "{:02x}", value)?;
                }
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

/// Compositor writing span coverage into a dense mask
pub struct MaskCompositor<'a> {
    rows: ImageRows<'a, u8>,
}

impl<'a> MaskCompositor<'a> {
    pub fn new(mask: &'a mut DenseMask) -> Self {
        let IntRect { x0, y0, .. } = mask.bounds;
        Self {
            rows: mask.rows(x0, y0),
        }
    }
}

impl Compositor for MaskCompositor<'_> {
    fn composite(&self, span: Span, _geometry: &Geometry<'_>) {
        self.rows.with_span(span, |pixels| pixels.fill(span.alpha))
    }
}

impl Rasterizer {
    /// Rasterize path into a dense mask covering the part of the path inside `clip`
    ///
    /// Pixels partially covered by `clip` are included. Returns an empty mask
    /// when the path does not intersect `clip`, and fails before allocating
    /// anything when the resulting mask would exceed `MAX_RASTER_SIZE` on either side.
    pub fn rasterize_path(
        &self,
        path: &Path,
        matrix: Matrix,
        fill_rule: FillRule,
        clip: BBox,
    ) -> Result<DenseMask, Error> {
        if let Some(index) = first_non_finite(path.points(), matrix) {
            return Err(Error::NonFiniteCoordinate { index });
        }
        let geometry = Geometry::new(path, matrix, RGBA::new(255, 255, 255, 255), fill_rule);
        let Some(bounds) = geometry.bounds else {
            return Ok(DenseMask::empty());
        };
        let Some(raster) = bounds.round_out().intersect(clip.round_out()) else {
            return Ok(DenseMask::empty());
        };
        if raster.width() > MAX_RASTER_SIZE || raster.height() > MAX_RASTER_SIZE {
            return Err(Error::GeometryTooLarge {
                width: raster.width(),
                height: raster.height(),
                limit: MAX_RASTER_SIZE,
            });
        }
        let mut mask = DenseMask::new(raster)?;
        {
            let compositor = MaskCompositor::new(&mut mask);
            self.rasterize(&geometry, raster, &compositor)?;
        }
        tracing::debug!(
            "[rasterize_path] {}x{} at ({}, {})",
            raster.width(),
            raster.height(),
            raster.x0,
            raster.y0
        );
        Ok(mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RasterizerConfig;

    #[test]
    fn test_dense_mask() -> Result<(), Error> {
        let mut mask = DenseMask::new(IntRect::new(-3, 2, 4, 7))?;
        assert_eq!(mask.stride(), 8);
        assert_eq!(mask.data().len(), 8 * 8);
        assert_eq!(mask.width(), 7);
        assert_eq!(mask.height(), 5);
        mask.set(-3, 2, 10);
        mask.set(3, 6, 20);
        mask.set(4, 6, 30);
        assert_eq!(mask.get(-3, 2), 10);
        assert_eq!(mask.get(3, 6), 20);
        assert_eq!(mask.get(4, 6), 0);
        assert_eq!(mask.get(-100, -100), 0);
        // image view is relative to the top-left corner
        assert_eq!(Image::get(&mask, 4, 6), Some(&20));
        assert_eq!(mask.iter().map(|v| *v as u32).sum::<u32>(), 30);

        let mut other = DenseMask::new(mask.bounds())?;
        assert_ne!(mask, other);
        other.set(-3, 2, 10);
        other.set(3, 6, 20);
        assert_eq!(mask, other);
        assert!(DenseMask::empty().is_empty());
        assert_eq!(DenseMask::empty(), DenseMask::new(IntRect::default())?);
        Ok(())
    }

    #[test]
    fn test_rasterize_path() -> Result<(), Error> {
        let rasterizer = Rasterizer::new(RasterizerConfig::single_threaded());
        let path = Path::builder().move_to((2.0, 2.0)).rect((10.0, 10.0)).build();

        let mask = rasterizer.rasterize_path(
            &path,
            Matrix::identity(),
            FillRule::NonZero,
            BBox::new((0.0, 0.0), (6.5, 100.0)),
        )?;
        assert_eq!(mask.bounds(), IntRect::new(2, 2, 7, 12));
        assert!(mask.iter().all(|value| *value == 255));

        let mask = rasterizer.rasterize_path(
            &path,
            Matrix::identity(),
            FillRule::NonZero,
            BBox::new((20.0, 20.0), (30.0, 30.0)),
        )?;
        assert!(mask.is_empty());

        let huge = Path::builder().move_to((0.0, 0.0)).rect((1e5, 1e5)).build();
        let result = rasterizer.rasterize_path(
            &huge,
            Matrix::identity(),
            FillRule::NonZero,
            BBox::new((0.0, 0.0), (1e6, 1e6)),
        );
        assert!(matches!(result, Err(Error::GeometryTooLarge { limit: 16384, .. })));
        Ok(())
    }

    #[cfg(feature = "png")]
    #[test]
    fn test_write_png() -> Result<(), Error> {
        let rasterizer = Rasterizer::new(RasterizerConfig::single_threaded());
        let path = Path::builder().move_to((8.0, 8.0)).circle(6.0).build();
        let clip = BBox::new((0.0, 0.0), (16.0, 16.0));
        let mask = rasterizer.rasterize_path(&path, Matrix::identity(), FillRule::NonZero, clip)?;
        let mut output = Vec::new();
        mask.write_png(&mut output)?;
        assert_eq!(&output[..8], b"\x89PNG\r\n\x1a\n");
        Ok(())
    }
}
