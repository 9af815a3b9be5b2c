//! Premultiplied colors and compositing of spans into color images
use crate::{Compositor, Geometry, ImageMut, ImageOwned, ImageRows, Span};
use std::fmt;

/// Alpha premultiplied ABGR color packed as u32 value (most of the platforms are little-endian)
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct RGBA(u32);

/// `value / 255` rounded to nearest, exact for `value <= 255 * 255`
#[inline]
fn div255(value: u32) -> u32 {
    let value = value + 128;
    (value + (value >> 8)) >> 8
}

impl RGBA {
    /// Create color from already premultiplied components
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self(((a as u32) << 24) | ((b as u32) << 16) | ((g as u32) << 8) | (r as u32))
    }

    /// Create premultiplied color from straight (not premultiplied) components
    pub fn from_straight(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::new(r, g, b, 255).scale(a)
    }

    pub const fn alpha(self) -> u8 {
        ((self.0 >> 24) & 0xff) as u8
    }

    pub const fn blue(self) -> u8 {
        ((self.0 >> 16) & 0xff) as u8
    }

    pub const fn green(self) -> u8 {
        ((self.0 >> 8) & 0xff) as u8
    }

    pub const fn red(self) -> u8 {
        (self.0 & 0xff) as u8
    }

    pub fn to_rgba(self) -> [u8; 4] {
        self.0.to_le_bytes()
    }

    /// Multiply all components by `alpha / 255`
    pub fn scale(self, alpha: u8) -> Self {
        if alpha == 255 {
            return self;
        }
        let [r, g, b, a] = self.to_rgba().map(|c| div255(c as u32 * alpha as u32) as u8);
        Self::new(r, g, b, a)
    }

    /// Blend other color on top of this color
    pub fn blend_over(self, other: Self) -> Self {
        let inv = 255 - other.alpha() as u32;
        let [r0, g0, b0, a0] = self.to_rgba();
        let [r1, g1, b1, a1] = other.to_rgba();
        let mix = |c0: u8, c1: u8| (c1 as u32 + div255(c0 as u32 * inv)).min(255) as u8;
        Self::new(mix(r0, r1), mix(g0, g1), mix(b0, b1), mix(a0, a1))
    }
}

impl fmt::Debug for RGBA {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RGBA({})", self)
    }
}

impl fmt::Display for RGBA {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b, a] = self.to_rgba();
        write!(f, "#{:02x}{:02x}{:02x}", r, g, b)?;
        if a != 255 {
            write!(f, "{:02x}", a)?;
        }
        Ok(())
    }
}

/// Compositor blending geometry color scaled by span coverage over an image
pub struct ImageCompositor<'a> {
    rows: ImageRows<'a, RGBA>,
}

impl<'a> ImageCompositor<'a> {
    /// Compositor drawing into `image` with its top-left pixel at `(x, y)` in device space
    pub fn new(image: &'a mut ImageOwned<RGBA>, x: i32, y: i32) -> Self {
        Self {
            rows: image.rows(x, y),
        }
    }
}

impl Compositor for ImageCompositor<'_> {
    fn composite(&self, span: Span, geometry: &Geometry<'_>) {
        let color = geometry.color.scale(span.alpha);
        if color == RGBA::default() {
            return;
        }
        self.rows.with_span(span, |pixels| {
            if color.alpha() == 255 {
                pixels.fill(color);
            } else {
                for pixel in pixels {
                    *pixel = pixel.blend_over(color);
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FillRule, Image, IntRect, Matrix, Path, Rasterizer, RasterizerConfig};

    #[test]
    fn test_color() {
        let c = RGBA::new(1, 2, 3, 4);
        assert_eq!([1, 2, 3, 4], c.to_rgba());
        assert_eq!(1, c.red());
        assert_eq!(2, c.green());
        assert_eq!(3, c.blue());
        assert_eq!(4, c.alpha());
        assert_eq!(c.to_string(), "#01020304");
        assert_eq!(RGBA::new(1, 2, 3, 255).to_string(), "#010203");
    }

    #[test]
    fn test_div255() {
        for value in 0..=255 * 255 {
            assert_eq!(div255(value), (value as f64 / 255.0).round() as u32);
        }
    }

    #[test]
    fn test_blend() {
        let red = RGBA::new(255, 0, 0, 255);
        let blue = RGBA::new(0, 0, 255, 255);
        assert_eq!(red.blend_over(blue), blue);
        assert_eq!(red.blend_over(RGBA::default()), red);
        assert_eq!(red.scale(0), RGBA::default());
        assert_eq!(red.scale(255), red);
        assert_eq!(blue.scale(128), RGBA::new(0, 0, 128, 128));
        assert_eq!(red.blend_over(blue.scale(128)), RGBA::new(127, 0, 128, 255));
        assert_eq!(RGBA::from_straight(255, 255, 255, 51), RGBA::new(51, 51, 51, 51));
    }

    #[test]
    fn test_image_compositor() {
        let mut builder = Path::builder();
        builder.move_to((1.0, 1.0)).rect((3.0, 2.0));
        builder.move_to((5.5, 1.0)).rect((1.0, 1.0));
        let path = builder.build();
        let color = RGBA::new(0, 255, 0, 255);
        let geometry = crate::Geometry::new(&path, Matrix::identity(), color, FillRule::NonZero);
        let mut image = ImageOwned::new_with(4, 8, |_, _| RGBA::new(255, 0, 0, 255));
        let rasterizer = Rasterizer::new(RasterizerConfig::single_threaded());
        {
            let compositor = ImageCompositor::new(&mut image, 0, 0);
            rasterizer
                .rasterize(&geometry, IntRect::new(0, 0, 8, 4), &compositor)
                .unwrap();
        }
        assert_eq!(image.get(1, 1), Some(&color));
        assert_eq!(image.get(2, 3), Some(&color));
        assert_eq!(image.get(0, 0), Some(&RGBA::new(255, 0, 0, 255)));
        assert_eq!(image.get(3, 1), Some(&RGBA::new(255, 0, 0, 255)));
        // half covered pixels are blended
        assert_eq!(image.get(1, 5), Some(&RGBA::new(127, 128, 0, 255)));
        assert_eq!(image.get(1, 6), Some(&RGBA::new(127, 128, 0, 255)));
    }
}
