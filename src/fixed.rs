//! 24.8 fixed point numbers used by the linearizer and the rasterizer
use crate::Scalar;

/// Signed fixed point number with 8 fractional bits
pub type F24Dot8 = i32;

pub const F24DOT8_SHIFT: u32 = 8;
pub const F24DOT8_ONE: F24Dot8 = 1 << F24DOT8_SHIFT;
pub const F24DOT8_MASK: F24Dot8 = F24DOT8_ONE - 1;

/// Convert float to 24.8 fixed point, rounding to nearest
///
/// Values outside of the representable range saturate, NaN maps to zero.
#[inline]
pub fn to_f24dot8(value: Scalar) -> F24Dot8 {
    scaled_to_f24dot8(value * F24DOT8_ONE as Scalar)
}

/// Convert float already multiplied by 256 to 24.8 fixed point
#[inline]
pub fn scaled_to_f24dot8(value: Scalar) -> F24Dot8 {
    value.round() as F24Dot8
}

#[inline]
pub fn f24dot8_to_scalar(value: F24Dot8) -> Scalar {
    value as Scalar / F24DOT8_ONE as Scalar
}

/// Integer part of a fixed point value (rounds towards negative infinity)
#[inline]
pub fn f24dot8_floor(value: F24Dot8) -> i32 {
    value >> F24DOT8_SHIFT
}

/// Smallest integer not less than the fixed point value
#[inline]
pub fn f24dot8_ceil(value: F24Dot8) -> i32 {
    (value + F24DOT8_MASK) >> F24DOT8_SHIFT
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct F24Dot8Point {
    pub x: F24Dot8,
    pub y: F24Dot8,
}

impl F24Dot8Point {
    pub const fn new(x: F24Dot8, y: F24Dot8) -> Self {
        Self { x, y }
    }
}
