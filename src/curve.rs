//! Bezier curves, their extrema, monotonic cuts and flattening
use crate::{
    BBox, Matrix, Point, Scalar,
    utils::{ArrayIter, Roots, unit_roots},
};
use std::fmt;

/// Maximum allowed deviation of a flattened curve from its chord in 24.8 units (0.125px)
pub const FLATNESS_TOLERANCE: Scalar = 32.0;

/// Maximum number of bisections applied to a single monotonic curve
pub const FLATTEN_MAX_DEPTH: u8 = 16;

pub type CurveCuts<C> = ArrayIter<[Option<C>; 3]>;

/// Coordinate axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    #[inline]
    fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
        }
    }
}

/// Set of operations common to all bezier curves.
pub trait Curve: Sized + Copy + Into<Segment> {
    /// Apply affine transformation to the curve
    fn transform(&self, tr: Matrix) -> Self;

    /// Point at which curve starts
    fn start(&self) -> Point;

    /// Point at which curve ends
    fn end(&self) -> Point;

    /// Control points of the curve, including start and end
    fn points(&self) -> &[Point];

    /// Evaluate curve at parameter value `t` in (0.0..=1.0)
    fn at(&self, t: Scalar) -> Point;

    /// Optimized version of `Curve::split_at(0.5)`
    fn split(&self) -> (Self, Self) {
        self.split_at(0.5)
    }

    /// Split the curve at prameter value `t`
    fn split_at(&self, t: Scalar) -> (Self, Self);

    /// Extend provided `init` bounding box with the bounding box of the curve
    fn bbox(&self, init: Option<BBox>) -> BBox;

    /// Parameter values strictly inside `(0, 1)` at which the derivative along `axis` is zero
    fn extrema(&self, axis: Axis) -> Roots;

    /// Split the curve at its extrema along `axis` into 1 to 3 curves monotonic along that axis
    ///
    /// Control points adjacent to a cut are snapped to the cut coordinate, so
    /// rounding errors of the root can not break monotonicity of the pieces.
    fn cut_at_extrema(&self, axis: Axis) -> CurveCuts<Self>;

    /// Monotonic pieces along `y`, used by the scanline linearizer
    fn cut_at_y_extrema(&self) -> CurveCuts<Self> {
        self.cut_at_extrema(Axis::Y)
    }

    /// Monotonic pieces along `x`
    fn cut_at_x_extrema(&self) -> CurveCuts<Self> {
        self.cut_at_extrema(Axis::X)
    }

    /// Whether the curve can be replaced with its chord, coordinates are expected in 24.8 units
    fn is_flat_enough(&self) -> bool;

    /// Find all extremities of the curve `curve'(t)_x = 0 || curve'(t)_y = 0`
    fn extremities(&self) -> ArrayIter<[Option<Scalar>; 4]> {
        self.extrema(Axis::X).chain(self.extrema(Axis::Y)).collect()
    }
}

/// Clamp control point coordinates along `axis` into the range spanned by the end points
fn clamp_controls(points: &mut [Point], axis: Axis) {
    let index = axis.index();
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return;
    };
    let (lo, hi) = {
        let (a, b) = (first.0[index], last.0[index]);
        if a <= b { (a, b) } else { (b, a) }
    };
    let count = points.len();
    for point in &mut points[1..count - 1] {
        point.0[index] = point.0[index].clamp(lo, hi);
    }
}

// -----------------------------------------------------------------------------
// Line
// -----------------------------------------------------------------------------

/// Line segment curve
#[derive(Clone, Copy, PartialEq)]
pub struct Line(pub [Point; 2]);

impl fmt::Debug for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Line([p0, p1]) = self;
        write!(f, "Line {:?} {:?}", p0, p1)
    }
}

impl Line {
    pub fn new(p0: impl Into<Point>, p1: impl Into<Point>) -> Self {
        Self([p0.into(), p1.into()])
    }
}

impl Curve for Line {
    fn transform(&self, tr: Matrix) -> Self {
        let Line([p0, p1]) = self;
        Self([tr.apply(*p0), tr.apply(*p1)])
    }

    fn start(&self) -> Point {
        self.0[0]
    }

    fn end(&self) -> Point {
        self.0[1]
    }

    fn points(&self) -> &[Point] {
        &self.0
    }

    fn at(&self, t: Scalar) -> Point {
        let Self([p0, p1]) = self;
        p0.lerp(*p1, t)
    }

    fn split_at(&self, t: Scalar) -> (Self, Self) {
        let Self([p0, p1]) = self;
        let mid = self.at(t);
        (Self([*p0, mid]), Self([mid, *p1]))
    }

    fn bbox(&self, init: Option<BBox>) -> BBox {
        let Self([p0, p1]) = *self;
        BBox::new(p0, p1).union_opt(init)
    }

    fn extrema(&self, _axis: Axis) -> Roots {
        Roots::new()
    }

    fn cut_at_extrema(&self, _axis: Axis) -> CurveCuts<Self> {
        let mut result = CurveCuts::new();
        result.push(*self);
        result
    }

    fn is_flat_enough(&self) -> bool {
        true
    }
}

// -----------------------------------------------------------------------------
// Quadratic bezier curve
// -----------------------------------------------------------------------------

/// Quadratic bezier curve
///
/// Polynimial form:
/// `(1 - t) ^ 2 * p0 + 2 * (1 - t) * t * p1 + t ^ 2 * p2`
#[derive(Clone, Copy, PartialEq)]
pub struct Quad(pub [Point; 3]);

impl fmt::Debug for Quad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Quad([p0, p1, p2]) = self;
        write!(f, "Quad {:?} {:?} {:?}", p0, p1, p2)
    }
}

impl Quad {
    pub fn new(p0: impl Into<Point>, p1: impl Into<Point>, p2: impl Into<Point>) -> Self {
        Self([p0.into(), p1.into(), p2.into()])
    }
}

impl Curve for Quad {
    fn transform(&self, tr: Matrix) -> Self {
        let Quad([p0, p1, p2]) = self;
        Self([tr.apply(*p0), tr.apply(*p1), tr.apply(*p2)])
    }

    fn start(&self) -> Point {
        self.0[0]
    }

    fn end(&self) -> Point {
        self.0[2]
    }

    fn points(&self) -> &[Point] {
        &self.0
    }

    fn at(&self, t: Scalar) -> Point {
        let Self([p0, p1, p2]) = self;
        let (t1, t_1) = (t, 1.0 - t);
        (t_1 * t_1) * *p0 + (2.0 * t1 * t_1) * *p1 + (t1 * t1) * *p2
    }

    /// Optimized version of `split_at(0.5)`
    fn split(&self) -> (Self, Self) {
        let Self([p0, p1, p2]) = *self;
        let mid = 0.25 * (p0 + 2.0 * p1 + p2);
        (
            Self([p0, 0.5 * (p0 + p1), mid]),
            Self([mid, 0.5 * (p1 + p2), p2]),
        )
    }

    fn split_at(&self, t: Scalar) -> (Self, Self) {
        // https://pomax.github.io/bezierinfo/#matrixsplit
        let Self([p0, p1, p2]) = *self;
        let (t1, t_1) = (t, 1.0 - t);
        let (t2, t_2) = (t1 * t1, t_1 * t_1);
        let mid = t_2 * p0 + 2.0 * t1 * t_1 * p1 + t2 * p2;
        (
            Self([p0, t_1 * p0 + t * p1, mid]),
            Self([mid, t_1 * p1 + t * p2, p2]),
        )
    }

    fn bbox(&self, init: Option<BBox>) -> BBox {
        let Self([p0, p1, p2]) = self;
        let bbox = BBox::new(*p0, *p2).union_opt(init);
        if bbox.contains(*p1) {
            return bbox;
        }
        self.extremities()
            .fold(bbox, |bbox, t| bbox.extend(self.at(t)))
    }

    fn extrema(&self, axis: Axis) -> Roots {
        // q'(t) / 2 = (p1 - p0) + t * (p0 - 2 * p1 + p2)
        let index = axis.index();
        let Self([p0, p1, p2]) = self;
        let (v0, v1, v2) = (p0.0[index], p1.0[index], p2.0[index]);
        unit_roots(0.0, v0 - 2.0 * v1 + v2, v1 - v0)
    }

    fn cut_at_extrema(&self, axis: Axis) -> CurveCuts<Self> {
        let mut result = CurveCuts::new();
        match self.extrema(axis).next() {
            None => result.push(*self),
            Some(t) => {
                let index = axis.index();
                let (mut q0, mut q1) = self.split_at(t);
                let cut = q0.0[2].0[index];
                q0.0[1].0[index] = cut;
                q1.0[1].0[index] = cut;
                result.push(q0);
                result.push(q1);
            }
        }
        result
    }

    fn is_flat_enough(&self) -> bool {
        // maximum distance from the chord is `|p0 - 2 * p1 + p2| / 4`
        let Self([p0, p1, p2]) = *self;
        let Point([dx, dy]) = p0 - 2.0 * p1 + p2;
        dx.abs() + dy.abs() <= 4.0 * FLATNESS_TOLERANCE
    }
}

// -----------------------------------------------------------------------------
// Cubic bezier curve
// -----------------------------------------------------------------------------

/// Cubic bezier curve
///
/// Polynimial form:
/// `(1 - t) ^ 3 * p0 + 3 * (1 - t) ^ 2 * t * p1 + 3 * (1 - t) * t ^ 2 * p2 + t ^ 3 * p3`
#[derive(Clone, Copy, PartialEq)]
pub struct Cubic(pub [Point; 4]);

impl fmt::Debug for Cubic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Cubic([p0, p1, p2, p3]) = self;
        write!(f, "Cubic {:?} {:?} {:?} {:?}", p0, p1, p2, p3)
    }
}

impl Cubic {
    pub fn new(
        p0: impl Into<Point>,
        p1: impl Into<Point>,
        p2: impl Into<Point>,
        p3: impl Into<Point>,
    ) -> Self {
        Self([p0.into(), p1.into(), p2.into(), p3.into()])
    }
}

impl Curve for Cubic {
    fn transform(&self, tr: Matrix) -> Self {
        let Cubic([p0, p1, p2, p3]) = self;
        Self([tr.apply(*p0), tr.apply(*p1), tr.apply(*p2), tr.apply(*p3)])
    }

    fn start(&self) -> Point {
        self.0[0]
    }

    fn end(&self) -> Point {
        self.0[3]
    }

    fn points(&self) -> &[Point] {
        &self.0
    }

    fn at(&self, t: Scalar) -> Point {
        let Self([p0, p1, p2, p3]) = self;
        let (t1, t_1) = (t, 1.0 - t);
        let (t2, t_2) = (t1 * t1, t_1 * t_1);
        (t_2 * t_1) * *p0 + (3.0 * t1 * t_2) * *p1 + (3.0 * t2 * t_1) * *p2 + (t2 * t1) * *p3
    }

    /// Optimized version of `split_at(0.5)`
    fn split(&self) -> (Self, Self) {
        let Self([p0, p1, p2, p3]) = *self;
        let mid = 0.125 * p0 + 0.375 * p1 + 0.375 * p2 + 0.125 * p3;
        let c0 = Self([
            p0,
            0.5 * p0 + 0.5 * p1,
            0.25 * p0 + 0.5 * p1 + 0.25 * p2,
            mid,
        ]);
        let c1 = Self([
            mid,
            0.25 * p1 + 0.5 * p2 + 0.25 * p3,
            0.5 * p2 + 0.5 * p3,
            p3,
        ]);
        (c0, c1)
    }

    fn split_at(&self, t: Scalar) -> (Self, Self) {
        // https://pomax.github.io/bezierinfo/#matrixsplit
        let Self([p0, p1, p2, p3]) = *self;
        let (t1, t_1) = (t, 1.0 - t);
        let (t2, t_2) = (t1 * t1, t_1 * t_1);
        let (t3, t_3) = (t2 * t1, t_2 * t_1);
        let mid = t_3 * p0 + 3.0 * t1 * t_2 * p1 + 3.0 * t2 * t_1 * p2 + t3 * p3;
        let c0 = Self([
            p0,
            t_1 * p0 + t * p1,
            t_2 * p0 + 2.0 * t * t_1 * p1 + t2 * p2,
            mid,
        ]);
        let c1 = Self([
            mid,
            t_2 * p1 + 2.0 * t * t_1 * p2 + t2 * p3,
            t_1 * p2 + t * p3,
            p3,
        ]);
        (c0, c1)
    }

    fn bbox(&self, init: Option<BBox>) -> BBox {
        let Self([p0, p1, p2, p3]) = self;
        let bbox = BBox::new(*p0, *p3).union_opt(init);
        if bbox.contains(*p1) && bbox.contains(*p2) {
            return bbox;
        }
        self.extremities()
            .fold(bbox, |bbox, t| bbox.extend(self.at(t)))
    }

    fn extrema(&self, axis: Axis) -> Roots {
        // c'(t) / 3 = a * t ^ 2 + b * t + c
        let index = axis.index();
        let Self([p0, p1, p2, p3]) = self;
        let (v0, v1, v2, v3) = (p0.0[index], p1.0[index], p2.0[index], p3.0[index]);
        let a = -v0 + 3.0 * v1 - 3.0 * v2 + v3;
        let b = 2.0 * (v0 - 2.0 * v1 + v2);
        let c = v1 - v0;
        unit_roots(a, b, c)
    }

    fn cut_at_extrema(&self, axis: Axis) -> CurveCuts<Self> {
        let index = axis.index();
        let mut result = CurveCuts::new();
        let mut rest = *self;
        let mut split = false;
        let mut t_prev = 0.0;
        for t in self.extrema(axis) {
            let local = (t - t_prev) / (1.0 - t_prev);
            let (mut c0, mut c1) = rest.split_at(local);
            let cut = c0.0[3].0[index];
            c0.0[2].0[index] = cut;
            c1.0[1].0[index] = cut;
            clamp_controls(&mut c0.0, axis);
            result.push(c0);
            rest = c1;
            t_prev = t;
            split = true;
        }
        if split {
            clamp_controls(&mut rest.0, axis);
        }
        result.push(rest);
        result
    }

    fn is_flat_enough(&self) -> bool {
        // Roger Willcocks bound on the distance between cubic and its chord
        // https://web.archive.org/web/20210108052742/http://hcklbrrfnn.files.wordpress.com/2012/08/bez.pdf
        let Self([p0, p1, p2, p3]) = *self;
        let Point([ux, uy]) = 3.0 * p1 - 2.0 * p0 - p3;
        let Point([vx, vy]) = 3.0 * p2 - p0 - 2.0 * p3;
        ux.abs().max(vx.abs()) + uy.abs().max(vy.abs()) <= 4.0 * FLATNESS_TOLERANCE
    }
}

impl From<Quad> for Cubic {
    fn from(quad: Quad) -> Self {
        let Quad([p0, p1, p2]) = quad;
        Self([
            p0,
            (1.0 / 3.0) * p0 + (2.0 / 3.0) * p1,
            (2.0 / 3.0) * p1 + (1.0 / 3.0) * p2,
            p2,
        ])
    }
}

// -----------------------------------------------------------------------------
// Segment
// -----------------------------------------------------------------------------

/// Any of the supported curves
#[derive(Clone, Copy, PartialEq)]
pub enum Segment {
    Line(Line),
    Quad(Quad),
    Cubic(Cubic),
}

impl Segment {
    /// Flatten monotonic segment into lines, coordinates are expected in 24.8 units
    pub fn flatten(self) -> CurveFlattenIter {
        CurveFlattenIter::new(self)
    }
}

impl fmt::Debug for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Line(line) => line.fmt(f),
            Segment::Quad(quad) => quad.fmt(f),
            Segment::Cubic(cubic) => cubic.fmt(f),
        }
    }
}

impl Curve for Segment {
    fn transform(&self, tr: Matrix) -> Self {
        match self {
            Segment::Line(line) => line.transform(tr).into(),
            Segment::Quad(quad) => quad.transform(tr).into(),
            Segment::Cubic(cubic) => cubic.transform(tr).into(),
        }
    }

    fn start(&self) -> Point {
        match self {
            Segment::Line(line) => line.start(),
            Segment::Quad(quad) => quad.start(),
            Segment::Cubic(cubic) => cubic.start(),
        }
    }

    fn end(&self) -> Point {
        match self {
            Segment::Line(line) => line.end(),
            Segment::Quad(quad) => quad.end(),
            Segment::Cubic(cubic) => cubic.end(),
        }
    }

    fn points(&self) -> &[Point] {
        match self {
            Segment::Line(line) => line.points(),
            Segment::Quad(quad) => quad.points(),
            Segment::Cubic(cubic) => cubic.points(),
        }
    }

    fn at(&self, t: Scalar) -> Point {
        match self {
            Segment::Line(line) => line.at(t),
            Segment::Quad(quad) => quad.at(t),
            Segment::Cubic(cubic) => cubic.at(t),
        }
    }

    fn split(&self) -> (Self, Self) {
        match self {
            Segment::Line(line) => {
                let (l0, l1) = line.split();
                (l0.into(), l1.into())
            }
            Segment::Quad(quad) => {
                let (q0, q1) = quad.split();
                (q0.into(), q1.into())
            }
            Segment::Cubic(cubic) => {
                let (c0, c1) = cubic.split();
                (c0.into(), c1.into())
            }
        }
    }

    fn split_at(&self, t: Scalar) -> (Self, Self) {
        match self {
            Segment::Line(line) => {
                let (l0, l1) = line.split_at(t);
                (l0.into(), l1.into())
            }
            Segment::Quad(quad) => {
                let (q0, q1) = quad.split_at(t);
                (q0.into(), q1.into())
            }
            Segment::Cubic(cubic) => {
                let (c0, c1) = cubic.split_at(t);
                (c0.into(), c1.into())
            }
        }
    }

    fn bbox(&self, init: Option<BBox>) -> BBox {
        match self {
            Segment::Line(line) => line.bbox(init),
            Segment::Quad(quad) => quad.bbox(init),
            Segment::Cubic(cubic) => cubic.bbox(init),
        }
    }

    fn extrema(&self, axis: Axis) -> Roots {
        match self {
            Segment::Line(line) => line.extrema(axis),
            Segment::Quad(quad) => quad.extrema(axis),
            Segment::Cubic(cubic) => cubic.extrema(axis),
        }
    }

    fn cut_at_extrema(&self, axis: Axis) -> CurveCuts<Self> {
        match self {
            Segment::Line(line) => line.cut_at_extrema(axis).map(Segment::from).collect(),
            Segment::Quad(quad) => quad.cut_at_extrema(axis).map(Segment::from).collect(),
            Segment::Cubic(cubic) => cubic.cut_at_extrema(axis).map(Segment::from).collect(),
        }
    }

    fn is_flat_enough(&self) -> bool {
        match self {
            Segment::Line(line) => line.is_flat_enough(),
            Segment::Quad(quad) => quad.is_flat_enough(),
            Segment::Cubic(cubic) => cubic.is_flat_enough(),
        }
    }
}

impl From<Line> for Segment {
    fn from(line: Line) -> Self {
        Self::Line(line)
    }
}

impl From<Quad> for Segment {
    fn from(quad: Quad) -> Self {
        Self::Quad(quad)
    }
}

impl From<Cubic> for Segment {
    fn from(cubic: Cubic) -> Self {
        Self::Cubic(cubic)
    }
}

/// Iterator over lines approximating a segment
///
/// Segments are bisected until they pass the flatness test or reach
/// `FLATTEN_MAX_DEPTH`, the explicit stack never allocates.
pub struct CurveFlattenIter {
    stack: [(Segment, u8); FLATTEN_MAX_DEPTH as usize + 1],
    len: usize,
}

impl CurveFlattenIter {
    pub fn new(segment: impl Into<Segment>) -> Self {
        let segment = segment.into();
        Self {
            stack: [(segment, 0); FLATTEN_MAX_DEPTH as usize + 1],
            len: 1,
        }
    }
}

impl Iterator for CurveFlattenIter {
    type Item = Line;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.len == 0 {
                return None;
            }
            self.len -= 1;
            let (segment, depth) = self.stack[self.len];
            if depth >= FLATTEN_MAX_DEPTH || segment.is_flat_enough() {
                return Some(Line([segment.start(), segment.end()]));
            }
            let (s0, s1) = segment.split();
            self.stack[self.len] = (s1, depth + 1);
            self.stack[self.len + 1] = (s0, depth + 1);
            self.len += 2;
        }
    }
}
