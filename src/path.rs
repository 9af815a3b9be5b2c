//! Paths as tagged sequences of control points
use crate::{BBox, Cubic, Curve, Error, Line, Matrix, Point, Quad, Scalar, Segment};
use std::{fmt, slice};

/// Verb of the path, each verb consumes a fixed number of points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PathTag {
    Move,
    Line,
    Quadratic,
    Cubic,
    Close,
}

impl PathTag {
    /// Number of points consumed by the tag
    pub const fn point_count(self) -> usize {
        match self {
            PathTag::Move | PathTag::Line => 1,
            PathTag::Quadratic => 2,
            PathTag::Cubic => 3,
            PathTag::Close => 0,
        }
    }
}

/// Rule used to decide which regions of a self intersecting path are filled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FillRule {
    /// Fill area with non-zero winding number
    #[default]
    NonZero,
    /// Fill area with odd winding number
    EvenOdd,
}

/// Immutable sequence of tags and the points they consume
///
/// Every sub-path is implicitly closed when filled.
#[derive(Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawPath"))]
pub struct Path {
    tags: Vec<PathTag>,
    points: Vec<Point>,
}

/// Unvalidated form of [`Path`], deserialized paths go through [`Path::new`]
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawPath {
    tags: Vec<PathTag>,
    points: Vec<Point>,
}

#[cfg(feature = "serde")]
impl TryFrom<RawPath> for Path {
    type Error = Error;

    fn try_from(raw: RawPath) -> Result<Self, Self::Error> {
        Path::new(raw.tags, raw.points)
    }
}

impl fmt::Debug for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut points = self.points.iter();
        for (index, tag) in self.tags.iter().enumerate() {
            if index != 0 {
                write!(f, " ")?;
            }
            let verb = match tag {
                PathTag::Move => "M",
                PathTag::Line => "L",
                PathTag::Quadratic => "Q",
                PathTag::Cubic => "C",
                PathTag::Close => "Z",
            };
            write!(f, "{}", verb)?;
            for point in points.by_ref().take(tag.point_count()) {
                write!(f, " {:?}", point)?;
            }
        }
        Ok(())
    }
}

impl Path {
    /// Create path from tags and points
    ///
    /// Non-empty paths must start with `Move` and tags must consume exactly all the points.
    pub fn new(tags: Vec<PathTag>, points: Vec<Point>) -> Result<Self, Error> {
        if let Some(tag) = tags.first() {
            if *tag != PathTag::Move {
                return Err(Error::InvalidPath {
                    reason: format!("path starts with {:?} instead of Move", tag),
                });
            }
        }
        let expected: usize = tags.iter().map(|tag| tag.point_count()).sum();
        if expected != points.len() {
            return Err(Error::InvalidPath {
                reason: format!(
                    "tags consume {} points but {} were provided",
                    expected,
                    points.len()
                ),
            });
        }
        Ok(Self { tags, points })
    }

    /// Path without any segments
    pub fn empty() -> Self {
        Self::default()
    }

    /// Convenience method to create `PathBuilder`
    pub fn builder() -> PathBuilder {
        PathBuilder::new()
    }

    pub fn tags(&self) -> &[PathTag] {
        &self.tags
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Iterate over segments of the path, open sub-paths are closed with a line
    pub fn segments(&self) -> PathSegmentsIter<'_> {
        PathSegmentsIter::new(&self.tags, &self.points)
    }

    /// Bounding box of the path after applying transformation
    ///
    /// Returns `None` for paths without any segments.
    pub fn bbox(&self, tr: Matrix) -> Option<BBox> {
        self.segments()
            .fold(None, |bbox, segment| Some(segment.transform(tr).bbox(bbox)))
    }
}

/// Iterator over segments of the path, see [`Path::segments`]
pub struct PathSegmentsIter<'a> {
    tags: slice::Iter<'a, PathTag>,
    points: &'a [Point],
    offset: usize,
    start: Point,
    current: Point,
}

impl<'a> PathSegmentsIter<'a> {
    /// Iterate segments of `tags` using an alternative set of points (for example transformed ones)
    pub(crate) fn new(tags: &'a [PathTag], points: &'a [Point]) -> Self {
        Self {
            tags: tags.iter(),
            points,
            offset: 0,
            start: Point::default(),
            current: Point::default(),
        }
    }

    /// Current point followed by the next `N - 1` points, `None` if points ran out
    fn take_points<const N: usize>(&mut self) -> Option<[Point; N]> {
        let mut result = [self.current; N];
        result[1..].copy_from_slice(self.points.get(self.offset..self.offset + N - 1)?);
        self.offset += N - 1;
        Some(result)
    }

    /// Stop iteration, used when tags refer to more points than available
    fn truncate(&mut self) -> Option<Segment> {
        self.tags = Default::default();
        self.current = self.start;
        None
    }

    fn close(&mut self) -> Option<Segment> {
        if self.current == self.start {
            return None;
        }
        let line = Line::new(self.current, self.start);
        self.current = self.start;
        Some(line.into())
    }
}

impl Iterator for PathSegmentsIter<'_> {
    type Item = Segment;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let Some(tag) = self.tags.next() else {
                return self.close();
            };
            match tag {
                PathTag::Move => {
                    let Some(point) = self.points.get(self.offset).copied() else {
                        return self.truncate();
                    };
                    let close = self.close();
                    self.offset += 1;
                    self.start = point;
                    self.current = point;
                    if close.is_some() {
                        return close;
                    }
                }
                PathTag::Line => {
                    let Some(points) = self.take_points::<2>() else {
                        return self.truncate();
                    };
                    self.current = points[1];
                    return Some(Line(points).into());
                }
                PathTag::Quadratic => {
                    let Some(points) = self.take_points::<3>() else {
                        return self.truncate();
                    };
                    self.current = points[2];
                    return Some(Quad(points).into());
                }
                PathTag::Cubic => {
                    let Some(points) = self.take_points::<4>() else {
                        return self.truncate();
                    };
                    self.current = points[3];
                    return Some(Cubic(points).into());
                }
                PathTag::Close => {
                    let close = self.close();
                    if close.is_some() {
                        return close;
                    }
                }
            }
        }
    }
}

/// Path builder similar to Canvas/Cairo interface.
#[derive(Clone)]
pub struct PathBuilder {
    position: Point,
    start: Point,
    /// `Move` tag is emitted lazily, on the first segment of a sub-path
    open: bool,
    tags: Vec<PathTag>,
    points: Vec<Point>,
}

impl Default for PathBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PathBuilder {
    pub fn new() -> Self {
        Self {
            position: Point::new(0.0, 0.0),
            start: Point::new(0.0, 0.0),
            open: false,
            tags: Vec::new(),
            points: Vec::new(),
        }
    }

    /// Build path
    pub fn build(&mut self) -> Path {
        let PathBuilder { tags, points, .. } = std::mem::take(self);
        Path { tags, points }
    }

    fn ensure_open(&mut self) {
        if !self.open {
            self.open = true;
            self.start = self.position;
            self.tags.push(PathTag::Move);
            self.points.push(self.position);
        }
    }

    /// Move current position, ending current subpath
    pub fn move_to(&mut self, p: impl Into<Point>) -> &mut Self {
        self.open = false;
        self.position = p.into();
        self
    }

    /// Close current subpath
    pub fn close(&mut self) -> &mut Self {
        if self.open {
            self.tags.push(PathTag::Close);
            self.position = self.start;
            self.open = false;
        }
        self
    }

    /// Add line from the current position to the specified point
    pub fn line_to(&mut self, p: impl Into<Point>) -> &mut Self {
        let p = p.into();
        self.ensure_open();
        self.tags.push(PathTag::Line);
        self.points.push(p);
        self.position = p;
        self
    }

    /// Add quadratic bezier curve
    pub fn quad_to(&mut self, p1: impl Into<Point>, p2: impl Into<Point>) -> &mut Self {
        let p2 = p2.into();
        self.ensure_open();
        self.tags.push(PathTag::Quadratic);
        self.points.extend([p1.into(), p2]);
        self.position = p2;
        self
    }

    /// Add cubic beizer curve
    pub fn cubic_to(
        &mut self,
        p1: impl Into<Point>,
        p2: impl Into<Point>,
        p3: impl Into<Point>,
    ) -> &mut Self {
        let p3 = p3.into();
        self.ensure_open();
        self.tags.push(PathTag::Cubic);
        self.points.extend([p1.into(), p2.into(), p3]);
        self.position = p3;
        self
    }

    /// Add circle with the center at current position and provided radius.
    ///
    /// Current position is not changed after invocation.
    pub fn circle(&mut self, radius: Scalar) -> &mut Self {
        // https://stackoverflow.com/questions/1734745/how-to-create-circle-with-b%C3%A9zier-curves
        // (4/3)*tan(pi/8) = 4*(sqrt(2)-1)/3 = 0.5522847498307935
        let offset = 0.5522847498307935 * radius;
        let x_offset = Point::new(offset, 0.0);
        let y_offset = Point::new(0.0, offset);
        let center = self.position();
        let p0 = center - Point::new(radius, 0.0);
        let p1 = center - Point::new(0.0, radius);
        let p2 = center + Point::new(radius, 0.0);
        let p3 = center + Point::new(0.0, radius);

        self.move_to(p0)
            .cubic_to(p0 - y_offset, p1 - x_offset, p1)
            .cubic_to(p1 + x_offset, p2 - y_offset, p2)
            .cubic_to(p2 + y_offset, p3 + x_offset, p3)
            .cubic_to(p3 - x_offset, p0 + y_offset, p0)
            .close()
            .move_to(center)
    }

    /// Add axis aligned rectangle, with current position being low-x and low-y coordinate
    ///
    /// Current position is not changed after invocation.
    pub fn rect(&mut self, size: impl Into<Point>) -> &mut Self {
        let Point([w, h]) = size.into();
        let Point([lx, ly]) = self.position;
        self.move_to((lx, ly))
            .line_to((lx + w, ly))
            .line_to((lx + w, ly + h))
            .line_to((lx, ly + h))
            .close()
            .move_to((lx, ly))
    }

    /// Current possition of the builder
    pub fn position(&self) -> Point {
        self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_approx_eq;

    #[test]
    fn test_validation() {
        let path = Path::new(
            vec![PathTag::Move, PathTag::Line, PathTag::Cubic, PathTag::Close],
            vec![
                Point::new(0.0, 0.0),
                Point::new(1.0, 0.0),
                Point::new(1.0, 1.0),
                Point::new(0.5, 1.0),
                Point::new(0.0, 1.0),
            ],
        );
        assert!(path.is_ok());

        let missing = Path::new(vec![PathTag::Move, PathTag::Quadratic], vec![Point::default(); 2]);
        assert!(matches!(missing, Err(Error::InvalidPath { .. })));

        let no_move = Path::new(vec![PathTag::Line], vec![Point::default()]);
        assert!(matches!(no_move, Err(Error::InvalidPath { .. })));

        assert!(Path::new(Vec::new(), Vec::new()).unwrap().is_empty());
    }

    #[test]
    fn test_segments_missing_points() {
        let points = [Point::new(0.0, 0.0), Point::new(5.0, 5.0)];
        let tags = [PathTag::Move, PathTag::Line, PathTag::Line];
        let segments: Vec<_> = PathSegmentsIter::new(&tags, &points).collect();
        assert_eq!(segments, vec![Segment::from(Line::new((0.0, 0.0), (5.0, 5.0)))]);

        let tags = [PathTag::Move, PathTag::Cubic, PathTag::Move];
        assert_eq!(PathSegmentsIter::new(&tags, &points).count(), 0);
        assert_eq!(PathSegmentsIter::new(&[PathTag::Move], &[]).count(), 0);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde() -> Result<(), Box<dyn std::error::Error>> {
        let mismatched = r#"{"tags":["Move","Line","Line"],"points":[[0,0],[5,5]]}"#;
        assert!(serde_json::from_str::<Path>(mismatched).is_err());
        let no_move = r#"{"tags":["Line"],"points":[[0,0]]}"#;
        assert!(serde_json::from_str::<Path>(no_move).is_err());

        let path = Path::builder().move_to((1.0, 2.0)).rect((3.0, 4.5)).build();
        let back: Path = serde_json::from_str(&serde_json::to_string(&path)?)?;
        assert_eq!(back, path);
        Ok(())
    }

    #[test]
    fn test_builder() {
        let path = Path::builder()
            .move_to((1.0, 1.0))
            .move_to((2.0, 2.0))
            .line_to((3.0, 2.0))
            .quad_to((4.0, 3.0), (3.0, 4.0))
            .close()
            .line_to((0.0, 0.0))
            .build();
        assert_eq!(
            path.tags(),
            &[
                PathTag::Move,
                PathTag::Line,
                PathTag::Quadratic,
                PathTag::Close,
                PathTag::Move,
                PathTag::Line,
            ]
        );
        assert_eq!(path.points().len(), 6);
        assert_eq!(format!("{:?}", path), "M 2,2 L 3,2 Q 4,3 3,4 Z M 2,2 L 0,0");
    }

    #[test]
    fn test_segments_implicit_close() {
        let path = Path::builder()
            .move_to((0.0, 0.0))
            .line_to((4.0, 0.0))
            .line_to((4.0, 4.0))
            .move_to((10.0, 10.0))
            .line_to((12.0, 10.0))
            .line_to((10.0, 10.0))
            .build();
        let segments: Vec<_> = path.segments().collect();
        // first sub-path gets a closing line, second one is already closed
        assert_eq!(segments.len(), 5);
        assert_eq!(
            segments[2],
            Segment::from(Line::new((4.0, 4.0), (0.0, 0.0)))
        );
        assert_eq!(segments[3].start(), Point::new(10.0, 10.0));
    }

    #[test]
    fn test_bbox() {
        let path = Path::builder().move_to((5.0, 5.0)).circle(4.0).build();
        let bbox = path.bbox(Matrix::identity()).unwrap();
        assert_approx_eq!(bbox.x(), 1.0, 1e-9);
        assert_approx_eq!(bbox.y(), 1.0, 1e-9);
        assert_approx_eq!(bbox.width(), 8.0, 1e-9);
        assert_approx_eq!(bbox.height(), 8.0, 1e-9);

        let bbox = path.bbox(Matrix::identity().scale(2.0, 1.0)).unwrap();
        assert_approx_eq!(bbox.width(), 16.0, 1e-9);
        assert!(Path::empty().bbox(Matrix::identity()).is_none());
    }
}
